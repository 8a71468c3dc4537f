pub mod models;
pub mod seed;
pub mod serve;
