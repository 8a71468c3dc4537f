pub mod definition;
pub mod registry;
pub mod school;

pub use definition::ModelDefinition;
pub use registry::{Model, ModelRegistry, RegistryError};
pub use school::{register_school_models, SchoolModels};
