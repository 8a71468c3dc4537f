// Public (no permission check) and protected (behind the authorization gate)
pub mod protected;
pub mod public;
