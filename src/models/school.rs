//! Model catalogue of the school backend.

use super::definition::ModelDefinition;
use super::registry::{Model, ModelRegistry, RegistryError};
use crate::scope::{ScopePolicy, UnscopedPolicy};

/// Handles to every school model.
#[derive(Clone)]
pub struct SchoolModels {
    pub customers: Model,
    pub users: Model,
    pub branches: Model,
    pub roles: Model,
    pub classes: Model,
    pub teachers: Model,
    pub students: Model,
    pub attendance: Model,
}

pub fn definitions() -> Vec<ModelDefinition> {
    vec![
        // Customer registry; shared by every tenant
        ModelDefinition::new("customers", ScopePolicy::Global).immutable("slug"),
        ModelDefinition::new("users", ScopePolicy::field("customer"))
            .unscoped(UnscopedPolicy::RejectIfUnscoped)
            .relation("role", "roles")
            .relation("branch", "branches"),
        ModelDefinition::new("branches", ScopePolicy::Collection),
        ModelDefinition::new("roles", ScopePolicy::Collection),
        ModelDefinition::new("classes", ScopePolicy::Collection)
            .relation("teacher", "teachers")
            .relation("branch", "branches")
            .relation("students", "students"),
        ModelDefinition::new("teachers", ScopePolicy::Collection).relation("branch", "branches"),
        ModelDefinition::new("students", ScopePolicy::Collection)
            .relation("class", "classes")
            .relation("branch", "branches"),
        ModelDefinition::new("attendance", ScopePolicy::Collection)
            .relation("student", "students")
            .relation("class", "classes"),
    ]
}

pub fn register_school_models(registry: &ModelRegistry) -> Result<SchoolModels, RegistryError> {
    for definition in definitions() {
        registry.register(definition)?;
    }

    Ok(SchoolModels {
        customers: registry.model("customers")?,
        users: registry.model("users")?,
        branches: registry.model("branches")?,
        roles: registry.model("roles")?,
        classes: registry.model("classes")?,
        teachers: registry.model("teachers")?,
        students: registry.model("students")?,
        attendance: registry.model("attendance")?,
    })
}
