//! Background task boundary: seeding runs per tenant, each inside its own
//! tenant context, one tenant at a time.

pub mod fixtures;

pub use fixtures::{Fixture, FixtureSeeder};

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::context::{self, TenantHandle};
use crate::models::RegistryError;
use crate::observer::ObserverError;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Invalid tenant slug '{0}'")]
    InvalidTenant(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid fixture {path}: {message}")]
    InvalidFixture { path: PathBuf, message: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Observer(#[from] ObserverError),
}

/// Documents inserted per model for one tenant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeedReport {
    pub tenant: String,
    pub inserted: BTreeMap<String, usize>,
}

impl SeedReport {
    pub fn total(&self) -> usize {
        self.inserted.values().sum()
    }
}

/// Work that populates one tenant. Runs with that tenant already bound, so
/// model operations inside it are scoped without naming the tenant.
#[async_trait]
pub trait Seeder: Send + Sync {
    fn name(&self) -> &str;

    async fn seed(&self, tenant: &TenantHandle) -> Result<SeedReport, SeedError>;
}

/// Run `seeder` for each tenant in order, never concurrently.
pub async fn seed_tenants(seeder: &dyn Seeder, tenants: &[String]) -> Result<Vec<SeedReport>, SeedError> {
    let mut reports = Vec::with_capacity(tenants.len());
    for slug in tenants {
        let tenant = TenantHandle::from_slug(slug).ok_or_else(|| SeedError::InvalidTenant(slug.clone()))?;
        tracing::info!("Seeding tenant '{}' with {}", tenant, seeder.name());

        let report = context::establish(Some(tenant.clone()), seeder.seed(&tenant)).await?;

        tracing::info!("Seeded tenant '{}': {} documents", tenant, report.total());
        reports.push(report);
    }
    Ok(reports)
}
