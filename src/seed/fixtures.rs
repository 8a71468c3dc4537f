use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use super::{SeedError, SeedReport, Seeder};
use crate::context::TenantHandle;
use crate::filter::Document;
use crate::models::ModelRegistry;

/// Documents destined for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub model: String,
    pub documents: Vec<Document>,
}

/// Seeds every tenant with the same fixture documents.
pub struct FixtureSeeder {
    registry: ModelRegistry,
    fixtures: Vec<Fixture>,
}

impl FixtureSeeder {
    pub fn new(registry: ModelRegistry, fixtures: Vec<Fixture>) -> Result<Self, SeedError> {
        for fixture in &fixtures {
            registry.model(&fixture.model)?;
        }
        Ok(Self { registry, fixtures })
    }

    /// Load `<model>.json`, `<model>.yaml` or `<model>.yml` files from `dir`,
    /// in file name order. Each file holds an array of documents.
    pub fn load(registry: ModelRegistry, dir: &Path) -> Result<Self, SeedError> {
        let entries = std::fs::read_dir(dir).map_err(|source| SeedError::Io { path: dir.to_path_buf(), source })?;

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SeedError::Io { path: dir.to_path_buf(), source })?;
            paths.push(entry.path());
        }
        paths.sort();

        let mut fixtures = Vec::new();
        for path in paths {
            let Some(format) = FixtureFormat::of(&path) else {
                tracing::debug!("Skipping non-fixture file {}", path.display());
                continue;
            };
            fixtures.push(Self::read_fixture(&path, format)?);
        }

        tracing::info!("Loaded {} fixture files from {}", fixtures.len(), dir.display());
        Self::new(registry, fixtures)
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    fn read_fixture(path: &Path, format: FixtureFormat) -> Result<Fixture, SeedError> {
        let invalid = |message: String| SeedError::InvalidFixture { path: path.to_path_buf(), message };

        let model = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| invalid("file name is not valid UTF-8".to_string()))?
            .to_string();

        let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io { path: path.to_path_buf(), source })?;
        let value: Value = match format {
            FixtureFormat::Json => serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?,
            FixtureFormat::Yaml => serde_yaml::from_str(&raw).map_err(|e| invalid(e.to_string()))?,
        };

        let Value::Array(items) = value else {
            return Err(invalid("expected an array of documents".to_string()));
        };
        let documents = items
            .into_iter()
            .map(|item| match item {
                Value::Object(document) => Ok(document),
                other => Err(invalid(format!("expected an object, got {}", other))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Fixture { model, documents })
    }
}

#[derive(Debug, Clone, Copy)]
enum FixtureFormat {
    Json,
    Yaml,
}

impl FixtureFormat {
    fn of(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(FixtureFormat::Json),
            "yaml" | "yml" => Some(FixtureFormat::Yaml),
            _ => None,
        }
    }
}

#[async_trait]
impl Seeder for FixtureSeeder {
    fn name(&self) -> &str {
        "fixtures"
    }

    async fn seed(&self, tenant: &TenantHandle) -> Result<SeedReport, SeedError> {
        let mut inserted = BTreeMap::new();
        for fixture in &self.fixtures {
            let model = self.registry.model(&fixture.model)?;
            let created = model.create_many(fixture.documents.clone()).await?;
            tracing::debug!("Seeded {} {} for '{}'", created.len(), fixture.model, tenant);
            *inserted.entry(fixture.model.clone()).or_insert(0) += created.len();
        }
        Ok(SeedReport { tenant: tenant.to_string(), inserted })
    }
}
