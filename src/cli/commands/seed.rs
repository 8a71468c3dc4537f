use std::path::PathBuf;

use serde_json::json;

use crate::cli::{build_registry, utils::output_success, OutputFormat};
use crate::config::AppConfig;
use crate::seed::{seed_tenants, FixtureSeeder};

pub async fn handle(
    config: AppConfig,
    tenants: Vec<String>,
    fixtures: PathBuf,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    if !fixtures.is_dir() {
        anyhow::bail!("Fixture directory not found: {}", fixtures.display());
    }

    let registry = build_registry(&config).await?;
    let seeder = FixtureSeeder::load(registry, &fixtures)?;
    let reports = seed_tenants(&seeder, &tenants).await?;

    if let OutputFormat::Text = output_format {
        for report in &reports {
            println!("{}:", report.tenant);
            for (model, count) in &report.inserted {
                println!("  {:<12} {}", model, count);
            }
        }
    }

    let total: usize = reports.iter().map(|r| r.total()).sum();
    output_success(
        &output_format,
        &format!("Seeded {} documents across {} customers", total, reports.len()),
        Some(json!({ "reports": reports })),
    )
}
