use serde_json::json;

use crate::cli::{build_registry, utils, OutputFormat};
use crate::config::AppConfig;

pub async fn handle(config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let registry = build_registry(&config).await?;
    let definitions = registry.definitions();

    match output_format {
        OutputFormat::Json => {
            let models: Vec<_> = definitions.iter().map(|d| d.as_ref()).collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "models": models }))?);
        }
        OutputFormat::Text => {
            let rows: Vec<Vec<String>> = definitions
                .iter()
                .map(|d| {
                    vec![
                        d.name().to_string(),
                        d.collection().to_string(),
                        d.scope_policy().to_string(),
                        d.unscoped_policy().to_string(),
                        d.relations().keys().cloned().collect::<Vec<_>>().join(","),
                    ]
                })
                .collect();
            println!(
                "{}",
                utils::format_table(&["MODEL", "COLLECTION", "SCOPE", "UNSCOPED", "RELATIONS"], &rows)
            );
        }
    }
    Ok(())
}
