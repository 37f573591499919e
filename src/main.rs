use anyhow::{bail, Context, Result};
use cloudscope::config::{Config, LoggingConfig};
use cloudscope::engine::CancellationFlag;
use cloudscope::inventory::Resource;
use cloudscope::orchestrator::{derive_insights, AnalysisOrchestrator};
use cloudscope::storage::{Database, ResourceRepository};
use log::{info, warn};
use std::io::Write;
use std::sync::Arc;

fn init_logging(logging: &LoggingConfig) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::new().default_filter_or(&logging.log_level));
    if logging.log_format.eq_ignore_ascii_case("json") {
        builder.format(|buf, record| {
            let line = serde_json::json!({
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "level": record.level().to_string(),
                "target": record.target(),
                "message": record.args().to_string(),
            });
            writeln!(buf, "{}", line)
        });
    }
    builder.init();
}

/// Inventory files are a JSON or YAML list of resources.
fn read_inventory(path: &str) -> Result<Vec<Resource>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;
    match serde_json::from_str(&raw) {
        Ok(resources) => Ok(resources),
        Err(_) => serde_yaml::from_str(&raw).with_context(|| format!("{} is neither a JSON nor a YAML resource list", path)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration. Please check your environment variables.")?;
    init_logging(&config.logging);

    info!("Starting cloudscope...");
    info!(
        "Database: {}, strategy: {:?}, cache: {:?}",
        config.database.database_path, config.analysis.strategy, config.analysis.cache
    );

    let db = Database::new(&config.database)?;
    let repo = ResourceRepository::new(db);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(|s| s.as_str()).unwrap_or("analyze");

    if command == "import" {
        let Some(path) = args.get(1) else {
            bail!("usage: cloudscope import <inventory.json|inventory.yaml>");
        };
        let resources = read_inventory(path)?;
        repo.store_resources(&resources)?;
        info!("Imported {} resource(s) from {} ({} in inventory)", resources.len(), path, repo.count()?);
        return Ok(());
    }

    let orchestrator = AnalysisOrchestrator::new(Arc::new(repo), config.analysis);

    // Ctrl-C stops scheduling new partitions; running ones finish.
    let cancel = CancellationFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, finishing in-flight partitions");
                cancel.cancel();
            }
        });
    }

    match command {
        "analyze" => {
            let report = orchestrator.analyze_all_with_cancel(&cancel).await?;
            for insight in derive_insights(&report) {
                info!("{}", insight);
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "insights" => {
            for insight in orchestrator.get_analysis_insights().await? {
                println!("- {}", insight);
            }
        }
        "dependencies" => println!("{}", serde_json::to_string_pretty(&orchestrator.analyze_dependencies().await?)?),
        "security" => println!("{}", serde_json::to_string_pretty(&orchestrator.analyze_security().await?)?),
        "cost" => println!("{}", serde_json::to_string_pretty(&orchestrator.analyze_cost().await?)?),
        other => bail!(
            "unknown command '{}': expected analyze, insights, dependencies, security, cost or import",
            other
        ),
    }

    Ok(())
}
