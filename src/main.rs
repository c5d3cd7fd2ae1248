use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

use demandcast::app::forecast_use_case::ForecastUseCase;
use demandcast::app::ingest_use_case::IngestUseCase;
use demandcast::app::ports::RunStore;
use demandcast::config::Config;
use demandcast::domain::{ColumnMapping, Granularity};
use demandcast::error::PipelineError;
use demandcast::infra::sqlite_store::SqliteStore;
use demandcast::logging;
use demandcast::observability::metrics;
use demandcast::pipeline::processing::forecast::router::ModelRouter;
use demandcast::pipeline::processing::forecast::strategies::{
    BaselineMean, RemotePredictor, WeekdayMean,
};
use demandcast::pipeline::processing::forecast::ForecastStrategy;

#[derive(Parser)]
#[command(name = "demandcast")]
#[command(about = "Sales CSV ingestion and per-item demand forecasting")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct MappingArgs {
    /// Source column holding the sale date or timestamp
    #[arg(long)]
    date_column: String,
    /// Source column holding the item name
    #[arg(long)]
    item_column: String,
    /// Source column holding the quantity sold
    #[arg(long)]
    quantity_column: String,
}

impl MappingArgs {
    fn to_mapping(&self) -> ColumnMapping {
        ColumnMapping::new(
            self.date_column.clone(),
            self.item_column.clone(),
            self.quantity_column.clone(),
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast straight from a CSV file, persisting nothing
    Forecast {
        /// Path to the sales CSV
        #[arg(long)]
        file: PathBuf,
        #[command(flatten)]
        mapping: MappingArgs,
        /// Future periods to forecast
        #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..=90))]
        horizon: u32,
        /// Bucket by hour instead of day
        #[arg(long)]
        hourly: bool,
        /// Strategy override: baseline, weekday or auto
        #[arg(long)]
        model: Option<String>,
    },
    /// Ingest a CSV into the local store (deduped by file hash)
    Ingest {
        /// Path to the sales CSV
        #[arg(long)]
        file: PathBuf,
        /// Owner (business) the upload belongs to
        #[arg(long)]
        owner: String,
        #[command(flatten)]
        mapping: MappingArgs,
        /// Bucket by hour instead of day
        #[arg(long)]
        hourly: bool,
    },
    /// Forecast from previously ingested facts
    ForecastStored {
        /// Owner (business) to forecast for
        #[arg(long)]
        owner: String,
        /// Future periods to forecast
        #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..=90))]
        horizon: u32,
        /// Bucket by hour instead of day
        #[arg(long)]
        hourly: bool,
        /// Save the result as the owner's latest run
        #[arg(long)]
        save: bool,
        /// Strategy override: baseline, weekday or auto
        #[arg(long)]
        model: Option<String>,
    },
    /// Print the owner's most recently saved forecast run
    LatestRun {
        /// Owner (business) to look up
        #[arg(long)]
        owner: String,
    },
}

fn build_strategy(
    config: &Config,
    model_override: Option<&str>,
) -> Result<Arc<dyn ForecastStrategy>, PipelineError> {
    let model = model_override.unwrap_or(&config.forecast.model);
    match model {
        "baseline" => Ok(Arc::new(BaselineMean::new())),
        "weekday" => Ok(Arc::new(WeekdayMean::new())),
        "auto" => {
            let remote = config
                .forecast
                .predictor_url
                .as_ref()
                .map(|url| RemotePredictor::new(url.clone(), config.forecast.timezone.clone()));
            // Short histories fall back to the weekday mean, matching the
            // remote predictor's seasonality more closely than a flat mean.
            Ok(Arc::new(ModelRouter::new(Box::new(WeekdayMean::new()), remote)))
        }
        other => Err(PipelineError::Config(format!(
            "Unknown forecast model '{}'. Expected baseline, weekday or auto.",
            other
        ))),
    }
}

fn granularity(hourly: bool) -> Granularity {
    if hourly {
        Granularity::Hourly
    } else {
        Granularity::Daily
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    if let Err(e) = metrics::init() {
        error!("Failed to initialize metrics: {}", e);
    }

    let result = match cli.command {
        Commands::Forecast {
            file,
            mapping,
            horizon,
            hourly,
            model,
        } => {
            let raw = std::fs::read(&file)?;
            let strategy = build_strategy(&config, model.as_deref())?;
            let use_case = ForecastUseCase::new(strategy);
            use_case
                .forecast_csv(&raw, &mapping.to_mapping(), horizon, granularity(hourly))
                .await
                .map(|response| serde_json::to_string_pretty(&response))
        }
        Commands::Ingest {
            file,
            owner,
            mapping,
            hourly,
        } => {
            let raw = std::fs::read(&file)?;
            let store = Arc::new(SqliteStore::open_at_root(&config.storage.data_root)?);
            let use_case = IngestUseCase::new(store);
            use_case
                .ingest(&owner, &raw, &mapping.to_mapping(), granularity(hourly))
                .await
                .map(|summary| serde_json::to_string_pretty(&summary))
        }
        Commands::ForecastStored {
            owner,
            horizon,
            hourly,
            save,
            model,
        } => {
            let store = Arc::new(SqliteStore::open_at_root(&config.storage.data_root)?);
            let strategy = build_strategy(&config, model.as_deref())?;
            let use_case = ForecastUseCase::new(strategy);
            match use_case
                .forecast_stored(store.as_ref(), &owner, horizon, granularity(hourly))
                .await
            {
                Ok(response) => {
                    if save {
                        use_case
                            .save_run(store.as_ref() as &dyn RunStore, &owner, None, &response)
                            .await
                            .map(|_| serde_json::to_string_pretty(&response))
                    } else {
                        Ok(serde_json::to_string_pretty(&response))
                    }
                }
                Err(e) => Err(e),
            }
        }
        Commands::LatestRun { owner } => {
            let store = SqliteStore::open_at_root(&config.storage.data_root)?;
            match store.latest_run(&owner).await {
                Ok(Some(run)) => Ok(serde_json::to_string_pretty(&run)),
                Ok(None) => {
                    println!("No runs found for owner '{}'", owner);
                    return Ok(());
                }
                Err(e) => Err(e),
            }
        }
    };

    match result {
        Ok(json) => {
            println!("{}", json?);
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }
}
