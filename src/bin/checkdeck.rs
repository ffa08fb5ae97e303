use std::env;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use checkdeck::api::ApiClient;
use checkdeck::api::http::HttpApiClient;
use checkdeck::config::DashboardConfig;
use checkdeck::controller::{CheckDetailScreen, CheckListScreen};
use checkdeck::query::time_window::{FilterQuery, TimeWindow};
use checkdeck::status::{FanInPolicy, TableState};
use checkdeck::trigger::TriggerState;
use checkdeck::version::VERSION;

#[derive(Parser, Debug)]
#[command(author, version, about = "Synthetic check dashboard client", long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
    /// Base URL of the dashboard API, overriding the config file
    #[arg(long)]
    base_url: Option<String>,
    /// Named timeframe to scope statistics to (e.g. "1d")
    #[arg(short, long)]
    timeframe: Option<String>,
    /// Filter checks by name/environment substring
    #[arg(short, long)]
    filter: Option<String>,
    /// Publish every row even when some statistics fetches fail
    #[arg(long)]
    per_row: bool,
    /// Trigger a manual run for CHECK:ENVIRONMENT and wait for the result
    #[arg(long, value_name = "CHECK:ENVIRONMENT")]
    trigger: Option<String>,
    /// List the named timeframes the backend offers and exit
    #[arg(long)]
    timeframes: bool,
}

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logging();
    dotenv().ok();
    let args = Args::parse();

    let mut config = match args.config.as_deref() {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    } else if let Ok(base_url) = env::var("CHECKDECK_BASE_URL") {
        config.base_url = base_url;
    }

    info!("Starting checkdeck, version: {}", VERSION);
    let client = Arc::new(HttpApiClient::new(&config.base_url)?);

    if args.timeframes {
        for timeframe in client.list_timeframes().await? {
            println!("{:<8} {}", timeframe.name, timeframe.friendly_name);
        }
        return Ok(());
    }

    if let Some(target) = args.trigger {
        let Some((name, environment)) = target.split_once(':') else {
            return Err("trigger target must be CHECK:ENVIRONMENT".into());
        };
        return trigger_and_wait(client, &config, name, environment).await;
    }

    let policy = if args.per_row {
        FanInPolicy::PerRow
    } else {
        FanInPolicy::Atomic
    };
    let screen = CheckListScreen::new(client, config.quiet_interval(), policy);
    screen.reset_query(FilterQuery {
        filter_text: args.filter.unwrap_or_default(),
        time_window: args
            .timeframe
            .map(TimeWindow::timeframe)
            .unwrap_or_default(),
    });
    screen.refresh_now().await;

    match screen.table() {
        TableState::Ready(rows) => {
            println!(
                "{:<30} {:<15} {:>16} {:>10} {:>10}",
                "NAME", "ENVIRONMENT", "AVERAGE SUCCESS", "LATEST", "ENABLED"
            );
            for row in &rows {
                println!(
                    "{:<30} {:<15} {:>16} {:>10} {:>10}",
                    row.name,
                    row.environment,
                    row.average_success_label(),
                    row.latest_status_label(),
                    row.enabled_label()
                );
            }
            info!(rows = rows.len(), "Rendered check table.");
            Ok(())
        }
        TableState::Failed(reason) => {
            error!(reason = %reason, "Aggregation failed; no table rendered.");
            Err(reason.into())
        }
        TableState::NotLoaded => Err("no table published".into()),
    }
}

async fn trigger_and_wait(
    client: Arc<HttpApiClient>,
    config: &DashboardConfig,
    name: &str,
    environment: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let screen = CheckDetailScreen::new(client, name, environment, config.poll_policy());
    screen.trigger_run().await?;

    let mut last_reported: Option<TriggerState> = None;
    loop {
        let Some(state) = screen.trigger_state() else {
            return Err("trigger session disappeared".into());
        };
        if last_reported.as_ref() != Some(&state) {
            info!(state = %state, "Manual trigger state changed.");
            last_reported = Some(state.clone());
        }
        match state {
            TriggerState::Resolved(run_id) => {
                println!("Run observable: {run_id}");
                return Ok(());
            }
            TriggerState::Failed(reason) => {
                return Err(reason.into());
            }
            _ => tokio::time::sleep(Duration::from_millis(250)).await,
        }
    }
}
