use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures::future::join_all;
use tokio::signal;
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use seo_throttle::config::{LoggingConfig, ThrottleConfig};
use seo_throttle::ratelimit::{AsyncRateLimiter, LimiterKey, LimiterRegistry, RateWindow};

#[derive(Debug, Parser)]
#[command(name = "seo-throttle", version, about = "Sliding-window throttle for SEO API calls")]
struct Cli {
    /// YAML configuration file (SEO_THROTTLE_* variables override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fire a burst of concurrent requests through one limiter
    Simulate {
        /// Number of concurrent requests
        #[arg(short = 'n', long, default_value_t = 10)]
        requests: u64,

        /// Override the budget instead of using configured limits
        #[arg(long)]
        max_requests: Option<u64>,

        /// Override the window length in seconds
        #[arg(long)]
        time_window: Option<f64>,

        /// Upstream service the requests are metered against
        #[arg(long, default_value = "serp")]
        service: String,

        /// Account the requests are billed to
        #[arg(long, default_value = "default")]
        account: String,
    },
    /// Print the resolved configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ThrottleConfig::load(cli.config.as_deref())?;
    init_tracing(&config.logging);

    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    config.validate()?;
    info!(
        max_requests = config.rate_limiting.max_requests,
        time_window_secs = config.rate_limiting.time_window_secs,
        limits = config.limits.len(),
        "Configuration loaded"
    );

    match cli.command {
        Command::Simulate {
            requests,
            max_requests,
            time_window,
            service,
            account,
        } => {
            let key = LimiterKey::new(service, account);
            let limiter = if max_requests.is_some() || time_window.is_some() {
                let window = RateWindow::from_secs_f64(
                    max_requests.unwrap_or(config.rate_limiting.max_requests),
                    time_window.unwrap_or(config.rate_limiting.time_window_secs),
                )?;
                Arc::new(AsyncRateLimiter::with_window(window))
            } else {
                LimiterRegistry::from_config(&config)?.limiter(&key)?
            };
            simulate(&key, limiter, requests).await?;
        }
        Command::ShowConfig => {
            print!("{}", config.to_yaml()?);
        }
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Run `requests` concurrent acquires and report admission offsets.
///
/// Ctrl+C or SIGTERM abandons the waiters still sleeping; the final usage
/// snapshot is printed either way.
async fn simulate(
    key: &LimiterKey,
    limiter: Arc<AsyncRateLimiter>,
    requests: u64,
) -> anyhow::Result<()> {
    info!(
        key = %key,
        requests = requests,
        max_requests = limiter.max_requests(),
        time_window = ?limiter.time_window(),
        "Simulating request burst"
    );

    let start = Instant::now();
    let calls = (0..requests).map(|request| {
        let limiter = limiter.clone();
        async move {
            limiter.acquire().await;
            info!(
                request = request,
                offset_ms = start.elapsed().as_millis() as u64,
                usage = limiter.current_usage(),
                "Request admitted"
            );
        }
    });

    tokio::select! {
        _ = join_all(calls) => {
            info!(elapsed = ?start.elapsed(), "All requests admitted");
        }
        _ = shutdown_signal() => {
            warn!("Simulation cancelled before all requests were admitted");
        }
    }

    let report = serde_json::json!({
        "key": key.to_string(),
        "usage": limiter.snapshot(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, cancelling");
        }
        _ = terminate => {
            info!("Received SIGTERM, cancelling");
        }
    }
}
