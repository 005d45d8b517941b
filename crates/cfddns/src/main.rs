// # cfddns - Cloudflare Dynamic DNS Daemon
//
// Thin integration layer: everything that decides what to write lives in
// cfddns-core. The daemon is responsible for:
// 1. Reading configuration (optional JSON file + environment variables)
// 2. Initializing logging and the runtime
// 3. Building the resolver roster, DNS provider and notifier
// 4. Running the scheduler until SIGTERM/SIGINT
//
// ## Configuration
//
// ### Base file
// - `CFDDNS_CONFIG`: Path to a JSON configuration file (optional)
//
// ### Records
// - `CFDDNS_HOSTNAMES`: Comma-separated hostnames to keep updated
// - `CFDDNS_CHECK_INTERVAL`: `auto` (default) or seconds between checks
//
// ### Resolvers
// - `CFDDNS_RESOLVERS`: Comma-separated built-in resolver names (default: all)
// - `CFDDNS_RESOLVER_NO_VERIFY`: Accept invalid TLS certificates from resolvers
//
// ### Cloudflare
// - `CFDDNS_CLOUDFLARE_ZONE_ID`: Zone holding the records
// - `CFDDNS_CLOUDFLARE_API_TOKEN`: Scoped API token, or
// - `CFDDNS_CLOUDFLARE_EMAIL` + `CFDDNS_CLOUDFLARE_API_KEY`: Global API key
//
// ### Notifications
// - `CFDDNS_IFTTT_MAKER_KEY` + `CFDDNS_IFTTT_EVENT`: IFTTT webhook
//
// ### Runtime
// - `CFDDNS_REQUEST_TIMEOUT_SECS`: Upper bound for one external call
// - `CFDDNS_LOG_LEVEL`: trace, debug, info (default), warn, error
// - `CFDDNS_MODE`: `live` (default) or `dry-run`
//
// ## Example
//
// ```bash
// export CFDDNS_HOSTNAMES=home.example.com,vpn.example.com
// export CFDDNS_CLOUDFLARE_ZONE_ID=023e105f4ecef8ad9ca31a8372d0c353
// export CFDDNS_CLOUDFLARE_API_TOKEN=your_token
// export CFDDNS_RESOLVERS=ipify,icanhazip,wtfismyip
//
// cfddns
// ```

mod config;

use anyhow::Result;
use cfddns_core::traits::{DnsProvider, Notifier};
use cfddns_core::{DdnsEngine, EngineEvent, Scheduler};
use cfddns_resolver_http::HttpResolver;
use config::Config;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting cfddns daemon");
    info!(
        "Configuration loaded: {} hostname(s), {} resolver(s), provider {}, notifier {}",
        config.ddns.hostnames.len(),
        config.ddns.resolvers.len(),
        config.ddns.provider.type_name(),
        config.ddns.notifier.type_name()
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let scheduler = match build_scheduler(&config) {
            Ok(scheduler) => scheduler,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return DdnsExitCode::ConfigError;
            }
        };

        match scheduler.run_until(wait_for_shutdown()).await {
            Ok(_) => {
                info!("cfddns stopped");
                DdnsExitCode::CleanShutdown
            }
            Err(e) => {
                error!("Daemon error: {}", e);
                DdnsExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Wire the components together
fn build_scheduler(config: &Config) -> Result<Scheduler> {
    let timeout = config.ddns.engine.request_timeout();

    let resolvers = HttpResolver::roster(&config.ddns.resolvers, timeout)?;
    for resolver in &config.ddns.resolvers {
        info!("Resolver in rotation: {} ({})", resolver.name, resolver.url);
        if resolver.accept_invalid_certs {
            warn!("TLS certificate verification disabled for resolver {}", resolver.name);
        }
    }

    let provider = build_provider(config)?;
    let notifier = build_notifier(config)?;

    for hostname in &config.ddns.hostnames {
        info!("Managing record: {}", hostname);
    }

    let (engine, events) = DdnsEngine::new(resolvers, provider, notifier, &config.ddns)?;
    tokio::spawn(log_events(events));

    Ok(Scheduler::new(engine))
}

#[cfg(feature = "cloudflare")]
fn build_provider(config: &Config) -> Result<Box<dyn DnsProvider>> {
    info!("Using Cloudflare provider");
    let provider =
        cfddns_cloudflare::CloudflareProvider::from_config(&config.ddns.provider, config.dry_run)?;
    Ok(Box::new(provider))
}

#[cfg(not(feature = "cloudflare"))]
fn build_provider(config: &Config) -> Result<Box<dyn DnsProvider>> {
    anyhow::bail!(
        "Provider '{}' is not available: cfddns was built without the `cloudflare` feature",
        config.ddns.provider.type_name()
    )
}

#[cfg(feature = "ifttt")]
fn build_notifier(config: &Config) -> Result<Option<Arc<dyn Notifier>>> {
    let notifier = cfddns_notify_ifttt::IftttNotifier::from_config(&config.ddns.notifier)?;
    if notifier.is_some() {
        info!("IFTTT notifications enabled");
    }
    Ok(notifier.map(|n| Arc::new(n) as Arc<dyn Notifier>))
}

#[cfg(not(feature = "ifttt"))]
fn build_notifier(config: &Config) -> Result<Option<Arc<dyn Notifier>>> {
    if config.ddns.notifier.is_enabled() {
        anyhow::bail!(
            "Notifier '{}' is not available: cfddns was built without the `ifttt` feature",
            config.ddns.notifier.type_name()
        );
    }
    Ok(None)
}

/// Drain engine events into the log
async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::Started { interval, .. } => {
                debug!("Engine started, next checks every {:?}", interval)
            }
            EngineEvent::Stopped { reason } => debug!("Engine stopped: {}", reason),
            other => debug!("Engine event: {:?}", other),
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// A cycle in progress is allowed to finish; the scheduler only checks for
/// shutdown between cycles.
#[cfg(unix)]
async fn wait_for_shutdown() {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Failed to set up signal handlers ({}), falling back to Ctrl+C", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to wait for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            return;
        }
    };

    let received = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    info!("Received shutdown signal: {}", received);
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal: SIGINT"),
        Err(e) => {
            error!("Failed to wait for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
