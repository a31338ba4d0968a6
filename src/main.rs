use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use linkding_media_archiver::archiver::Ytdlp;
use linkding_media_archiver::cli::Cli;
use linkding_media_archiver::config::Config;
use linkding_media_archiver::linkding::{Client, Version, BUNDLE_FILTER_MIN_VERSION};
use linkding_media_archiver::scan::{scan_loop, Scanner, Schedule};

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Fatal error: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let cli = Cli::parse();

    info!("Starting linkding-media-archiver");

    let mut config = Config::from_env().context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(
        base_url = %config.base_url,
        tags = ?config.tags,
        bundle_id = ?config.bundle_id,
        scan_interval_secs = config.scan_interval.as_secs(),
        concurrency = config.concurrency,
        dry_run = config.dry_run,
        single_run = config.single_run,
        "Configuration loaded"
    );

    let client = Client::new(&config.base_url, &config.token)
        .context("Failed to create linkding client")?;
    check_server_version(&client, &config).await;

    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .context("Failed to create work directory")?;
    let temp_dir = tempfile::Builder::new()
        .prefix("linkding-media-archiver-")
        .tempdir_in(&config.work_dir)
        .context("Failed to create temporary directory")?;
    debug!(path = %temp_dir.path().display(), "Created temporary directory");

    let ytdlp = Ytdlp::new(&config.yt_dlp_path, temp_dir.path())
        .with_format(config.format_selection())
        .with_timeout(config.download_timeout);
    if ytdlp.is_available().await {
        info!("yt-dlp is available");
    } else {
        warn!(path = %config.yt_dlp_path, "yt-dlp not found - downloads will fail");
    }

    let scanner = Scanner::new(client, Arc::new(ytdlp), config.scan_config());
    let schedule = Schedule {
        interval: config.scan_interval,
        single_run: config.single_run,
        skip_first_run: config.skip_first_run,
    };

    let code = tokio::select! {
        () = scan_loop(scanner, schedule) => {
            info!("Single run complete");
            0
        }
        () = shutdown_signal() => {
            warn!("Interrupted, shutting down");
            1
        }
    };

    let temp_path = temp_dir.path().to_path_buf();
    if let Err(e) = temp_dir.close() {
        warn!(path = %temp_path.display(), error = %e, "Failed to remove temporary directory");
    }

    Ok(code)
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LDMA_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        EnvFilter::try_new(level.trim().to_lowercase()).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

/// Log the server version; older servers ignore the bundle filter.
async fn check_server_version(client: &Client, config: &Config) {
    let profile = match client.user_profile().await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(error = %e, "Failed to fetch linkding user profile");
            return;
        }
    };

    let Some(raw) = profile.version else {
        debug!("linkding did not report a version");
        return;
    };

    match raw.parse::<Version>() {
        Ok(version) => {
            info!(version = %version, "Connected to linkding");
            if config.bundle_id.is_some() && !version.at_least(&BUNDLE_FILTER_MIN_VERSION) {
                warn!(
                    version = %version,
                    required = %BUNDLE_FILTER_MIN_VERSION,
                    "linkding is too old to filter by bundle; all bookmarks matching the tags will be scanned"
                );
            }
        }
        Err(e) => warn!(error = %e, "Could not parse linkding version"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
