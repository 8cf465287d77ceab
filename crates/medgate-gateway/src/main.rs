//! # medgate-gateway entry point
//!
//! Loads configuration, builds the application and serves it until Ctrl-C
//! or SIGTERM. Configuration problems abort startup before the listener binds.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use medgate_gateway::{app, GatewayConfig, GatewayState};

/// Authenticating reverse proxy for the medgate services.
#[derive(Parser, Debug)]
#[command(name = "medgate-gateway", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    /// Ignored when RUST_LOG is set.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// YAML route table replacing the built-in one.
    #[arg(long, env = "GATEWAY_ROUTES_FILE")]
    routes: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// Validate configuration and exit without serving.
    #[arg(long)]
    check: bool,
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("info,medgate_gateway=debug"),
        _ => EnvFilter::new("debug"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let config = match GatewayConfig::from_env(cli.routes.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    for rule in config.routes.rules() {
        tracing::debug!(
            route = rule.name(),
            method = %rule.method_pattern(),
            path = %rule.path_pattern(),
            upstream = %rule.upstream().base(),
            auth = rule.auth_policy().as_str(),
            "route"
        );
    }

    if cli.check {
        tracing::info!(routes = config.routes.rules().len(), "configuration valid");
        return ExitCode::SUCCESS;
    }

    let addr = config.listen_addr;
    let state = match GatewayState::from_config(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("startup failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, "failed to bind: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%addr, "medgate gateway listening");

    if let Err(e) = axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("server error: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!("medgate gateway stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {e}");
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
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
