//! smartprom - SMART Prometheus Exporter
//!
//! Serves smartctl device health data on `/metrics`, refreshed in the
//! background.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          smartprom                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │   Refresh    │───▶│   Snapshot   │───▶│ HTTP server  │       │
//! │  │  Scheduler   │    │   (Arc swap) │    │  /metrics    │       │
//! │  └──────────────┘    └──────────────┘    └──────────────┘       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use smartprom::adapters::{prometheus, LoggingEventPublisher, TokioCommandRunner};
use smartprom::controller::{RefreshConfig, RefreshScheduler, SnapshotHandle};
use smartprom::error::{Error, Result};
use smartprom::smartctl::{InvokerConfig, SmartctlInvoker};
use smartprom::PrometheusRegistryAdapter;

// =============================================================================
// CLI Arguments
// =============================================================================

/// SMART Prometheus Exporter - smartctl health data as Prometheus metrics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Seconds between the end of one refresh and the start of the next
    #[arg(
        long,
        env = "SMARTCTL_REFRESH_INTERVAL",
        default_value = "60",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    refresh_interval: u64,

    /// Listen port
    #[arg(long, env = "SMARTCTL_EXPORTER_PORT", default_value = "9902")]
    port: u16,

    /// Listen address
    #[arg(long, env = "SMARTCTL_EXPORTER_ADDRESS", default_value = "0.0.0.0")]
    address: String,

    /// smartctl binary
    #[arg(long, env = "SMARTCTL_PATH", default_value = "smartctl")]
    smartctl_path: String,

    /// Per-invocation timeout in seconds
    #[arg(
        long,
        env = "SMARTCTL_TIMEOUT",
        default_value = "30",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout: u64,

    /// Devices queried in parallel
    #[arg(long, env = "SMARTCTL_MAX_CONCURRENT", default_value = "4")]
    max_concurrent: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn listen_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .address
            .parse()
            .map_err(|e| Error::Config(format!("Invalid listen address {}: {}", self.address, e)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    info!("Starting smartprom {}", env!("CARGO_PKG_VERSION"));
    info!("  Refresh interval: {}s", args.refresh_interval);
    info!("  smartctl: {} (timeout {}s)", args.smartctl_path, args.timeout);
    info!("  Max concurrent invocations: {}", args.max_concurrent);

    let addr = args.listen_addr()?;

    let invoker = SmartctlInvoker::new(
        InvokerConfig {
            smartctl_path: args.smartctl_path.clone(),
            timeout: Duration::from_secs(args.timeout),
        },
        Arc::new(TokioCommandRunner::new()),
    );

    let scheduler = Arc::new(RefreshScheduler::new(
        RefreshConfig {
            interval: Duration::from_secs(args.refresh_interval),
            max_concurrent: args.max_concurrent,
        },
        invoker,
        Arc::new(LoggingEventPublisher::info_level()),
    ));

    let handle = scheduler.handle();
    let cancel = CancellationToken::new();
    let refresh = tokio::spawn(scheduler.run(cancel.clone()));

    let result = tokio::select! {
        result = run_http_server(addr, handle) => result,
        _ = shutdown_signal() => {
            info!("Received shutdown signal");
            Ok(())
        }
    };

    cancel.cancel();
    if let Err(e) = refresh.await {
        warn!("Refresh task ended abnormally: {}", e);
    }

    info!("Exporter shutdown complete");
    result
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let quiet: Directive = "hyper=warn"
        .parse()
        .map_err(|e| Error::Config(format!("Invalid log directive: {}", e)))?;

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive(quiet);

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }

    Ok(())
}

// =============================================================================
// HTTP Server
// =============================================================================

fn text_response(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn route(path: &str, snapshot: &SnapshotHandle) -> Response<Full<Bytes>> {
    const PLAIN: &str = "text/plain; charset=utf-8";

    match path {
        "/metrics" => match snapshot.current() {
            Some(published) => match PrometheusRegistryAdapter::new().render_text(&published.snapshot) {
                Ok(body) => text_response(StatusCode::OK, prometheus::CONTENT_TYPE, body),
                Err(e) => {
                    error!("Failed to render metrics: {}", e);
                    text_response(StatusCode::INTERNAL_SERVER_ERROR, PLAIN, "render failed")
                }
            },
            None => text_response(StatusCode::SERVICE_UNAVAILABLE, PLAIN, "no snapshot published yet"),
        },
        "/healthz" | "/livez" => text_response(StatusCode::OK, PLAIN, "ok"),
        "/readyz" => {
            if snapshot.is_ready() && !snapshot.is_stale() {
                text_response(StatusCode::OK, PLAIN, "ok")
            } else {
                text_response(StatusCode::SERVICE_UNAVAILABLE, PLAIN, "not ready")
            }
        }
        _ => text_response(StatusCode::NOT_FOUND, PLAIN, "not found"),
    }
}

async fn run_http_server(addr: SocketAddr, snapshot: SnapshotHandle) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind metrics server: {}", e)))?;

    info!("Metrics server listening on {}", addr);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Metrics server accept error: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let snapshot = snapshot.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let response = route(req.uri().path(), &snapshot);
                async move { Ok::<_, Infallible>(response) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Connection from {} closed with error: {}", peer, e);
            }
        });
    }
}
