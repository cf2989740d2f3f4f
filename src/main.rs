//! VoltRide ERP - Dealership ERP backend for the VoltRide e-bike network
//!
//! Role-gated APIs over products, orders, billing, inventory, service
//! tickets, attendance, notifications and analytics rollups.

use std::env;
use std::io::BufReader;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use config::LogFormat;
use voltride::{api, config, db, middleware, services, AppConfig, AppState};
use services::NotificationService;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|arg| arg == "--fix-database") {
        return fix_database().await;
    }

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        println!("VoltRide ERP {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration first (before logging, so we know log format)
    let config = AppConfig::load().context("Failed to load configuration")?;

    // The guard must be kept alive for the duration of the program
    // to ensure log messages are flushed to files
    let _log_guard = init_logging(&config);

    info!("VoltRide ERP starting up");
    info!("Configuration loaded successfully");

    ensure_data_directory(&config)?;

    info!("Initializing database connection");
    let db = db::init_pool(&config.database)
        .await
        .context("Failed to initialize database")?;

    info!("Initializing notification service");
    let notifications = NotificationService::new(db.clone());

    info!("Starting background scheduler");
    let _scheduler = services::start_background_scheduler(
        db.clone(),
        config.attendance.clone(),
        notifications.clone(),
    );

    let state = AppState {
        config: config.clone(),
        db,
        notifications,
    };

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address configuration")?;

    if let Some(ref tls_config) = config.server.tls {
        info!("Starting HTTPS server on https://{}", addr);
        info!("TLS certificate: {:?}", tls_config.cert_file);

        let rustls_config = create_rustls_config(tls_config).await?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .context("Failed to bind to address")?;

        info!("HTTPS server is ready to accept connections");

        axum_server::from_tcp_rustls(listener.into_std()?, rustls_config)?
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .context("HTTPS server error")?;
    } else {
        info!("Starting HTTP server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .context("Failed to bind to address")?;

        info!("HTTP server is ready to accept connections");

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .context("HTTP server error")?;
    }

    Ok(())
}

/// Create RusTLS configuration from TLS config
async fn create_rustls_config(
    tls_config: &config::TlsConfig,
) -> Result<axum_server::tls_rustls::RustlsConfig> {
    use axum_server::tls_rustls::RustlsConfig;
    use rustls::crypto::aws_lc_rs::default_provider;
    use rustls::ServerConfig;

    let cert_file = std::fs::File::open(&tls_config.cert_file)
        .with_context(|| format!("Failed to open certificate file: {:?}", tls_config.cert_file))?;
    let mut cert_reader = BufReader::new(cert_file);
    let certs: Vec<_> = rustls_pemfile::certs(&mut cert_reader)
        .filter_map(|r| r.ok())
        .collect();

    if certs.is_empty() {
        anyhow::bail!("No certificates found in {:?}", tls_config.cert_file);
    }

    let key_file = std::fs::File::open(&tls_config.key_file)
        .with_context(|| format!("Failed to open key file: {:?}", tls_config.key_file))?;
    let mut key_reader = BufReader::new(key_file);
    let key = rustls_pemfile::private_key(&mut key_reader)
        .with_context(|| format!("Failed to read private key: {:?}", tls_config.key_file))?
        .ok_or_else(|| anyhow::anyhow!("No private key found in {:?}", tls_config.key_file))?;

    let provider = default_provider();

    let versions: Vec<&'static rustls::SupportedProtocolVersion> =
        match tls_config.min_version.as_str() {
            "1.3" => vec![&rustls::version::TLS13],
            _ => vec![&rustls::version::TLS12, &rustls::version::TLS13],
        };

    info!("TLS configured with minimum version: {}", tls_config.min_version);

    let mut server_config = ServerConfig::builder_with_provider(provider.into())
        .with_protocol_versions(&versions)
        .context("Failed to set TLS protocol versions")?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("Failed to build TLS server config")?;

    server_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(RustlsConfig::from_config(Arc::new(server_config)))
}

/// Initialize the logging/tracing infrastructure
fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use config::LogTarget;
    use tracing_subscriber::{prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let log_config = &config.logging;

    match &log_config.target {
        LogTarget::Console => {
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_console_logging(subscriber, &log_config.format);
            None
        }
        LogTarget::File => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_file_logging(subscriber, &log_config.format, writer);
            Some(guard)
        }
        LogTarget::Both => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_both_logging(subscriber, &log_config.format, writer);
            Some(guard)
        }
    }
}

/// Create a file writer with optional daily rotation
fn create_file_writer(
    log_config: &config::LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

/// Initialize console-only logging
fn init_console_logging<S>(subscriber: S, format: &LogFormat)
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(fmt::layer().compact().with_target(false))
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false),
                )
                .init();
        }
    }
}

/// Initialize file-only logging
fn init_file_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true).with_writer(writer))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(writer),
                )
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .with_writer(writer),
                )
                .init();
        }
    }
}

/// Initialize both console and file logging
fn init_both_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .with(fmt::layer().json().with_target(true).with_writer(writer))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(fmt::layer().compact().with_target(false))
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(writer),
                )
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false),
                )
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .with_writer(writer),
                )
                .init();
        }
    }
}

/// Ensure the data directory exists
fn ensure_data_directory(config: &AppConfig) -> Result<()> {
    if let Some(path) = config.database.url.strip_prefix("sqlite://") {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).context("Failed to create data directory")?;
                info!("Created data directory: {:?}", parent);
            }
        }
    }
    Ok(())
}

/// Create the application router with all routes and middleware
fn create_router(state: AppState) -> Router {
    // CORS is open; the API is consumed by dealer and customer apps served
    // from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let api_rate_limit = middleware::create_rate_limit_state(middleware::api_rate_limit_config());
    let auth_rate_limit =
        middleware::create_rate_limit_state(middleware::auth_rate_limit_config());

    middleware::spawn_rate_limit_cleanup(api_rate_limit.clone());

    // Authentication must not be applied globally, otherwise public
    // endpoints like /api/v1/auth/login become unusable. Public routes stay
    // unauthenticated; auth middleware wraps only protected routes.
    //
    // Rate limiting: stricter limits on auth endpoints, standard limits on
    // the rest of the API.
    let api_router = Router::new()
        .nest(
            "/api/v1",
            api::public_routes().layer(axum::middleware::from_fn_with_state(
                auth_rate_limit,
                middleware::rate_limit_middleware,
            )),
        )
        .nest(
            "/api/v1",
            api::protected_routes()
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    middleware::auth::auth_middleware,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    api_rate_limit,
                    middleware::rate_limit_middleware,
                )),
        )
        .layer(axum::middleware::from_fn(
            middleware::api_cache_control_middleware,
        ))
        .with_state(state);

    api_router
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(trace_layer)
        .layer(cors)
}

/// Print help message
fn print_help() {
    println!(
        r#"VoltRide ERP {}

USAGE:
    voltride [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information
    --fix-database          Fix database by running all migrations and ensuring
                            all required tables exist. This is useful when
                            upgrading from an older version or recovering from
                            migration failures.

ENVIRONMENT:
    VOLTRIDE_CONFIG     Path to configuration file (default: config.yaml)

CONFIGURATION:
    The application looks for configuration files in the following order:
    1. Path specified by VOLTRIDE_CONFIG environment variable
    2. ./config.yaml
    3. /etc/voltride/config.yaml"#,
        env!("CARGO_PKG_VERSION")
    );
}

/// Fix database by running migrations, then verify all tables exist.
async fn fix_database() -> Result<()> {
    use sqlx::Row;

    println!("VoltRide ERP Database Repair Tool v{}", env!("CARGO_PKG_VERSION"));
    println!();

    let config = AppConfig::load().context("Failed to load configuration")?;
    ensure_data_directory(&config)?;

    println!("Database URL: {}", config.database.url);
    println!("Connecting to database and running migrations...");

    let pool = db::init_pool(&config.database)
        .await
        .context("Failed to initialize database")?;

    println!("Migrations completed successfully.");
    println!();
    println!("Verifying database tables...");

    let rows = sqlx::query(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%'",
    )
    .fetch_all(&pool)
    .await
    .context("Failed to query database tables")?;

    let existing_tables: Vec<String> = rows
        .iter()
        .map(|row| row.get::<String, _>("name"))
        .collect();

    println!("Found {} tables:", existing_tables.len());
    for table in &existing_tables {
        println!("  - {}", table);
    }

    let required_tables: &[&str] = &[
        "users",
        "products",
        "dealer_orders",
        "customer_orders",
        "sales",
        "dealer_inventory",
        "inventory_transactions",
        "stock_movements",
        "service_requests",
        "warranty_trackers",
        "attendance",
        "notifications",
    ];

    let missing_tables: Vec<&str> = required_tables
        .iter()
        .filter(|&&table| !existing_tables.iter().any(|t| t == table))
        .copied()
        .collect();

    println!();

    if missing_tables.is_empty() {
        println!("Database repair completed successfully!");
        println!("All {} required tables are present.", required_tables.len());
    } else {
        eprintln!("WARNING: {} missing table(s) after migrations:", missing_tables.len());
        for table in &missing_tables {
            eprintln!("  - {}", table);
        }
        return Err(anyhow::anyhow!(
            "Database repair incomplete: {} missing tables",
            missing_tables.len()
        ));
    }

    Ok(())
}
