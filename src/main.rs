use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qrpass::cli::{Cli, Commands};
use qrpass::config::{self, Config};
use qrpass::models::Unit;
use qrpass::service::TokenService;
use qrpass::store::postgres::PgStore;
use qrpass::{api, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // OTLP export is opt-in: without OTEL_EXPORTER_OTLP_ENDPOINT we only log to stdout.
    use opentelemetry::KeyValue;

    use opentelemetry_sdk::{trace as sdktrace, Resource};

    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "qrpass"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .context("failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "qrpass=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .init();

    let cfg = config::load()?;
    let args = Cli::parse();

    let result = match args.command {
        Some(Commands::Serve { port }) => run_server(cfg, port).await,
        Some(Commands::Init { unit }) => {
            let tokens = connect_service(&cfg).await?;
            let unit = Unit::parse(&unit)?;
            tokens.init_unit(&unit).await?;
            println!("Initialized or already exists for unit: {}", unit);
            Ok(())
        }
        Some(Commands::Generate { unit, json }) => {
            let tokens = connect_service(&cfg).await?;
            let unit = Unit::parse(&unit)?;
            let issued = tokens.issue(&unit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&issued)?);
                return Ok(());
            }
            println!(
                "Token issued:\n  Unit:   {}\n  ID:     {}\n  Token:  {}\n  URL:    {}\n  Image:  {}",
                unit,
                issued.id,
                issued.token,
                issued.url,
                issued.image_path.display()
            );
            Ok(())
        }
        Some(Commands::Resolve { unit, token, json }) => {
            let tokens = connect_service(&cfg).await?;
            let unit = Unit::parse(&unit)?;
            let record = tokens.resolve(&unit, &token).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
                return Ok(());
            }
            println!(
                "{:<8} {:<38} {:<6} {:<6}",
                "ID", "TOKEN", "USED", "RESULT"
            );
            println!(
                "{:<8} {:<38} {:<6} {:<6}",
                record.id,
                record.token.trim_end(),
                record.used,
                record.result
            );
            Ok(())
        }
        None => run_server(cfg, None).await,
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn connect_service(cfg: &Config) -> anyhow::Result<TokenService> {
    let db = PgStore::connect(&cfg.db)
        .await
        .context("failed to connect to database")?;
    TokenService::new(db, cfg)
}

async fn run_server(mut cfg: Config, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        cfg.port = port;
    }

    tracing::info!("Connecting to database...");
    let tokens = connect_service(&cfg).await?;

    tokio::fs::create_dir_all(&cfg.image_dir)
        .await
        .with_context(|| format!("failed to create image directory {}", cfg.image_dir.display()))?;

    let state = Arc::new(AppState { tokens });
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind((cfg.host.as_str(), cfg.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", cfg.host, cfg.port))?;
    tracing::info!("Server running at http://{}:{}/", cfg.host, cfg.port);
    axum::serve(listener, app).await?;

    Ok(())
}
