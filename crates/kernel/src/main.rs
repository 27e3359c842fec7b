//! Nomadir kernel
//!
//! HTTP search API over listings, plus a filter compiler inspector.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::{HeaderValue, Method};
use clap::{Parser, Subcommand};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use nomadir_kernel::search::{DescriptorSqlBuilder, FilterCompiler, SearchFilters, SortSpec};
use nomadir_kernel::{AppState, Config, routes};

#[derive(Parser)]
#[command(name = "nomadir", about = "Listing search and filter service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,

    /// Compile a filter state and print the resulting query.
    Compile {
        /// Filter state as JSON, e.g. '{"category":"cafe"}'.
        #[arg(long, default_value = "{}")]
        filters: String,

        /// Page number (1-indexed).
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Sort as `field` or `field:asc|desc`.
        #[arg(long)]
        sort: Option<String>,

        /// Page size.
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Compile {
            filters,
            page,
            sort,
            limit,
        } => compile(&filters, page, sort.as_deref(), limit),
    }
}

async fn serve() -> Result<()> {
    info!("Starting Nomadir kernel");

    let config = Config::from_env().context("failed to load configuration")?;
    info!(port = config.port, "Configuration loaded");

    let state = AppState::new(&config)
        .await
        .context("failed to initialize application state")?;

    info!(
        store = state.store_name(),
        filter_groups = state.registry().groups().len(),
        "Search service ready"
    );

    let cors = build_cors_layer(&config);

    // TraceLayer → CORS → routes
    let app: Router = routes::router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn compile(filters: &str, page: u32, sort: Option<&str>, limit: Option<u32>) -> Result<()> {
    let filters: SearchFilters =
        serde_json::from_str(filters).context("filters must be a JSON object")?;
    let sort = match sort {
        Some(raw) => Some(SortSpec::parse(raw).with_context(|| format!("invalid sort: {raw}"))?),
        None => None,
    };

    let descriptor = FilterCompiler::default().compile(&filters, sort.as_ref(), page, limit);

    let clauses = descriptor.clause_text();
    println!("where:  {}", if clauses.is_empty() { "-" } else { &clauses });
    for param in &descriptor.params {
        println!("param:  {} = {}", param.key, serde_json::to_string(&param.value)?);
    }
    println!("limit:  {}", descriptor.limit);
    println!("offset: {}", descriptor.offset);
    println!("sql:    {}", DescriptorSqlBuilder::new(&descriptor).to_inline_sql());

    Ok(())
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    if config.cors_allowed_origins.len() == 1 && config.cors_allowed_origins[0] == "*" {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
