use optlots::{api, config::Config, CsvTransactionSource, LegPipeline, TransactionSource};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    let source: Arc<dyn TransactionSource> = Arc::new(CsvTransactionSource::new(
        config.transactions_path.clone(),
        config.default_account_name.clone(),
    ));

    // Fail fast on an unreadable or malformed transaction file
    match LegPipeline::new(source.clone()).run().await {
        Ok(outcome) => {
            for failure in &outcome.failures {
                tracing::warn!("{}", failure.warning());
            }
        }
        Err(e) => {
            eprintln!("Failed to load transactions: {}", e);
            std::process::exit(1);
        }
    }

    let pipeline = Arc::new(LegPipeline::new(source));
    let app = api::create_router(api::AppState::new(pipeline));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
