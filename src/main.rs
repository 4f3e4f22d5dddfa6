use recruitment_matcher::{
    config::{get_config, init_config, LogFormat},
    database::{pool::create_pool, Stores},
    routes, AppState,
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(config.log_format);

    let stores = match &config.database_url {
        Some(_) => {
            let pool = create_pool(config).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("using postgres store");
            Stores::postgres(pool)
        }
        None => {
            warn!("DATABASE_URL not set, records are kept in memory only");
            Stores::in_memory()
        }
    };

    let app_state = AppState::new(config.clone(), stores)?;
    info!(
        skill_weight = config.scoring_weights.skill_weight(),
        experience_weight = config.scoring_weights.experience_weight(),
        education_weight = config.scoring_weights.education_weight(),
        ranking_threads = config.ranking_threads,
        "matching engine configured"
    );

    let app = routes::router(app_state);

    let listener = TcpListener::bind(&config.server_address).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
