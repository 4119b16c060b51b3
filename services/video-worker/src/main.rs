use anyhow::Result;
use aws_config::BehaviorVersion;
use common::database::{DatabaseConfig, health_check, init_pool};
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;
use video_worker::admin::{self, AdminState};
use video_worker::ai::OpenAiClient;
use video_worker::config::WorkerConfig;
use video_worker::media::{FfmpegEngine, default_ladder};
use video_worker::orchestrator::Orchestrator;
use video_worker::pipeline::VideoPipeline;
use video_worker::repository::{JobRepository, PgJobRepository};
use video_worker::storage::{BlobStore, S3BlobStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_max_level(Level::INFO)
        .init();

    info!("Starting video processing worker");

    let config = WorkerConfig::from_env()?;
    config.validate()?;

    // Initialize database connection
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }
    sqlx::migrate!("./migrations").run(&pool).await?;

    // Initialize AWS S3 client, optionally against a MinIO-style endpoint
    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(config.s3_force_path_style);
    if let Some(endpoint) = &config.s3_endpoint {
        s3_config = s3_config.endpoint_url(endpoint);
    }
    let s3_client = aws_sdk_s3::Client::from_conf(s3_config.build());

    let s3_store = S3BlobStore::new(
        s3_client,
        config.cdn_base_url.clone(),
        config.presigned_url_expiry(),
    );
    s3_store.ensure_buckets().await?;

    let blob_store: Arc<dyn BlobStore> = Arc::new(s3_store);
    let repository: Arc<dyn JobRepository> = Arc::new(PgJobRepository::new(pool));
    let engine = Arc::new(FfmpegEngine::new(
        config.ffmpeg_path.clone(),
        config.ffprobe_path.clone(),
        config.probe_timeout(),
        config.encode_timeout(),
    ));
    let analysis_client = Arc::new(OpenAiClient::new(
        config.ai_endpoint.clone(),
        config.ai_api_key.clone(),
        config.ai_model.clone(),
        config.ai_max_tokens,
        config.ai_temperature,
        config.ai_timeout(),
    )?);

    let pipeline = VideoPipeline::new(
        engine,
        Arc::clone(&blob_store),
        analysis_client,
        Arc::clone(&repository),
        default_ladder(),
    );
    let orchestrator = Orchestrator::new(
        Arc::clone(&repository),
        blob_store,
        pipeline,
        config.temp_root.clone(),
    );

    let mut scheduler = orchestrator
        .start_polling(&config.polling_schedule)
        .await?;

    let app = admin::create_router(AdminState {
        orchestrator,
        repository,
    });
    let listener = tokio::net::TcpListener::bind(&config.admin_bind_address).await?;
    info!("Admin surface listening on {}", config.admin_bind_address);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Admin server stopped: {}", e);
        }
    });

    info!("Video processing worker started successfully");

    // Keep the service running
    tokio::signal::ctrl_c().await?;
    info!("Shutting down video processing worker");
    scheduler.shutdown().await?;

    Ok(())
}
