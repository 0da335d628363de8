use dotenvy::dotenv;
use tracing::info;

use transcoder::config::settings::AppConfig;
use transcoder::infrastructure::db::pool::connect_to_db;
use transcoder::infrastructure::queue::rabbitmq::RabbitMqService;
use transcoder::infrastructure::storage::Storage;
use transcoder::state::AppState;
use transcoder::workers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt::init();

    info!("Starting transcoder service...");

    let config = AppConfig::new()?;
    let db = connect_to_db(&config.database_url).await?;
    let storage = Storage::from_config(&config).await?;
    let queue = RabbitMqService::new(&config.amqp_url).await?;

    let state = AppState::new(config, db, storage, queue);

    tokio::spawn(workers::sweeper::start_retention_sweeper(state.clone()));

    workers::transcoder::start_transcoder_worker(state).await;

    Ok(())
}
