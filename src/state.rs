use crate::config::settings::AppConfig;
use crate::infrastructure::db::pool::DbPool;
use crate::infrastructure::queue::rabbitmq::RabbitMqService;
use crate::infrastructure::storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub storage: Storage,
    pub queue: RabbitMqService,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool, storage: Storage, queue: RabbitMqService) -> Self {
        Self {
            config,
            db,
            storage,
            queue,
        }
    }
}
