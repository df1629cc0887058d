use std::sync::Arc;

use sierra_service::SierraService;
use sierra_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SierraService>,
}
impl AppState {
	pub async fn new(config: sierra_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		Ok(Self::from_service(SierraService::new(config, db)))
	}

	pub fn from_service(service: SierraService) -> Self {
		Self { service: Arc::new(service) }
	}
}
