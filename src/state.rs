//! Shared application state handed to every handler and service.

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::infrastructure::events::EventPublisher;
use crate::infrastructure::midtrans::MidtransClient;
use crate::infrastructure::uploads::UploadStore;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub events: EventPublisher,
    pub gateway: Option<MidtransClient>,
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, events: EventPublisher) -> Self {
        let gateway = config
            .midtrans_server_key
            .as_ref()
            .map(|key| MidtransClient::new(config.midtrans_base_url.clone(), key.clone()));
        let uploads = UploadStore::new(config.upload_dir.clone(), config.max_upload_bytes);
        Self { db, config: Arc::new(config), events, gateway, uploads }
    }
}
