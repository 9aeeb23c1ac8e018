use std::sync::Arc;

use sqlx::SqlitePool;

use crate::{images::ImageStore, notifier::Notifier};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub notifier: Notifier,
    pub images: ImageStore,
    pub jwt_secret: Arc<String>,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        notifier: Notifier,
        images: ImageStore,
        jwt_secret: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            notifier,
            images,
            jwt_secret: Arc::new(jwt_secret.into()),
        }
    }
}
