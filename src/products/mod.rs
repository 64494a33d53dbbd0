mod dto;
pub mod handlers;
mod repo;
pub mod repo_types;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use axum::Router;
use uuid::Uuid;

use crate::db::StoreError;
use crate::state::AppState;

pub use repo::PgProductStore;
pub use repo_types::{NewProduct, Product, ProductPatch};

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Newest first.
    async fn list_page(&self, limit: i64, offset: i64) -> Result<Vec<Product>, StoreError>;
    async fn count(&self) -> Result<i64, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError>;
    async fn create(&self, owner: Uuid, new: NewProduct) -> Result<Product, StoreError>;
    async fn update(&self, id: Uuid, patch: ProductPatch) -> Result<Option<Product>, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::admin_routes())
}
