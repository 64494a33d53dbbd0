use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NewProduct, Product, ProductPatch, ProductStore};
use crate::db::StoreError;

#[derive(Default)]
pub struct InMemoryProductStore {
    products: RwLock<HashMap<Uuid, Product>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn list_page(&self, limit: i64, offset: i64) -> Result<Vec<Product>, StoreError> {
        let mut all: Vec<Product> = self.products.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        Ok(self.products.read().await.len() as i64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn create(&self, owner: Uuid, new: NewProduct) -> Result<Product, StoreError> {
        let product = Product {
            id: Uuid::new_v4(),
            name: new.name,
            price: new.price,
            description: new.description,
            category: new.category,
            seller: new.seller,
            stock: new.stock,
            user_id: owner,
            created_at: OffsetDateTime::now_utc(),
        };
        self.products
            .write()
            .await
            .insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(&self, id: Uuid, patch: ProductPatch) -> Result<Option<Product>, StoreError> {
        let mut products = self.products.write().await;
        let Some(p) = products.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = patch.name {
            p.name = v;
        }
        if let Some(v) = patch.price {
            p.price = v;
        }
        if let Some(v) = patch.description {
            p.description = v;
        }
        if let Some(v) = patch.category {
            p.category = v;
        }
        if let Some(v) = patch.seller {
            p.seller = v;
        }
        if let Some(v) = patch.stock {
            p.stock = v;
        }
        Ok(Some(p.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.products.write().await.remove(&id).is_some())
    }
}
