use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{NewProduct, Product, ProductPatch, ProductStore};
use crate::db::StoreError;

#[derive(Clone)]
pub struct PgProductStore {
    db: PgPool,
}

impl PgProductStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn list_page(&self, limit: i64, offset: i64) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price, description, category, seller, stock, user_id, created_at
            FROM products
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(&self.db)
            .await?;
        Ok(n)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price, description, category, seller, stock, user_id, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn create(&self, owner: Uuid, new: NewProduct) -> Result<Product, StoreError> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (id, name, price, description, category, seller, stock, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, name, price, description, category, seller, stock, user_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.name)
        .bind(new.price)
        .bind(new.description)
        .bind(new.category)
        .bind(new.seller)
        .bind(new.stock)
        .bind(owner)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: Uuid, patch: ProductPatch) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
               SET name        = COALESCE($2, name),
                   price       = COALESCE($3, price),
                   description = COALESCE($4, description),
                   category    = COALESCE($5, category),
                   seller      = COALESCE($6, seller),
                   stock       = COALESCE($7, stock)
             WHERE id = $1
            RETURNING id, name, price, description, category, seller, stock, user_id, created_at
            "#,
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.price)
        .bind(patch.description)
        .bind(patch.category)
        .bind(patch.seller)
        .bind(patch.stock)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
