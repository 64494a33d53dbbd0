use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{
    NewProductRequest, PageQuery, ProductDeletedResponse, ProductListResponse, ProductResponse,
    UpdateProductRequest,
};
use super::{NewProduct, ProductPatch};
use crate::{
    auth::session::{AdminOnly, Authorized},
    error::AppError,
    extract::{ApiJson, ApiPath, ApiQuery},
    state::AppState,
};

pub const PAGE_SIZE: i64 = 4;
const MAX_NAME_LEN: usize = 100;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/product/:id", get(get_product))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/product/new", post(new_product))
        .route(
            "/admin/product/:id",
            axum::routing::put(update_product).delete(delete_product),
        )
}

fn product_not_found() -> AppError {
    AppError::NotFound("Product not found".into())
}

fn check_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Please enter product name".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "Product name cannot exceed {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

fn check_price(price: f64) -> Result<f64, AppError> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::BadRequest("Product price must be zero or more".into()));
    }
    Ok(price)
}

fn check_stock(stock: i32) -> Result<i32, AppError> {
    if stock < 0 {
        return Err(AppError::BadRequest("Product stock cannot be negative".into()));
    }
    Ok(stock)
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<PageQuery>,
) -> Result<Json<ProductListResponse>, AppError> {
    let offset = q
        .page
        .max(1)
        .checked_sub(1)
        .and_then(|p| p.checked_mul(PAGE_SIZE))
        .ok_or_else(|| AppError::BadRequest("Page number is out of range".into()))?;
    let product_count = state.products.count().await?;
    let products = state.products.list_page(PAGE_SIZE, offset).await?;
    Ok(Json(ProductListResponse {
        success: true,
        count: products.len(),
        product_count,
        products,
    }))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = state
        .products
        .find_by_id(id)
        .await?
        .ok_or_else(product_not_found)?;
    Ok(Json(ProductResponse {
        success: true,
        product,
    }))
}

#[instrument(skip(state, admin, payload))]
pub async fn new_product(
    Authorized(admin, _): Authorized<AdminOnly>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    let new = NewProduct {
        name: check_name(&payload.name)?,
        price: check_price(payload.price)?,
        description: payload.description,
        category: payload.category,
        seller: payload.seller,
        stock: check_stock(payload.stock)?,
    };
    let product = state.products.create(admin.id, new).await?;
    info!(product_id = %product.id, admin_id = %admin.id, "product created");
    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            success: true,
            product,
        }),
    ))
}

#[instrument(skip(state, admin, payload))]
pub async fn update_product(
    Authorized(admin, _): Authorized<AdminOnly>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    let patch = ProductPatch {
        name: payload.name.as_deref().map(check_name).transpose()?,
        price: payload.price.map(check_price).transpose()?,
        description: payload.description,
        category: payload.category,
        seller: payload.seller,
        stock: payload.stock.map(check_stock).transpose()?,
    };
    let product = state
        .products
        .update(id, patch)
        .await?
        .ok_or_else(product_not_found)?;
    info!(product_id = %id, admin_id = %admin.id, "product updated");
    Ok(Json(ProductResponse {
        success: true,
        product,
    }))
}

#[instrument(skip(state, admin))]
pub async fn delete_product(
    Authorized(admin, _): Authorized<AdminOnly>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ProductDeletedResponse>, AppError> {
    if !state.products.delete(id).await? {
        return Err(product_not_found());
    }
    info!(product_id = %id, admin_id = %admin.id, "product deleted");
    Ok(Json(ProductDeletedResponse {
        success: true,
        message: "Product deleted successfully".into(),
    }))
}
