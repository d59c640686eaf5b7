//! Product catalogue and stock API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::{
    db::{ProductRepository, StockAdjustment},
    middleware::Actor,
    models::{
        CreateProductRequest, Muvelet, NewAuditEntry, Product, StockAdjustmentRequest,
        UpdateProductRequest, MAX_STOCK,
    },
    utils::{AppError, AppResult, ValidatedJson},
    AppState,
};

use super::{audit_logs::record, parse_id};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/{id}/stock", post(adjust_stock))
}

fn unique_sku(e: anyhow::Error) -> AppError {
    match AppError::from(e) {
        AppError::Conflict(_) => AppError::conflict("Article number already in use"),
        other => other,
    }
}

fn product_not_found(id: i64) -> AppError {
    AppError::not_found(format!("Product {} not found", id))
}

async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    let products = ProductRepository::new(&state.db).list().await?;
    Ok(Json(products))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    let id = parse_id(&id, "product")?;
    let product = ProductRepository::new(&state.db)
        .get_by_id(id)
        .await?
        .ok_or_else(|| product_not_found(id))?;

    Ok(Json(product))
}

async fn create_product(
    State(state): State<AppState>,
    actor: Actor,
    ValidatedJson(payload): ValidatedJson<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let product = ProductRepository::new(&state.db)
        .create(&payload)
        .await
        .map_err(unique_sku)?;

    tracing::info!(product_id = product.id, cikkszam = %product.cikkszam, "Product created");

    record(
        &state.db,
        NewAuditEntry::new(Muvelet::CreateProduct)
            .actor(actor.id())
            .product(product.id)
            .admin(actor.is_admin())
            .details(serde_json::json!({
                "cikkszam": product.cikkszam,
                "mennyiseg": product.mennyiseg,
            })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateProductRequest>,
) -> AppResult<Json<Product>> {
    let id = parse_id(&id, "product")?;
    if payload.is_empty() {
        return Err(AppError::bad_request("No fields to update"));
    }

    let product = ProductRepository::new(&state.db)
        .update(id, &payload)
        .await
        .map_err(unique_sku)?
        .ok_or_else(|| product_not_found(id))?;

    tracing::info!(product_id = id, "Product updated");

    record(
        &state.db,
        NewAuditEntry::new(Muvelet::UpdateProduct)
            .actor(actor.id())
            .product(id)
            .admin(actor.is_admin())
            .details(serde_json::json!({ "product": product })),
    )
    .await;

    Ok(Json(product))
}

/// Add to or take from the stock on hand
async fn adjust_stock(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<StockAdjustmentRequest>,
) -> AppResult<Json<Product>> {
    let id = parse_id(&id, "product")?;

    let product = match ProductRepository::new(&state.db)
        .adjust_stock(id, payload.valtozas)
        .await?
    {
        StockAdjustment::Applied(product) => product,
        StockAdjustment::NotFound => return Err(product_not_found(id)),
        StockAdjustment::Insufficient { available } => {
            tracing::debug!(product_id = id, available, valtozas = payload.valtozas, "Stock change refused");
            return Err(AppError::conflict(format!(
                "Insufficient stock: {} available, change of {} requested",
                available, payload.valtozas
            )));
        }
        StockAdjustment::OverCapacity { available } => {
            tracing::debug!(product_id = id, available, valtozas = payload.valtozas, "Stock change refused");
            return Err(AppError::conflict(format!(
                "Stock limit exceeded: {} on hand, change of {} requested, at most {} allowed",
                available, payload.valtozas, MAX_STOCK
            )));
        }
    };

    tracing::info!(product_id = id, valtozas = payload.valtozas, mennyiseg = product.mennyiseg, "Stock adjusted");

    record(
        &state.db,
        NewAuditEntry::new(Muvelet::AdjustStock)
            .actor(actor.id())
            .product(id)
            .admin(actor.is_admin())
            .details(serde_json::json!({
                "valtozas": payload.valtozas,
                "mennyiseg": product.mennyiseg,
            })),
    )
    .await;

    Ok(Json(product))
}

async fn delete_product(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id, "product")?;
    if !ProductRepository::new(&state.db).delete(id).await? {
        return Err(product_not_found(id));
    }

    tracing::info!(product_id = id, "Product deleted");

    record(
        &state.db,
        NewAuditEntry::new(Muvelet::DeleteProduct)
            .actor(actor.id())
            .product(id)
            .admin(actor.is_admin()),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
