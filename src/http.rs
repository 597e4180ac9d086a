//! HTTP transport for the order service.
//!
//! Requires the `http` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! - `GET /health`: `{ "ok": true }`
//! - `GET /orders`: every order, newest first
//! - `POST /orders`: `{ "customerId", "productId", "quantity" }` → 201 Order
//! - `GET /orders/:id`: one order
//! - `GET /orders/by-customer/:customer_id`: a customer's orders, newest first
//! - `PATCH|POST|PUT /orders/:id/status`: `{ "status" }` → 200 Order
//!
//! Errors are `{ "error": { "code", "message" } }` with the status code of
//! the underlying [`OrderError`].
//!
//! Service calls block on the store, so handlers run them on the blocking
//! pool.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::bus::Sender;
use crate::error::OrderError;
use crate::orders::{OrderService, OrderStatus};
use crate::store::EntityStore;

type SharedService<S, P> = Arc<OrderService<S, P>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderRequest {
    #[serde(default)]
    customer_id: String,
    #[serde(default)]
    product_id: String,
    #[serde(default)]
    quantity: i64,
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    #[serde(default)]
    status: String,
}

/// Error response carrying an [`OrderError`].
#[derive(Debug)]
pub struct ApiError(pub OrderError);

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(OrderError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = json!({
            "error": {
                "code": self.0.code(),
                "message": self.0.public_message(),
            }
        });
        (status, Json(body)).into_response()
    }
}

/// Build an axum `Router` over the given service.
pub fn router<S, P>(service: SharedService<S, P>) -> Router
where
    S: EntityStore + 'static,
    P: Sender + 'static,
{
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/orders",
            get(list_handler::<S, P>).post(create_handler::<S, P>),
        )
        .route("/orders/by-customer/:customer_id", get(by_customer_handler::<S, P>))
        .route("/orders/:id", get(get_handler::<S, P>))
        .route(
            "/orders/:id/status",
            axum::routing::patch(status_handler::<S, P>)
                .post(status_handler::<S, P>)
                .put(status_handler::<S, P>),
        )
        .with_state(service)
}

/// Serve the service over HTTP at the given address until `shutdown` resolves.
pub async fn serve<S, P, F>(
    service: SharedService<S, P>,
    addr: SocketAddr,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    S: EntityStore + 'static,
    P: Sender + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(service);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Run a service call on the blocking pool.
async fn blocking<S, P, T, F>(service: SharedService<S, P>, call: F) -> Result<T, ApiError>
where
    S: EntityStore + 'static,
    P: Sender + 'static,
    T: Send + 'static,
    F: FnOnce(&OrderService<S, P>) -> Result<T, OrderError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || call(&service))
        .await
        .map_err(|e| OrderError::Internal(e.to_string()))?
        .map_err(ApiError)
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn list_handler<S, P>(State(service): State<SharedService<S, P>>) -> Result<Response, ApiError>
where
    S: EntityStore + 'static,
    P: Sender + 'static,
{
    let orders = blocking(service, |s| s.list_orders()).await?;
    Ok(Json(orders).into_response())
}

async fn by_customer_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    Path(customer_id): Path<String>,
) -> Result<Response, ApiError>
where
    S: EntityStore + 'static,
    P: Sender + 'static,
{
    let orders = blocking(service, move |s| s.orders_by_customer(&customer_id)).await?;
    Ok(Json(orders).into_response())
}

async fn get_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError>
where
    S: EntityStore + 'static,
    P: Sender + 'static,
{
    let order = blocking(service, move |s| s.get_order(&id)).await?;
    Ok(Json(order).into_response())
}

async fn create_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Response, ApiError>
where
    S: EntityStore + 'static,
    P: Sender + 'static,
{
    let Json(request) = body?;
    if request.quantity < 1 {
        return Err(OrderError::Validation("quantity must be at least 1".into()).into());
    }
    let quantity = u32::try_from(request.quantity).map_err(|_| {
        OrderError::Validation(format!("quantity must be at most {}", u32::MAX))
    })?;

    let order = blocking(service, move |s| {
        s.create_order(&request.customer_id, &request.product_id, quantity)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(order)).into_response())
}

async fn status_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Response, ApiError>
where
    S: EntityStore + 'static,
    P: Sender + 'static,
{
    let Json(request) = body?;
    let status: OrderStatus = request.status.parse()?;

    let order = blocking(service, move |s| s.update_status(&id, status)).await?;
    Ok(Json(order).into_response())
}
