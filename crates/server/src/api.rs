//! HTTP surface: bearer-token actor resolution, routing, and the
//! error-to-status mapping. Handlers stay thin; every decision lives in the
//! engines.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::error;

use souk_core::domain::actor::{Actor, IdentityProvider};
use souk_core::domain::freelancer::FreelancerId;
use souk_core::domain::order::{OrderDraft, OrderId, OrderItemDraft, OrderStatus};
use souk_core::domain::product::{ProductId, ServiceId};
use souk_core::domain::proposal::ProposalId;
use souk_core::domain::quotation::{
    NewQuotation, QuotationContact, QuotationId, QuotationPatch, QuotationStatus,
};
use souk_core::errors::EngineError;
use souk_engine::{InviteOutcome, LifecycleManager, OrderEngine};

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<LifecycleManager>,
    pub orders: Arc<OrderEngine>,
    pub identity: Arc<dyn IdentityProvider>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/quotations", post(create_quotation).get(list_quotations))
        .route(
            "/api/quotations/{id}",
            get(read_quotation).put(update_quotation).delete(delete_quotation),
        )
        .route("/api/quotations/{id}/invite", post(invite_freelancer))
        .route("/api/quotations/{id}/bid", post(submit_bid))
        .route("/api/quotations/{id}/accept/{proposal_id}", post(accept_proposal))
        .route("/api/orders", post(create_order).get(list_orders))
        .route("/api/orders/{id}", get(read_order).delete(delete_order))
        .route("/api/orders/{id}/status", put(update_order_status))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(error: EngineError) -> Self {
        Self(error)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
            EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::Conflict(_) | EngineError::InsufficientStock { .. } => {
                StatusCode::CONFLICT
            }
            EngineError::Unauthenticated => StatusCode::UNAUTHORIZED,
            EngineError::Internal(detail) => {
                error!(event_name = "api.internal_error", detail = %detail);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody { error: self.0.user_message() })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Actor resolution
// ---------------------------------------------------------------------------

/// Resolve the optional bearer credential. A missing header is a guest; a
/// presented but unknown credential is an authentication failure.
async fn resolve_actor(state: &AppState, headers: &HeaderMap) -> Result<Option<Actor>, ApiError> {
    let Some(value) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let raw = value.to_str().map_err(|_| EngineError::Unauthenticated)?;
    let token = raw.strip_prefix("Bearer ").ok_or(EngineError::Unauthenticated)?;

    let actor = state.identity.resolve(token).await?.ok_or(EngineError::Unauthenticated)?;
    Ok(Some(actor))
}

async fn require_actor(state: &AppState, headers: &HeaderMap) -> Result<Actor, ApiError> {
    resolve_actor(state, headers).await?.ok_or_else(|| EngineError::Unauthenticated.into())
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateQuotationRequest {
    pub service_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub description: String,
    pub preferred_timeline: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub freelancer_id: i64,
}

#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub proposal: souk_core::domain::proposal::Proposal,
    pub already_invited: bool,
}

#[derive(Debug, Deserialize)]
pub struct BidRequest {
    pub price: Decimal,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuotationRequest {
    pub status: Option<String>,
    pub selected_proposal_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub shipping_address: String,
    pub payment_method: String,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: i64,
    pub quantity: i64,
    pub price: Decimal,
    pub color: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
}

// ---------------------------------------------------------------------------
// Quotation handlers
// ---------------------------------------------------------------------------

async fn create_quotation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateQuotationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = resolve_actor(&state, &headers).await?;

    let submission = NewQuotation {
        service_id: ServiceId(request.service_id),
        requester: None,
        contact: QuotationContact {
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            phone: request.phone,
            address: request.address,
            city: request.city,
            postal_code: request.postal_code,
        },
        description: request.description,
        preferred_timeline: request.preferred_timeline,
    };

    let quotation = state.lifecycle.create(actor.as_ref(), submission).await?;
    Ok((StatusCode::CREATED, Json(quotation)))
}

async fn list_quotations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let quotations = state.lifecycle.list(&actor).await?;
    Ok(Json(quotations))
}

async fn read_quotation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let detail = state.lifecycle.read(&actor, QuotationId(id)).await?;
    Ok(Json(detail))
}

async fn invite_freelancer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<InviteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let outcome = state
        .lifecycle
        .invite(&actor, QuotationId(id), FreelancerId(request.freelancer_id))
        .await?;

    let response = match outcome {
        InviteOutcome::Invited(proposal) => InviteResponse { proposal, already_invited: false },
        InviteOutcome::AlreadyInvited(proposal) => {
            InviteResponse { proposal, already_invited: true }
        }
    };
    Ok(Json(response))
}

async fn submit_bid(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<BidRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let proposal =
        state.lifecycle.bid(&actor, QuotationId(id), request.price, request.message).await?;
    Ok(Json(proposal))
}

async fn accept_proposal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, proposal_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let quotation =
        state.lifecycle.accept(&actor, QuotationId(id), ProposalId(proposal_id)).await?;
    Ok(Json(quotation))
}

async fn update_quotation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<UpdateQuotationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_actor(&state, &headers).await?;

    let status = match request.status.as_deref() {
        Some(raw) => Some(QuotationStatus::parse(raw).ok_or_else(|| {
            EngineError::validation(format!("unknown quotation status `{raw}`"))
        })?),
        None => None,
    };
    let patch = QuotationPatch { status, selected_proposal_id: request.selected_proposal_id };

    let quotation = state.lifecycle.admin_update(&actor, QuotationId(id), patch).await?;
    Ok(Json(quotation))
}

async fn delete_quotation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    state.lifecycle.delete(&actor, QuotationId(id)).await?;
    Ok(Json(StatusResponse { success: true }))
}

// ---------------------------------------------------------------------------
// Order handlers
// ---------------------------------------------------------------------------

async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Guests may order; a presented credential must still be valid.
    let _ = resolve_actor(&state, &headers).await?;

    let draft = OrderDraft {
        customer_name: request.customer_name,
        email: request.email,
        phone: request.phone,
        shipping_address: request.shipping_address,
        payment_method: request.payment_method,
        items: request
            .items
            .into_iter()
            .map(|item| OrderItemDraft {
                product_id: ProductId(item.product_id),
                quantity: item.quantity,
                price: item.price,
                color: item.color,
                size: item.size,
            })
            .collect(),
    };

    let order = state.orders.create_order(draft).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let orders = state.orders.list_orders(&actor, query.offset, query.limit).await?;
    Ok(Json(orders))
}

async fn read_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let detail = state.orders.order_detail(&actor, OrderId(id)).await?;
    Ok(Json(detail))
}

async fn update_order_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let status = OrderStatus::parse(&request.status).ok_or_else(|| {
        EngineError::validation(format!("unknown order status `{}`", request.status))
    })?;

    state.orders.update_status(&actor, OrderId(id), status).await?;
    Ok(Json(StatusResponse { success: true }))
}

async fn delete_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    state.orders.delete_order(&actor, OrderId(id)).await?;
    Ok(Json(StatusResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use souk_core::domain::actor::{AccountId, Actor};
    use souk_core::domain::freelancer::{Freelancer, FreelancerId};
    use souk_core::domain::product::{Product, ProductId, Service, ServiceId};
    use souk_core::domain::settings::SettingsSnapshot;
    use souk_db::repositories::{
        InMemoryCatalog, InMemoryOrderRepository, InMemoryQuotationRepository,
        StaticIdentityProvider,
    };
    use souk_engine::{LifecycleManager, LifecyclePolicies, OrderEngine};
    use souk_notify::RecordingDispatcher;

    use super::{router, AppState};

    async fn test_router() -> Router {
        let catalog = Arc::new(InMemoryCatalog::default());
        catalog.put_service(Service { id: ServiceId(1), name: "Painting".to_string() }).await;
        catalog
            .put_freelancer(Freelancer {
                id: FreelancerId(1),
                name: "Hedi Trabelsi".to_string(),
                email: "hedi@souk.test".to_string(),
            })
            .await;
        catalog
            .put_product(Product {
                id: ProductId(1),
                name: "Ceramic table lamp".to_string(),
                price: rust_decimal::Decimal::new(5000, 2),
                stock_quantity: 25,
            })
            .await;
        catalog
            .set_settings(SettingsSnapshot {
                shipping_cost: rust_decimal::Decimal::new(800, 2),
                free_shipping_threshold: rust_decimal::Decimal::from(100),
                tax_rate: rust_decimal::Decimal::from(10),
            })
            .await;

        let lifecycle = Arc::new(LifecycleManager::new(
            Arc::new(InMemoryQuotationRepository::default()),
            Arc::clone(&catalog) as Arc<dyn souk_db::repositories::ServiceRepository>,
            Arc::clone(&catalog) as Arc<dyn souk_db::repositories::FreelancerRepository>,
            LifecyclePolicies::default(),
        ));
        let orders = Arc::new(OrderEngine::new(
            Arc::new(InMemoryOrderRepository::new(Arc::clone(&catalog))),
            Arc::clone(&catalog) as Arc<dyn souk_db::repositories::ProductRepository>,
            Arc::clone(&catalog) as Arc<dyn souk_db::repositories::SettingsRepository>,
            Arc::new(RecordingDispatcher::default()),
        ));
        let identity = Arc::new(
            StaticIdentityProvider::default()
                .with_actor("admin-token", Actor::admin(AccountId(1), "admin@souk.test"))
                .with_actor("client-token", Actor::client(AccountId(2), "client@souk.test"))
                .with_actor(
                    "freelancer-token",
                    Actor::freelancer(AccountId(3), "hedi@souk.test", Some(FreelancerId(1))),
                ),
        );

        router(AppState { lifecycle, orders, identity })
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn quotation_body() -> Value {
        json!({
            "service_id": 1,
            "first_name": "Mouna",
            "last_name": "Jaziri",
            "email": "client@souk.test",
            "phone": "+216 22 333 444",
            "address": "7 rue Ibn Khaldoun",
            "city": "Sousse",
            "description": "Repaint two bedrooms"
        })
    }

    #[tokio::test]
    async fn guest_can_create_a_quotation_and_gets_201() {
        let app = test_router().await;
        let response = app
            .oneshot(request("POST", "/api/quotations", None, Some(quotation_body())))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["status"], "PENDING");
    }

    #[tokio::test]
    async fn listing_requires_authentication() {
        let app = test_router().await;
        let response = app
            .oneshot(request("GET", "/api/quotations", None, None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_bearer_token_is_unauthorized() {
        let app = test_router().await;
        let response = app
            .oneshot(request("GET", "/api/quotations", Some("bogus"), None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invite_bid_accept_through_the_http_surface() {
        let app = test_router().await;

        let created = app
            .clone()
            .oneshot(request("POST", "/api/quotations", Some("client-token"), Some(quotation_body())))
            .await
            .expect("create");
        assert_eq!(created.status(), StatusCode::CREATED);
        let quotation = json_body(created).await;
        let id = quotation["id"].as_i64().expect("id");

        let invited = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/quotations/{id}/invite"),
                Some("admin-token"),
                Some(json!({ "freelancer_id": 1 })),
            ))
            .await
            .expect("invite");
        assert_eq!(invited.status(), StatusCode::OK);
        let invite = json_body(invited).await;
        assert_eq!(invite["already_invited"], false);
        let proposal_id = invite["proposal"]["id"].as_i64().expect("proposal id");

        let bid = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/quotations/{id}/bid"),
                Some("freelancer-token"),
                Some(json!({ "price": "120.0", "message": "Can start Monday" })),
            ))
            .await
            .expect("bid");
        assert_eq!(bid.status(), StatusCode::OK);
        let proposal = json_body(bid).await;
        assert_eq!(proposal["status"], "SUBMITTED");

        let accepted = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/quotations/{id}/accept/{proposal_id}"),
                Some("admin-token"),
                None,
            ))
            .await
            .expect("accept");
        assert_eq!(accepted.status(), StatusCode::OK);
        let quotation = json_body(accepted).await;
        assert_eq!(quotation["status"], "ASSIGNED");
    }

    #[tokio::test]
    async fn non_admin_invite_is_forbidden() {
        let app = test_router().await;
        let created = app
            .clone()
            .oneshot(request("POST", "/api/quotations", None, Some(quotation_body())))
            .await
            .expect("create");
        let id = json_body(created).await["id"].as_i64().expect("id");

        let response = app
            .oneshot(request(
                "POST",
                &format!("/api/quotations/{id}/invite"),
                Some("client-token"),
                Some(json!({ "freelancer_id": 1 })),
            ))
            .await
            .expect("invite");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unknown_service_maps_to_404() {
        let app = test_router().await;
        let mut body = quotation_body();
        body["service_id"] = json!(99);

        let response = app
            .oneshot(request("POST", "/api/quotations", None, Some(body)))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"], "service not found");
    }

    #[tokio::test]
    async fn order_creation_is_open_to_guests_and_prices_the_cart() {
        let app = test_router().await;
        let response = app
            .oneshot(request(
                "POST",
                "/api/orders",
                None,
                Some(json!({
                    "customer_name": "Mouna Jaziri",
                    "email": "client@souk.test",
                    "phone": "+216 22 333 444",
                    "shipping_address": "7 rue Ibn Khaldoun, Sousse",
                    "payment_method": "cash_on_delivery",
                    "items": [
                        { "product_id": 1, "quantity": 2, "price": "50.00" }
                    ]
                })),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::CREATED);
        let order = json_body(response).await;
        assert_eq!(order["total_amount"], "110.00");
        assert_eq!(order["items"][0]["name"], "Ceramic table lamp");
    }

    #[tokio::test]
    async fn empty_order_maps_to_400() {
        let app = test_router().await;
        let response = app
            .oneshot(request(
                "POST",
                "/api/orders",
                None,
                Some(json!({
                    "customer_name": "Mouna Jaziri",
                    "email": "client@souk.test",
                    "phone": "+216 22 333 444",
                    "shipping_address": "7 rue Ibn Khaldoun, Sousse",
                    "payment_method": "cash_on_delivery",
                    "items": []
                })),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_order_maps_to_409_insufficient_stock() {
        let app = test_router().await;
        let response = app
            .oneshot(request(
                "POST",
                "/api/orders",
                None,
                Some(json!({
                    "customer_name": "Mouna Jaziri",
                    "email": "client@souk.test",
                    "phone": "+216 22 333 444",
                    "shipping_address": "7 rue Ibn Khaldoun, Sousse",
                    "payment_method": "cash_on_delivery",
                    "items": [
                        { "product_id": 1, "quantity": 30, "price": "50.00" }
                    ]
                })),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert_eq!(body["error"], "insufficient stock for one of the items");
    }

    #[tokio::test]
    async fn foreign_order_read_is_forbidden() {
        let app = test_router().await;
        let created = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/orders",
                None,
                Some(json!({
                    "customer_name": "Someone Else",
                    "email": "someone-else@souk.test",
                    "phone": "+216 22 000 000",
                    "shipping_address": "elsewhere",
                    "payment_method": "cash_on_delivery",
                    "items": [
                        { "product_id": 1, "quantity": 1, "price": "50.00" }
                    ]
                })),
            ))
            .await
            .expect("create");
        let id = json_body(created).await["id"].as_i64().expect("id");

        let denied = app
            .clone()
            .oneshot(request("GET", &format!("/api/orders/{id}"), Some("client-token"), None))
            .await
            .expect("read");
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);

        let allowed = app
            .oneshot(request("GET", &format!("/api/orders/{id}"), Some("admin-token"), None))
            .await
            .expect("read");
        assert_eq!(allowed.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bad_order_status_maps_to_400() {
        let app = test_router().await;
        let response = app
            .oneshot(request(
                "PUT",
                "/api/orders/1/status",
                Some("admin-token"),
                Some(json!({ "status": "REFUNDED" })),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
