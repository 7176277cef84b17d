use actix_web::http::StatusCode;
use actix_web::{error, web, HttpRequest, HttpResponse, Result as ActixResult};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use aetherquery_core::config::Config;
use aetherquery_core::error::ErrorCode;
use aetherquery_core::models::{BatchRequest, ErrorEnvelope, HealthResponse, QueryRequest};

use crate::mock::MockExecutor;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Shared application state
pub struct AppState {
    pub config: Arc<Config>,
    pub executor: MockExecutor,
    pub started_at: DateTime<Utc>,
    pub query_count: AtomicU64,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            executor: MockExecutor::new(config.simulated_latency()),
            config: Arc::new(config),
            started_at: Utc::now(),
            query_count: AtomicU64::new(0),
        }
    }
}

fn error_response(code: ErrorCode, message: impl Into<String>) -> HttpResponse {
    let status = match code {
        ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    HttpResponse::build(status).json(ErrorEnvelope::new(code, message))
}

/// Execute a query
/// POST /query
#[tracing::instrument(skip(req, state), fields(request_id))]
pub async fn execute_query(
    req: web::Json<QueryRequest>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let request_id = Uuid::new_v4().to_string();
    tracing::Span::current().record("request_id", request_id.as_str());

    if req.query.trim().is_empty() {
        return Ok(error_response(ErrorCode::ValidationError, "query is required"));
    }

    state.query_count.fetch_add(1, Ordering::Relaxed);
    let response = state.executor.execute(&req).await;
    tracing::debug!(success = response.success, "Query executed");

    Ok(HttpResponse::Ok()
        .insert_header((REQUEST_ID_HEADER, request_id))
        .json(response))
}

/// Execute several queries
/// POST /batch
#[tracing::instrument(skip(req, state), fields(count = req.queries.len()))]
pub async fn execute_batch(
    req: web::Json<BatchRequest>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    if req.queries.is_empty() {
        return Ok(error_response(
            ErrorCode::ValidationError,
            "at least one query is required",
        ));
    }
    if let Some(index) = req.queries.iter().position(|q| q.query.trim().is_empty()) {
        return Ok(error_response(
            ErrorCode::ValidationError,
            format!("query {} is empty", index),
        ));
    }

    state
        .query_count
        .fetch_add(req.queries.len() as u64, Ordering::Relaxed);
    let response = state.executor.execute_batch(&req).await;

    Ok(HttpResponse::Ok()
        .insert_header((REQUEST_ID_HEADER, Uuid::new_v4().to_string()))
        .json(response))
}

/// Health check
/// GET /health
pub async fn health(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: Some(state.config.version.clone()),
        database: Some(state.config.database.clone()),
    }))
}

/// Server description
/// GET /info
pub async fn info(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let uptime = Utc::now() - state.started_at;
    Ok(HttpResponse::Ok().json(json!({
        "name": "AetherQuery Mock Server",
        "version": state.config.version,
        "database": state.config.database,
        "endpoints": [
            {"method": "POST", "path": "/query", "description": "Execute a query"},
            {"method": "POST", "path": "/batch", "description": "Execute a batch of queries"},
            {"method": "GET", "path": "/health", "description": "Health check"},
            {"method": "GET", "path": "/info", "description": "Server information"},
        ],
        "supported_clients": state.config.supported_clients,
        "started_at": state.started_at,
        "uptime_seconds": uptime.num_seconds(),
        "query_count": state.query_count.load(Ordering::Relaxed),
    })))
}

pub async fn not_found(req: HttpRequest) -> HttpResponse {
    error_response(
        ErrorCode::NotFound,
        format!("no route for {} {}", req.method(), req.path()),
    )
}

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = error_response(
        ErrorCode::BadRequest,
        format!("invalid request body: {}", err),
    );
    error::InternalError::from_response(err, response).into()
}

/// Configure API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .route("/query", web::post().to(execute_query))
        .route("/batch", web::post().to(execute_batch))
        .route("/health", web::get().to(health))
        .route("/info", web::get().to(info))
        .default_service(web::to(not_found));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use aetherquery_core::models::{BatchResponse, QueryResponse};
    use serde_json::Value;

    fn app_state() -> web::Data<AppState> {
        web::Data::new(AppState::new(Config::default()))
    }

    #[actix_web::test]
    async fn test_query_endpoint() {
        let state = app_state();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/query")
            .set_json(json!({"query": "SELECT 1"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key(REQUEST_ID_HEADER));

        let body: QueryResponse = test::read_body_json(resp).await;
        assert!(body.success);
        assert_eq!(body.query, "SELECT 1");
        assert_eq!(body.first_value(), Some(&json!(1)));
        assert_eq!(state.query_count.load(Ordering::Relaxed), 1);
    }

    #[actix_web::test]
    async fn test_empty_query_is_validation_error() {
        let app = test::init_service(App::new().app_data(app_state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/query")
            .set_json(json!({"query": "   "}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: ErrorEnvelope = test::read_body_json(resp).await;
        assert_eq!(body.error.code, ErrorCode::ValidationError);
    }

    #[actix_web::test]
    async fn test_malformed_json_is_bad_request() {
        let app = test::init_service(App::new().app_data(app_state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/query")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorEnvelope = test::read_body_json(resp).await;
        assert_eq!(body.error.code, ErrorCode::BadRequest);
    }

    #[actix_web::test]
    async fn test_unknown_route() {
        let app = test::init_service(App::new().app_data(app_state()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/tables").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: ErrorEnvelope = test::read_body_json(resp).await;
        assert_eq!(body.error.code, ErrorCode::NotFound);
        assert!(body.error.message.contains("/tables"));
    }

    #[actix_web::test]
    async fn test_batch_endpoint() {
        let state = app_state();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/batch")
            .set_json(json!({
                "queries": [{"query": "SELECT 1"}, {"query": "SELECT * FROM products"}],
                "transaction": false
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: BatchResponse = test::read_body_json(resp).await;
        assert!(body.success);
        assert_eq!(body.results.len(), 2);
        assert_eq!(state.query_count.load(Ordering::Relaxed), 2);
    }

    #[actix_web::test]
    async fn test_empty_batch_rejected() {
        let app = test::init_service(App::new().app_data(app_state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/batch")
            .set_json(json!({"queries": []}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn test_health_and_info() {
        let app = test::init_service(App::new().app_data(app_state()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let health: HealthResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.version.as_deref(), Some("1.0.0"));
        assert!(!health.timestamp.is_empty());

        let req = test::TestRequest::get().uri("/info").to_request();
        let info: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(info["endpoints"].as_array().map(Vec::len), Some(4));
        assert!(info["supported_clients"]
            .as_array()
            .unwrap()
            .contains(&json!("rust")));
        assert_eq!(info["query_count"], json!(0));
    }
}
