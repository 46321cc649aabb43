use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use contact_server_domain::{ServiceError, app::AppState};
use log::{debug, error, info};

mod contacts;

fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/contacts", get(contacts::get_all).post(contacts::create))
        .route("/contacts/search", get(contacts::search))
        .route(
            "/contacts/{id}",
            put(contacts::update).delete(contacts::delete),
        )
}

/// Builds the HTTP surface. Every route is served both at the root and
/// under the `/v1` prefix.
pub fn router(app: AppState) -> Router {
    let router: Router<AppState> = Router::new()
        .merge(contact_routes())
        .nest("/v1", contact_routes());
    router.with_state(app)
}

pub async fn run(
    app: AppState,
    addr: SocketAddr,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("API server listening on {}", listener.local_addr()?);
    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("HTTP API shut down gracefully");
    Ok(())
}

async fn root() -> Json<JsonMessage> {
    Json(JsonMessage {
        message: "Hello World".to_string(),
    })
}

#[derive(serde::Serialize, Debug)]
pub struct JsonMessage {
    message: String,
}

pub struct ApiError(ServiceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, msg) = match self.0 {
            ServiceError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ServiceError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ServiceError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        let body = serde_json::json!({ "error": msg });
        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        ApiError(value)
    }
}

fn rejected(what: &str, body_text: String) -> ApiError {
    debug!("Rejected {}: {}", what, body_text);
    ApiError(ServiceError::BadRequest(body_text))
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        rejected("request body", rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        rejected("path", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        rejected("query string", rejection.body_text())
    }
}
