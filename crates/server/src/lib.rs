pub mod config;
pub mod error;
pub mod roster;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Autodial API",
        version = "0.1.0",
        description = "Sequential auto-dialer over a single telephony line"
    ),
    paths(
        routes::health_check,
        routes::connect,
        routes::disconnect,
        routes::get_settings,
        routes::update_settings,
        routes::list_customers,
        routes::upload_customers,
        routes::list_call_history,
        routes::call_stats,
        routes::recent_calls,
        routes::get_call,
        routes::start_autodial,
        routes::stop_autodial,
        routes::get_status,
        routes::sse::events_stream,
    ),
    components(schemas(
        routes::HealthResponse,
        routes::ConnectionResponse,
        routes::SettingsResponse,
        routes::CustomersResponse,
        routes::UploadCustomersRequest,
        routes::UploadCustomersResponse,
        routes::StartAutodialRequest,
        routes::StartAutodialResponse,
        routes::StopAutodialResponse,
        error::ErrorResponse,
        autodial_core::Customer,
        autodial_core::CallRecord,
        autodial_core::CallStatus,
        telephony::SipConfig,
        dialer::SettingsUpdate,
        dialer::CallStats,
        dialer::DialStatus,
        dialer::RunState,
        dialer::RunProgress,
    )),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "telephony", description = "SIP line connection"),
        (name = "settings", description = "Dial settings"),
        (name = "customers", description = "Customer roster"),
        (name = "calls", description = "Call history and statistics"),
        (name = "autodial", description = "Auto-dial control and status"),
        (name = "events", description = "Real-time event streaming (SSE)"),
    )
)]
pub struct ApiDoc;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", ApiDoc::openapi()))
        .route("/health", get(routes::health_check))
        .route("/api/connect", post(routes::connect))
        .route("/api/disconnect", post(routes::disconnect))
        .route(
            "/api/settings",
            get(routes::get_settings).post(routes::update_settings),
        )
        .route(
            "/api/customers",
            get(routes::list_customers).post(routes::upload_customers),
        )
        .route("/api/call-history", get(routes::list_call_history))
        .route("/api/call-history/stats", get(routes::call_stats))
        .route("/api/call-history/recent", get(routes::recent_calls))
        .route("/api/call-history/{id}", get(routes::get_call))
        .route("/api/start-autodial", post(routes::start_autodial))
        .route("/api/stop-autodial", post(routes::stop_autodial))
        .route("/api/status", get(routes::get_status))
        .route("/api/events", get(routes::sse::events_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
