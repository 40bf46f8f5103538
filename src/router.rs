use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::SecurityConfig;
use crate::context::AppContext;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;

/// Full HTTP surface: public routes, JWT-protected routes and the `/uploads` file tree.
pub fn app(ctx: AppContext) -> Router {
    let body_limit = ctx.config.server.max_request_size_bytes;
    let cors = cors_layer(&ctx.config.security);
    let uploads = ServeDir::new(ctx.files.root());

    Router::new()
        // Public
        .route("/", get(public::system::root))
        .route("/health", get(public::system::health))
        .route("/token", post(public::auth::token))
        .route("/register", post(public::auth::register))
        // Protected
        .merge(protected_routes(ctx.clone()))
        .nest_service("/uploads", uploads)
        // Global middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(ctx)
}

fn protected_routes(ctx: AppContext) -> Router<AppContext> {
    use protected::{contracts, credentials, dashboard, history, invoices, me, telephony, users};

    Router::new()
        .route("/me", get(me::profile))
        .route("/me/password", put(me::change_password))
        .route("/me/avatar", post(me::upload_avatar))
        .route("/users", get(users::list).post(users::create))
        .route("/users/profiles", get(users::profiles))
        .route("/users/:id", axum::routing::delete(users::delete))
        .route("/users/:id/role", put(users::update_role))
        .route("/logs", get(history::logs))
        .route("/historico", get(history::history))
        .route("/permissions", get(history::permissions))
        .route("/dashboard", get(dashboard::summary))
        .route("/dashboard/stats", get(dashboard::stats))
        .route("/credenciais", get(credentials::list).post(credentials::create))
        .route("/credenciais/:id", put(credentials::update).delete(credentials::delete))
        .route("/telefonia", get(telephony::list).post(telephony::create))
        .route("/telefonia/:id", put(telephony::update).delete(telephony::delete))
        .route("/telefonia/upload/tim", post(telephony::upload_carrier))
        .route("/telefonia/upload/inventario", post(telephony::upload_inventory))
        .route("/contratos", get(contracts::list).post(contracts::create))
        .route("/contratos/:id", put(contracts::update).delete(contracts::delete))
        .route("/contratos/:id/inativar", put(contracts::deactivate))
        .route("/contratos/:id/ativar", put(contracts::activate))
        .route("/faturas", get(invoices::list).post(invoices::create))
        .route("/faturas/:id", put(invoices::update))
        .route("/faturas/:id/status", put(invoices::update_status))
        .route("/faturas/:id/inativar", put(invoices::deactivate))
        .route("/faturas/:id/ativar", put(invoices::activate))
        .route_layer(from_fn_with_state(ctx, jwt_auth_middleware))
}

/// Permissive when no origin (or `*`) is configured, otherwise an allow-list.
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
