use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::context::AppContext;

/// GET / - service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Portal TI API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "auth": "/token, /register (public)",
                "me": "/me, /me/password, /me/avatar",
                "users": "/users[/:id], /users/profiles (admin)",
                "history": "/historico, /logs (admin)",
                "dashboard": "/dashboard, /dashboard/stats",
                "telephony": "/telefonia[/:id], /telefonia/upload/tim, /telefonia/upload/inventario",
                "contracts": "/contratos[/:id]",
                "invoices": "/faturas[/:id]",
                "credentials": "/credenciais[/:id]",
                "permissions": "/permissions",
                "files": "/uploads/*"
            }
        }
    }))
}

/// GET /health - storage round trip
pub async fn health(State(ctx): State<AppContext>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match ctx.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "storage": ctx.store.backend()
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "storage unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "storage": ctx.store.backend()
                    }
                })),
            )
        }
    }
}
