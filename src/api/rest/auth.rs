use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthUser, issue_token};
use crate::error::AppError;
use crate::models::user::{UserAccount, UserRole};
use crate::models::wallet::Wallet;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub role: UserRole,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub token: String,
    pub user: UserAccount,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if payload.role == UserRole::Admin {
        return Err(AppError::BadRequest(
            "admin accounts cannot be self-registered".to_string(),
        ));
    }

    let user = UserAccount::new(payload.name, payload.role);

    // Earning roles get their wallet up front so a first credit can never
    // race wallet creation.
    if user.role.requires_validation() {
        state.store.wallets.insert(user.id, Wallet::new(user.id));
    }

    let token = issue_token();
    state.store.sessions.insert(token.clone(), user.id);
    state.store.users.insert(user.id, user.clone());

    tracing::info!(user_id = %user.id, role = ?user.role, "user registered");
    Ok(Json(RegisterResponse { token, user }))
}

async fn me(auth: AuthUser) -> Json<UserAccount> {
    Json(auth.account)
}
