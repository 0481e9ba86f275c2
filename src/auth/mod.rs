use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user::{UserAccount, UserRole};
use crate::state::AppState;
use crate::store::Store;

/// The authenticated caller, resolved from the bearer session token. Role
/// checks happen per endpoint, after extraction.
pub struct AuthUser {
    pub account: UserAccount,
}

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.account.id
    }

    pub fn require_role(&self, role: UserRole) -> Result<(), AppError> {
        if self.account.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "endpoint requires role {role:?}"
            )))
        }
    }

    pub fn require_any(&self, roles: &[UserRole]) -> Result<(), AppError> {
        if roles.contains(&self.account.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "endpoint requires one of {roles:?}"
            )))
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized)?;

        let account = state
            .store
            .user_for_token(token)
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser { account })
    }
}

pub fn issue_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Seeds the admin account whose token comes from configuration. There is no
/// self-registration path for admins.
pub fn bootstrap_admin(store: &Store, token: &str) -> Uuid {
    let admin = UserAccount::new("admin".to_string(), UserRole::Admin);
    let admin_id = admin.id;
    store.users.insert(admin_id, admin);
    store.sessions.insert(token.to_string(), admin_id);
    admin_id
}
