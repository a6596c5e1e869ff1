//! API key authentication and role checks
//!
//! Keys come from the `security` config section and are fixed for the
//! lifetime of the process. Roles are ordered `readonly < operator < admin`.

use crate::config::SecurityConfig;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Caller role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Config, warning history, slippage checks
    Readonly,
    /// Transaction validation
    Operator,
    /// Config changes, emergency stop, history reset
    Admin,
}

impl Role {
    pub fn has_permission(&self, required: Role) -> bool {
        *self >= required
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Readonly => write!(f, "readonly"),
            Role::Operator => write!(f, "operator"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "readonly" => Ok(Role::Readonly),
            "operator" => Ok(Role::Operator),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Authenticated caller, stored as a request extension
#[derive(Debug, Clone)]
pub struct Caller {
    /// Masked key prefix, safe to log
    pub key_hint: String,
    pub role: Role,
}

/// Key table shared by the auth middleware
#[derive(Clone, Default)]
pub struct AuthState {
    keys: Arc<HashMap<String, Role>>,
    /// Requests without an Authorization header get readonly access
    pub allow_anonymous_readonly: bool,
}

impl AuthState {
    pub fn with_api_keys(keys: HashMap<String, Role>) -> Self {
        Self {
            keys: Arc::new(keys),
            allow_anonymous_readonly: false,
        }
    }

    /// Build from the security section; keys with unknown roles are skipped
    pub fn from_config(security: &SecurityConfig) -> Self {
        let mut keys = HashMap::new();
        for entry in &security.api_keys {
            match entry.role.parse::<Role>() {
                Ok(role) => {
                    keys.insert(entry.key.clone(), role);
                }
                Err(e) => tracing::warn!(error = %e, "Skipping API key with unknown role"),
            }
        }

        Self {
            keys: Arc::new(keys),
            allow_anonymous_readonly: security.allow_anonymous_readonly,
        }
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Resolve a bearer token to a caller
    pub fn authenticate(&self, token: &str) -> Option<Caller> {
        self.keys.get(token).map(|role| Caller {
            key_hint: mask_token(token),
            role: *role,
        })
    }
}

fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{}...", prefix)
}

/// Resolve the Authorization header into a `Caller` extension
pub async fn bearer_auth(
    State(state): State<Arc<AuthState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let header = match headers.get(AUTHORIZATION) {
        None if state.allow_anonymous_readonly => {
            request.extensions_mut().insert(Caller {
                key_hint: "anonymous".to_string(),
                role: Role::Readonly,
            });
            return next.run(request).await;
        }
        None => return auth_error(StatusCode::UNAUTHORIZED, "Missing Authorization header"),
        Some(value) => value.to_str().unwrap_or_default(),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() => token,
        _ => {
            return auth_error(
                StatusCode::BAD_REQUEST,
                "Authorization header must be 'Bearer <key>'",
            )
        }
    };

    match state.authenticate(token) {
        Some(caller) => {
            tracing::debug!(key = %caller.key_hint, role = %caller.role, "Caller authenticated");
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        None => {
            tracing::warn!(key = %mask_token(token), "Rejected unknown API key");
            auth_error(StatusCode::UNAUTHORIZED, "Unknown API key")
        }
    }
}

/// Reject callers below the role given as layer state
///
/// Layer after `bearer_auth`.
pub async fn require_role(State(required): State<Role>, request: Request, next: Next) -> Response {
    let Some(caller) = request.extensions().get::<Caller>() else {
        return auth_error(StatusCode::UNAUTHORIZED, "Authentication required");
    };

    if !caller.role.has_permission(required) {
        tracing::warn!(
            key = %caller.key_hint,
            role = %caller.role,
            required = %required,
            "Insufficient role"
        );
        return auth_error(
            StatusCode::FORBIDDEN,
            &format!("Requires {} role or higher", required),
        );
    }

    next.run(request).await
}

fn auth_error(status: StatusCode, message: &str) -> Response {
    let reason = if status == StatusCode::FORBIDDEN {
        "authorization_failed"
    } else {
        "authentication_failed"
    };
    let body = json!({
        "status": "rejected",
        "reason": reason,
        "details": message
    });

    (status, Json(body)).into_response()
}
