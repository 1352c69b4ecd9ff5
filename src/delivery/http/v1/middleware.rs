use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::domain::user::Role;
use crate::usecase::access::Actor;
use crate::usecase::jwt::{JwtService, TokenType};
use crate::AppState;

#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

fn bearer_token(header: Option<&str>) -> Option<&str> {
    header.and_then(|h| h.strip_prefix("Bearer ")).filter(|t| !t.is_empty())
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let authenticated_user = authenticate(&state.jwt_service, auth_header)?;

    tracing::debug!(
        user_id = %authenticated_user.user_id,
        email = %authenticated_user.email,
        role = %authenticated_user.role,
        "user authenticated successfully"
    );
    request.extensions_mut().insert(authenticated_user);

    Ok(next.run(request).await)
}

fn authenticate(
    jwt_service: &JwtService,
    auth_header: Option<&str>,
) -> Result<AuthenticatedUser, (StatusCode, String)> {
    let Some(token) = bearer_token(auth_header) else {
        tracing::warn!("missing or invalid authorization header");
        return Err((
            StatusCode::UNAUTHORIZED,
            "Missing or invalid Authorization header".to_string(),
        ));
    };

    let claims = match jwt_service.validate_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(?e, "invalid token");
            return Err((StatusCode::UNAUTHORIZED, format!("Invalid token: {}", e)));
        }
    };

    // Refresh tokens are not accepted here
    if claims.token_type != TokenType::Access {
        tracing::warn!("attempted to use non-access token for authentication");
        return Err((StatusCode::UNAUTHORIZED, "Invalid token type".to_string()));
    }

    let user_id = Uuid::parse_str(&claims.sub).map_err(|e| {
        tracing::warn!(?e, "failed to parse user_id from token");
        (StatusCode::UNAUTHORIZED, "Invalid user ID in token".to_string())
    })?;

    Ok(AuthenticatedUser {
        user_id,
        email: claims.email,
        role: claims.role,
    })
}
