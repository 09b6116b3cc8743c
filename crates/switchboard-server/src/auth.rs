use std::sync::Arc;

use axum::extract::{Query, Request};
use axum::middleware::Next;
use axum::response::Response;
use serde::Deserialize;
use switchboard_auth::{AuthError, IdentityResolver};
use switchboard_core::error_response;

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Require a valid bearer token and attach the resolved user
///
/// The token comes from `Authorization: Bearer`, or from the `token`
/// query parameter for clients that cannot set headers on a WebSocket
/// upgrade.
pub async fn auth_middleware(resolver: Arc<dyn IdentityResolver>, mut request: Request, next: Next) -> Response {
    let token = match extract_token(&request) {
        Ok(token) => token,
        Err(e) => return error_response(&e),
    };

    match resolver.resolve(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "authentication failed");
            error_response(&e)
        }
    }
}

fn extract_token(request: &Request) -> Result<String, AuthError> {
    if let Some(header) = request.headers().get(http::header::AUTHORIZATION) {
        let token = header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MalformedToken)?;

        return Ok(token.to_owned());
    }

    Query::<TokenQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(query)| query.token)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}
