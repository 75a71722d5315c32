use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};

use crate::{
    auth::error::AuthError,
    error::AppError,
    state::AppState,
};

/// A middleware that requires a valid bearer token.
///
/// On success the `ValidatedToken` is inserted into the request extensions for
/// the guards and handlers behind it.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// A `Response`, or an `AppError` rendered as 401.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    tracing::debug!("🔐 Checking bearer token...");

    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| {
            tracing::warn!("❌ No Authorization header found");
            AppError::Unauthenticated
        })?
        .to_str()
        .map_err(|_| AppError::Authentication(AuthError::MalformedHeader))?;

    let token = state.token_validator.validate_header(header_value).await?;

    tracing::debug!("✅ Token accepted for subject: {}", token.subject);
    request.extensions_mut().insert(token);

    Ok(next.run(request).await)
}
