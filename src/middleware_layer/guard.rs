//! Per-route scope and permission checks.
//!
//! Guards run after [`require_auth`](super::auth::require_auth) and only read
//! the `ValidatedToken` it left in the request extensions. A failed check
//! answers immediately; the wrapped handler is never called.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};

use crate::{auth::token::ValidatedToken, error::AppError};

/// Checks that the token carries `scope` in its space-delimited scope claim.
///
/// # Arguments
///
/// * `token` - The token attached by the authentication middleware, if any.
/// * `scope` - The required scope.
///
/// # Returns
///
/// `Unauthenticated` without a token, `Forbidden` without the scope.
pub fn check_scope(token: Option<&ValidatedToken>, scope: &str) -> Result<(), AppError> {
    let token = token.ok_or(AppError::Unauthenticated)?;

    if !token.has_scope(scope) {
        return Err(AppError::Forbidden {
            message: format!("Missing required scope: {scope}"),
            available: None,
            scope: None,
        });
    }

    Ok(())
}

/// Checks that the token lists `permission`.
///
/// The failure carries the caller's permissions and scope string.
pub fn check_permission(token: Option<&ValidatedToken>, permission: &str) -> Result<(), AppError> {
    let token = token.ok_or(AppError::Unauthenticated)?;

    if !token.has_permission(permission) {
        return Err(AppError::Forbidden {
            message: format!("Insufficient permissions. Required: {permission}"),
            available: Some(token.claims.permissions.clone()),
            scope: Some(token.claims.scope.clone()),
        });
    }

    Ok(())
}

/// What a guarded route demands of the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Scope(String),
    Permission(String),
}

impl Requirement {
    /// Runs the matching pure check.
    pub fn check(&self, token: Option<&ValidatedToken>) -> Result<(), AppError> {
        match self {
            Requirement::Scope(scope) => check_scope(token, scope),
            Requirement::Permission(permission) => check_permission(token, permission),
        }
    }
}

/// Builds a guard requiring `scope`.
pub fn require_scope(scope: impl Into<String>) -> GuardLayer {
    GuardLayer::new(Requirement::Scope(scope.into()))
}

/// Builds a guard requiring `permission`.
pub fn require_permission(permission: impl Into<String>) -> GuardLayer {
    GuardLayer::new(Requirement::Permission(permission.into()))
}

/// Tower layer applying a [`Requirement`] to every wrapped route.
#[derive(Debug, Clone)]
pub struct GuardLayer {
    requirement: Arc<Requirement>,
}

impl GuardLayer {
    pub fn new(requirement: Requirement) -> Self {
        Self {
            requirement: Arc::new(requirement),
        }
    }
}

impl<S> Layer<S> for GuardLayer {
    type Service = Guard<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Guard {
            inner,
            requirement: Arc::clone(&self.requirement),
        }
    }
}

/// Tower service produced by [`GuardLayer`].
#[derive(Debug, Clone)]
pub struct Guard<S> {
    inner: S,
    requirement: Arc<Requirement>,
}

impl<S> Service<Request> for Guard<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let outcome = self
            .requirement
            .check(request.extensions().get::<ValidatedToken>());

        match outcome {
            Ok(()) => Box::pin(self.inner.call(request)),
            Err(e) => {
                tracing::debug!(
                    "🚫 {} {} rejected by {:?}",
                    request.method(),
                    request.uri().path(),
                    self.requirement
                );
                Box::pin(async move { Ok(e.into_response()) })
            }
        }
    }
}
