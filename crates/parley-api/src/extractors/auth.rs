//! `AuthUser` extractor: verifies the identity cookie and injects the
//! caller's session.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use parley_realtime::SessionContext;

use crate::error::ApiError;
use crate::state::AppState;

/// Extracted authenticated caller available in handlers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub SessionContext);

impl std::ops::Deref for AuthUser {
    type Target = SessionContext;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = state.realtime.authenticator.authenticate(&parts.headers)?;
        Ok(AuthUser(session))
    }
}
