//! Identity Extractor
//!
//! Custom extractor for pulling the gateway identity in handlers

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::AppError;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::security_log;

/// Gateway Identity Extractor
///
/// Handlers behind [`require_identity`](crate::auth::require_identity)
/// get the cached extension; the header fallback keeps the extractor
/// usable in router slices that skip the middleware (tests).
impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        // Check if already extracted (from middleware)
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        match CurrentUser::from_headers(&parts.headers) {
            Ok(user) => {
                // Store in extensions for potential reuse
                parts.extensions.insert(user.clone());
                Ok(user)
            }
            Err(reason) => {
                security_log!(
                    "WARN",
                    "identity_rejected",
                    reason = reason,
                    uri = format!("{:?}", parts.uri)
                );
                Err(AppError::unauthorized())
            }
        }
    }
}
