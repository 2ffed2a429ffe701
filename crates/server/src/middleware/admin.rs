//! Admin gate for the `/admin` API.

use axum::{extract::FromRequestParts, http::request::Parts};
use secrecy::ExposeSecret;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the shared admin secret.
pub const ADMIN_CODE_HEADER: &str = "x-admin-code";

/// Extractor that requires a valid `x-admin-code` header.
///
/// The check is made on every request; nothing about a successful check is
/// remembered.
///
/// # Example
///
/// ```rust,ignore
/// async fn delete_item(_admin: RequireAdmin, ...) -> Result<Json<Ack>> {
///     ...
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(ADMIN_CODE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if is_valid_code(state.config().admin_code.expose_secret(), provided) {
            Ok(Self)
        } else {
            tracing::warn!(path = %parts.uri.path(), "Rejected admin request");
            Err(AppError::Unauthorized)
        }
    }
}

/// Exact, case-sensitive match. An empty code never matches.
fn is_valid_code(expected: &str, provided: &str) -> bool {
    !provided.is_empty() && constant_time_compare(expected, provided)
}

/// Constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_code() {
        assert!(is_valid_code("s3cret-Code", "s3cret-Code"));
    }

    #[test]
    fn test_rejects_empty_and_case_mismatch() {
        assert!(!is_valid_code("s3cret-Code", ""));
        assert!(!is_valid_code("", ""));
        assert!(!is_valid_code("s3cret-Code", "S3CRET-CODE"));
        assert!(!is_valid_code("s3cret-Code", "s3cret-Cod"));
    }

    #[test]
    fn test_constant_time_compare_lengths() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abcd"));
        assert!(!constant_time_compare("abc", "abd"));
    }
}
