//! Request body helpers.

use axum::extract::FromRequest;
use serde::Deserialize;

use gift_registry_core::ItemId;

use crate::error::AppError;

/// JSON body extractor whose rejections become `AppError::BadRequest`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// An item ID as sent by clients: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawItemId {
    Number(i64),
    Text(String),
}

impl RawItemId {
    /// Parse into an [`ItemId`]. Ids start at 1.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the value is not a positive integer.
    pub fn parse(&self) -> Result<ItemId, AppError> {
        let invalid = || AppError::BadRequest("Invalid item id".to_string());
        let id: ItemId = match self {
            Self::Number(n) => ItemId::new(*n),
            Self::Text(s) => s.parse().map_err(|_| invalid())?,
        };
        if id.as_i64() <= 0 {
            return Err(invalid());
        }
        Ok(id)
    }
}

/// Require an item ID field.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the field is missing or not an integer.
pub fn require_item_id(raw: Option<&RawItemId>) -> Result<ItemId, AppError> {
    raw.ok_or_else(|| AppError::BadRequest("Missing item id".to_string()))?
        .parse()
}
