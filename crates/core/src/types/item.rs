//! Registry item records.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ItemId;

/// A gift entry on the registry.
///
/// `claimed_at` is `None` while the item is open. It is set exactly once by a
/// successful claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub url: Option<String>,
    pub price: Option<String>,
    pub size: Option<String>,
    pub notes: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Current status derived from `claimed_at`.
    #[must_use]
    pub const fn status(&self) -> ItemStatus {
        if self.claimed_at.is_some() {
            ItemStatus::Claimed
        } else {
            ItemStatus::Open
        }
    }

    /// Returns true if nobody has claimed the item yet.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.claimed_at.is_none()
    }
}

/// Whether an item can still be claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Open,
    Claimed,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Claimed => f.write_str("claimed"),
        }
    }
}

/// An item as published to clients: the stored row plus its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedItem {
    #[serde(flatten)]
    pub item: Item,
    pub status: ItemStatus,
}

impl From<Item> for ListedItem {
    fn from(item: Item) -> Self {
        let status = item.status();
        Self { item, status }
    }
}

/// Errors building a [`NewItem`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NewItemError {
    #[error("item name is required")]
    MissingName,
}

/// Fields for inserting a new item.
///
/// Optional text fields are trimmed; blank values are stored as `NULL`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewItem {
    pub name: String,
    pub url: Option<String>,
    pub price: Option<String>,
    pub size: Option<String>,
    pub notes: Option<String>,
}

impl NewItem {
    /// Build a new item from a display name.
    ///
    /// # Errors
    ///
    /// Returns `NewItemError::MissingName` if the name is blank.
    pub fn new(name: &str) -> Result<Self, NewItemError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(NewItemError::MissingName);
        }
        Ok(Self {
            name: name.to_owned(),
            url: None,
            price: None,
            size: None,
            notes: None,
        })
    }

    #[must_use]
    pub fn with_url(mut self, url: Option<&str>) -> Self {
        self.url = non_blank(url);
        self
    }

    #[must_use]
    pub fn with_price(mut self, price: Option<&str>) -> Self {
        self.price = non_blank(price);
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: Option<&str>) -> Self {
        self.size = non_blank(size);
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: Option<&str>) -> Self {
        self.notes = non_blank(notes);
        self
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_item(claimed_at: Option<DateTime<Utc>>) -> Item {
        Item {
            id: ItemId::new(1),
            name: "Baby carrier".to_string(),
            url: None,
            price: Some("CHF 120".to_string()),
            size: None,
            notes: None,
            claimed_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_follows_claimed_at() {
        assert_eq!(sample_item(None).status(), ItemStatus::Open);
        assert!(sample_item(None).is_open());
        assert_eq!(sample_item(Some(Utc::now())).status(), ItemStatus::Claimed);
    }

    #[test]
    fn test_new_item_requires_name() {
        assert_eq!(NewItem::new(""), Err(NewItemError::MissingName));
        assert_eq!(NewItem::new("   "), Err(NewItemError::MissingName));
        assert_eq!(NewItem::new(" Stroller ").unwrap().name, "Stroller");
    }

    #[test]
    fn test_new_item_blank_optionals_become_none() {
        let item = NewItem::new("Onesie")
            .unwrap()
            .with_url(Some("  "))
            .with_price(Some(" CHF 20 "))
            .with_size(None)
            .with_notes(Some(""));
        assert_eq!(item.url, None);
        assert_eq!(item.price.as_deref(), Some("CHF 20"));
        assert_eq!(item.size, None);
        assert_eq!(item.notes, None);
    }

    #[test]
    fn test_item_json_field_names() {
        let json = serde_json::to_value(sample_item(None)).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "Baby carrier");
        assert!(json["claimed_at"].is_null());
        assert!(json.get("created_at").is_some());
    }

    #[test]
    fn test_listed_item_carries_status() {
        let open = serde_json::to_value(ListedItem::from(sample_item(None))).unwrap();
        assert_eq!(open["status"], "open");
        assert_eq!(open["name"], "Baby carrier");

        let claimed = serde_json::to_value(ListedItem::from(sample_item(Some(Utc::now())))).unwrap();
        assert_eq!(claimed["status"], "claimed");
        assert!(claimed["claimed_at"].is_string());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ItemStatus::Open.to_string(), "open");
        assert_eq!(ItemStatus::Claimed.to_string(), "claimed");
    }
}
