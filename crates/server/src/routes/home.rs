//! Registry page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use gift_registry_core::{Item, ItemStatus};

use crate::error::Result;
use crate::state::AppState;

/// An item as shown on the page.
#[derive(Debug, Clone)]
pub struct ItemView {
    pub id: i64,
    pub name: String,
    pub url: Option<String>,
    /// Price and size joined for display, e.g. `CHF 40 · 62/68`.
    pub details: String,
    pub notes: Option<String>,
}

impl From<&Item> for ItemView {
    fn from(item: &Item) -> Self {
        let details = [item.price.as_deref(), item.size.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" · ");
        Self {
            id: item.id.as_i64(),
            name: item.name.clone(),
            url: item.url.clone(),
            details,
            notes: item.notes.clone(),
        }
    }
}

/// Registry page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub registry_name: String,
    pub open_items: Vec<ItemView>,
    pub claimed_items: Vec<ItemView>,
}

impl HomeTemplate {
    fn new(registry_name: &str, items: &[Item]) -> Self {
        let (open, claimed): (Vec<&Item>, Vec<&Item>) = items
            .iter()
            .partition(|i| i.status() == ItemStatus::Open);
        Self {
            registry_name: registry_name.to_owned(),
            open_items: open.into_iter().map(ItemView::from).collect(),
            claimed_items: claimed.into_iter().map(ItemView::from).collect(),
        }
    }
}

/// Display the registry page.
#[instrument(skip_all)]
pub async fn home(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let items = state.store().list_items().await?;
    Ok(HomeTemplate::new(&state.config().registry_name, &items))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use gift_registry_core::ItemId;

    use super::*;

    fn item(id: i64, claimed: bool) -> Item {
        Item {
            id: ItemId::new(id),
            name: format!("Item {id}"),
            url: None,
            price: Some("CHF 40".to_string()),
            size: Some("62/68".to_string()),
            notes: None,
            claimed_at: claimed.then(Utc::now),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_items_split_by_status() {
        let page = HomeTemplate::new("Baby in Need", &[item(1, false), item(2, true)]);
        assert_eq!(page.open_items.len(), 1);
        assert_eq!(page.claimed_items.len(), 1);
        assert_eq!(page.open_items[0].details, "CHF 40 · 62/68");
    }

    #[test]
    fn test_page_renders_open_item_form() {
        let html = HomeTemplate::new("Baby in Need", &[item(7, false)])
            .render()
            .unwrap_or_default();
        assert!(html.contains("Baby in Need"));
        assert!(html.contains("data-item-id=\"7\""));
    }

    #[test]
    fn test_page_applies_live_updates_in_place() {
        let html = HomeTemplate::new("Baby in Need", &[item(1, false), item(2, true)])
            .render()
            .unwrap_or_default();
        assert!(html.contains("data-claimed-id=\"2\""));
        assert!(html.contains("id=\"all-reserved\" hidden"));
        assert!(html.contains("function applyItems(items)"));
        assert!(html.contains("pending.has(id)"));
        assert!(!html.contains("location.reload"));
    }

    #[test]
    fn test_page_without_open_items_shows_placeholder() {
        let html = HomeTemplate::new("Baby in Need", &[item(2, true)])
            .render()
            .unwrap_or_default();
        assert!(html.contains("<p id=\"all-reserved\">"));
    }
}
