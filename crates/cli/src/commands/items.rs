//! Item management commands.
//!
//! # Import file format
//!
//! ```yaml
//! - name: Stroller
//!   url: https://shop.example/stroller
//!   price: CHF 300
//! - name: Bodysuits
//!   size: 62/68
//!   notes: Organic cotton if possible
//! ```

use serde::Deserialize;

use gift_registry_core::{ItemId, NewItem};
use gift_registry_server::db::RegistryStore;

use super::{CliError, connect};

/// Item fields as given on the command line or in an import file.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemFields {
    #[serde(alias = "item")]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ItemFields {
    fn into_new_item(self, index: usize) -> Result<NewItem, CliError> {
        Ok(NewItem::new(&self.name)
            .map_err(|source| CliError::InvalidItem { index, source })?
            .with_url(self.url.as_deref())
            .with_price(self.price.as_deref())
            .with_size(self.size.as_deref())
            .with_notes(self.notes.as_deref()))
    }
}

/// Parse and validate an import file. Nothing is inserted if any entry is
/// invalid.
fn parse_import(yaml: &str) -> Result<Vec<NewItem>, CliError> {
    let fields: Vec<ItemFields> = serde_yaml::from_str(yaml)?;
    fields
        .into_iter()
        .enumerate()
        .map(|(i, f)| f.into_new_item(i + 1))
        .collect()
}

/// Print every item.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn list() -> Result<(), CliError> {
    let store = connect().await?;
    let items = store.list_items().await?;

    #[allow(clippy::print_stdout)]
    {
        for item in &items {
            let claimed_at = item
                .claimed_at
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!(
                "{:>5}  {:<40}  {:<8}  {}",
                item.id.as_i64(),
                item.name,
                item.status(),
                claimed_at
            );
        }
    }
    tracing::info!("{} item(s)", items.len());
    Ok(())
}

/// Add one item.
///
/// # Errors
///
/// Returns an error if the name is blank or the insert fails.
pub async fn add(fields: ItemFields) -> Result<(), CliError> {
    let new_item = fields.into_new_item(1)?;
    let store = connect().await?;
    let item = store.insert_item(&new_item).await?;
    tracing::info!("Item created! ID: {}, Name: {}", item.id, item.name);
    Ok(())
}

/// Remove one item.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub async fn remove(id: i64) -> Result<(), CliError> {
    let id = ItemId::new(id);
    let store = connect().await?;
    if store.delete_item(id).await? {
        tracing::info!("Item {id} removed");
    } else {
        tracing::warn!("No item with ID {id}");
    }
    Ok(())
}

/// Import items from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, or an insert fails.
pub async fn import(path: &str) -> Result<(), CliError> {
    let yaml = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_owned(),
        source,
    })?;
    let items = parse_import(&yaml)?;

    let store = connect().await?;
    for item in &items {
        let row = store.insert_item(item).await?;
        tracing::info!("Imported {} ({})", row.name, row.id);
    }
    tracing::info!("Imported {} item(s) from {path}", items.len());
    Ok(())
}
