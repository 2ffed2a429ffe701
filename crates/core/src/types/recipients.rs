//! Owner notification recipient list.
//!
//! Stored in the `config` table under [`RECIPIENTS_KEY`] as
//! `{"emails": "a@x.ch, b@y.ch"}`. Entries are not validated as email
//! addresses here; a bad entry surfaces as a failed send downstream.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

/// Config key holding the owner recipient list.
pub const RECIPIENTS_KEY: &str = "recipients";

/// Separator used when rendering a list back to a string.
const SEPARATOR: &str = ", ";

/// A normalized, comma-separated list of email recipients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientList(Vec<String>);

impl RecipientList {
    /// Parse a raw comma-separated string.
    ///
    /// Each entry is trimmed and empty entries are dropped, so
    /// `" a@x.ch ,, b@y.ch "` becomes `["a@x.ch", "b@y.ch"]`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    /// Read the list from a stored config value.
    ///
    /// Anything other than an object with a string `emails` field yields an
    /// empty list.
    #[must_use]
    pub fn from_config_value(value: &JsonValue) -> Self {
        value
            .get("emails")
            .and_then(JsonValue::as_str)
            .map(Self::parse)
            .unwrap_or_default()
    }

    /// Config value representation, the inverse of [`Self::from_config_value`].
    #[must_use]
    pub fn to_config_value(&self) -> JsonValue {
        json!({ "emails": self.render() })
    }

    /// Render as a single string joined with `", "`.
    #[must_use]
    pub fn render(&self) -> String {
        self.0.join(SEPARATOR)
    }

    /// Returns this list, or `fallback` if this list is empty.
    #[must_use]
    pub fn or_fallback(self, fallback: &Self) -> Self {
        if self.is_empty() {
            fallback.clone()
        } else {
            self
        }
    }

    /// Returns true if there are no recipients.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of recipients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The recipients as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Iterate over the recipients.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for RecipientList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<Vec<String>> for RecipientList {
    fn from(entries: Vec<String>) -> Self {
        Self::parse(&entries.join(","))
    }
}
