//! Documents and custom fields as the document-management system exposes them

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identifier of a document in the document-management system
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(u64);

impl DocumentId {
    /// Wrap a raw document number
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw document number
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|e| format!("Invalid document id '{}': {}", s, e))
    }
}

/// Numeric identifier of a custom field definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(u64);

impl FieldId {
    /// Wrap a raw field number
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw field number
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One custom field value attached to a document
///
/// Only `field` and `value` are interpreted. Any other keys the document
/// system sends are carried in `extra` so a read-modify-write round trip
/// returns them untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldValue {
    /// Field definition this value belongs to
    pub field: FieldId,

    /// Raw value; strings for monetary and date fields, anything for others
    #[serde(default)]
    pub value: Value,

    /// Keys not interpreted here
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CustomFieldValue {
    /// Create a value entry for a field
    pub fn new(field: FieldId, value: impl Into<Value>) -> Self {
        Self {
            field,
            value: value.into(),
            extra: Map::new(),
        }
    }
}

/// A document as returned by the document API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document ID (absent if the API was asked not to return it)
    #[serde(default)]
    pub id: Option<DocumentId>,

    /// OCR text
    #[serde(default)]
    pub content: Option<String>,

    /// Custom field values, in the order the API returned them
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldValue>,
}

impl Document {
    /// OCR text, or an empty string when the document has none
    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    /// Current value of a custom field, if the document carries it
    pub fn field_value(&self, field: FieldId) -> Option<&Value> {
        self.custom_fields
            .iter()
            .find(|cf| cf.field == field)
            .map(|cf| &cf.value)
    }
}

/// Custom-field names resolved to their numeric IDs
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldIdMap {
    ids: BTreeMap<String, FieldId>,
}

impl FieldIdMap {
    /// Look up a field ID by its human-readable name
    pub fn get(&self, name: &str) -> Option<FieldId> {
        self.ids.get(name).copied()
    }

    /// Names from `required` that are not present in this map
    pub fn missing<'a>(&self, required: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        required
            .into_iter()
            .filter(|name| !self.ids.contains_key(*name))
            .map(str::to_string)
            .collect()
    }

    /// Iterate over `(name, id)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldId)> {
        self.ids.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Number of resolved names
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing was resolved
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<(String, FieldId)> for FieldIdMap {
    fn from_iter<T: IntoIterator<Item = (String, FieldId)>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// The two field IDs this system writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptFields {
    /// ID of the monetary amount field
    pub amount: FieldId,
    /// ID of the purchase date field
    pub purchase_date: FieldId,
}

impl ReceiptFields {
    /// Pick the receipt fields out of a resolved map by name
    pub fn from_map(map: &FieldIdMap, amount_name: &str, date_name: &str) -> Option<Self> {
        Some(Self {
            amount: map.get(amount_name)?,
            purchase_date: map.get(date_name)?,
        })
    }
}
