//! Custom field resolution and updates
//!
//! Field IDs are looked up by name once at startup. Listing is retried a
//! fixed number of times with a fixed pause, since the document API is often
//! still starting when this process starts.

use crate::client::DocumentApi;
use crate::error::ApiError;
use std::time::Duration;
use tallyman_domain::{CustomFieldValue, FieldIdMap, ReceiptFields};
use thiserror::Error;
use tracing::{info, warn};

/// Bounded retry with a fixed delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(2),
        }
    }
}

/// Why field resolution failed
#[derive(Debug, Error)]
pub enum FieldResolveError {
    /// Every attempt at listing fields failed
    #[error("Could not list custom fields after {attempts} attempts: {last_error}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Error from the final attempt
        #[source]
        last_error: ApiError,
    },

    /// Listing worked but some names do not exist
    #[error("Custom fields not found: {missing:?} (resolved: {resolved:?})")]
    Missing {
        /// Names with no matching field
        missing: Vec<String>,
        /// Names that did resolve
        resolved: FieldIdMap,
    },
}

/// Resolve field names to IDs
///
/// Any API error is retried until `policy.max_attempts` is reached. A name
/// absent from a successful listing fails immediately.
pub async fn resolve_field_ids<A: DocumentApi>(
    api: &A,
    names: &[&str],
    policy: RetryPolicy,
) -> Result<FieldIdMap, FieldResolveError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    let listed = loop {
        match api.list_custom_fields().await {
            Ok(listed) => break listed,
            Err(e) if attempt < attempts => {
                warn!(attempt, max_attempts = attempts, error = %e, "Listing custom fields failed, retrying");
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(FieldResolveError::Exhausted {
                    attempts,
                    last_error: e,
                })
            }
        }
    };

    let resolved: FieldIdMap = listed
        .into_iter()
        .filter(|field| names.contains(&field.name.as_str()))
        .map(|field| (field.name, field.id))
        .collect();

    let missing = resolved.missing(names.iter().copied());
    if !missing.is_empty() {
        return Err(FieldResolveError::Missing { missing, resolved });
    }

    info!(attempt, fields = ?resolved, "Resolved custom field IDs");
    Ok(resolved)
}

/// Write a prediction into a document's custom field list
///
/// Returns the full list to send back: entries for other fields are kept
/// exactly as they were, entries for the amount and date fields get the new
/// values, and either field missing from the document is appended.
pub fn apply_prediction(
    current: &[CustomFieldValue],
    fields: ReceiptFields,
    amount: &str,
    purchase_date: &str,
) -> Vec<CustomFieldValue> {
    let mut updated = current.to_vec();
    let mut seen_amount = false;
    let mut seen_date = false;

    for entry in &mut updated {
        if entry.field == fields.amount {
            entry.value = amount.into();
            seen_amount = true;
        } else if entry.field == fields.purchase_date {
            entry.value = purchase_date.into();
            seen_date = true;
        }
    }

    if !seen_amount {
        updated.push(CustomFieldValue::new(fields.amount, amount));
    }
    if !seen_date {
        updated.push(CustomFieldValue::new(fields.purchase_date, purchase_date));
    }

    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CustomField;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tallyman_domain::{Document, DocumentId, FieldId};

    /// Fails the first `failures` listings, then returns `fields`
    struct FlakyApi {
        failures: u32,
        calls: AtomicU32,
        fields: Vec<CustomField>,
    }

    impl FlakyApi {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                fields: vec![field(3, "Amount"), field(8, "Purchase Date"), field(9, "Notes")],
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn field(id: u64, name: &str) -> CustomField {
        CustomField {
            id: FieldId::new(id),
            name: name.to_string(),
            data_type: None,
        }
    }

    impl DocumentApi for FlakyApi {
        async fn get_document(&self, _id: DocumentId) -> Result<Document, ApiError> {
            Ok(Document::default())
        }

        async fn update_custom_fields(
            &self,
            _id: DocumentId,
            _fields: &[CustomFieldValue],
        ) -> Result<(), ApiError> {
            Ok(())
        }

        async fn list_custom_fields(&self) -> Result<Vec<CustomField>, ApiError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(ApiError::Status {
                    status: 503,
                    body: "starting".to_string(),
                })
            } else {
                Ok(self.fields.clone())
            }
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 10,
            delay: Duration::ZERO,
        }
    }

    const NAMES: [&str; 2] = ["Amount", "Purchase Date"];

    #[tokio::test]
    async fn test_resolve_first_try() {
        let api = FlakyApi::new(0);
        let map = resolve_field_ids(&api, &NAMES, policy()).await.unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("Amount"), Some(FieldId::new(3)));
        assert_eq!(map.get("Purchase Date"), Some(FieldId::new(8)));
        assert_eq!(map.get("Notes"), None);
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn test_resolve_succeeds_on_last_attempt() {
        let api = FlakyApi::new(9);
        let map = resolve_field_ids(&api, &NAMES, policy()).await.unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(api.calls(), 10);
    }

    #[tokio::test]
    async fn test_resolve_exhausted() {
        let api = FlakyApi::new(10);
        let result = resolve_field_ids(&api, &NAMES, policy()).await;

        match result {
            Err(FieldResolveError::Exhausted {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 10);
                assert!(matches!(last_error, ApiError::Status { status: 503, .. }));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(api.calls(), 10);
    }

    #[tokio::test]
    async fn test_resolve_missing_name_is_immediate() {
        let api = FlakyApi::new(0);
        let result = resolve_field_ids(&api, &["Amount", "Vendor"], policy()).await;

        match result {
            Err(FieldResolveError::Missing { missing, resolved }) => {
                assert_eq!(missing, vec!["Vendor".to_string()]);
                assert_eq!(resolved.get("Amount"), Some(FieldId::new(3)));
            }
            other => panic!("expected missing field, got {:?}", other),
        }
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_waits_between_attempts() {
        let api = FlakyApi::new(2);
        let policy = RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_secs(2),
        };

        let start = tokio::time::Instant::now();
        resolve_field_ids(&api, &NAMES, policy).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    fn receipt() -> ReceiptFields {
        ReceiptFields {
            amount: FieldId::new(3),
            purchase_date: FieldId::new(8),
        }
    }

    #[test]
    fn test_apply_preserves_other_fields() {
        let notes: CustomFieldValue =
            serde_json::from_value(json!({"field": 9, "value": "keep me", "extra": true})).unwrap();
        let current = vec![
            notes.clone(),
            CustomFieldValue::new(FieldId::new(3), serde_json::Value::Null),
            CustomFieldValue::new(FieldId::new(8), "2020-01-01"),
        ];

        let updated = apply_prediction(&current, receipt(), "24.19", "2025-11-26");

        assert_eq!(updated.len(), 3);
        assert_eq!(updated[0], notes);
        assert_eq!(updated[1].value, json!("24.19"));
        assert_eq!(updated[2].value, json!("2025-11-26"));
    }

    #[test]
    fn test_apply_appends_absent_fields() {
        let current = vec![CustomFieldValue::new(FieldId::new(9), "note")];

        let updated = apply_prediction(&current, receipt(), "0.00", "1970-01-01");

        assert_eq!(updated.len(), 3);
        assert_eq!(updated[1], CustomFieldValue::new(FieldId::new(3), "0.00"));
        assert_eq!(
            updated[2],
            CustomFieldValue::new(FieldId::new(8), "1970-01-01")
        );
    }
}
