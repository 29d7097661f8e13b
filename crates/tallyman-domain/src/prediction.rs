//! Predictions, their persisted records, and reconciliation results

use crate::document::DocumentId;
use crate::normalize::{normalize_amount, normalize_date};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Amount written when no amount could be determined
pub const AMOUNT_SENTINEL: &str = "0.00";

/// Purchase date written when no date could be determined
pub const DATE_SENTINEL: &str = "1970-01-01";

/// Where a predicted field value came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOrigin {
    /// Read from the model's answer
    #[default]
    Extracted,
    /// Substituted sentinel
    Fallback,
}

/// Normalized `{amount, purchase_date}` pair
///
/// `None` means the value is unknown. Amounts are decimal strings with two
/// fraction digits, dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    /// Total paid
    pub amount: Option<String>,
    /// Date of purchase
    pub purchase_date: Option<String>,
}

impl Prediction {
    /// A prediction with both fields unknown
    pub fn empty() -> Self {
        Self::default()
    }

    /// Amount to write forward, substituting the sentinel when unknown
    pub fn amount_or_fallback(&self) -> (String, FieldOrigin) {
        or_fallback(self.amount.as_deref(), AMOUNT_SENTINEL)
    }

    /// Purchase date to write forward, substituting the sentinel when unknown
    pub fn purchase_date_or_fallback(&self) -> (String, FieldOrigin) {
        or_fallback(self.purchase_date.as_deref(), DATE_SENTINEL)
    }
}

fn or_fallback(value: Option<&str>, sentinel: &str) -> (String, FieldOrigin) {
    match value {
        Some(v) if !v.is_empty() => (v.to_string(), FieldOrigin::Extracted),
        _ => (sentinel.to_string(), FieldOrigin::Fallback),
    }
}

/// Output of one extraction: the prediction plus how each value was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Normalized values
    pub prediction: Prediction,
    /// Origin of `prediction.amount`
    pub amount_origin: FieldOrigin,
    /// Origin of `prediction.purchase_date`
    pub date_origin: FieldOrigin,
    /// Amount exactly as the model wrote it
    pub raw_amount: Option<String>,
    /// Purchase date exactly as the model wrote it
    pub raw_purchase_date: Option<String>,
}

impl Extraction {
    /// Result for input with no usable text: both fields unknown, no fallbacks
    pub fn no_text() -> Self {
        Self {
            prediction: Prediction::empty(),
            amount_origin: FieldOrigin::Fallback,
            date_origin: FieldOrigin::Fallback,
            raw_amount: None,
            raw_purchase_date: None,
        }
    }
}

/// Comparison of one predicted field against the document's current value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldComparison {
    /// Value this system wrote
    pub predicted: String,
    /// Value the document holds now
    pub actual: Option<String>,
    /// Whether both normalize to the same value
    pub matches: bool,
}

/// Outcome of correlating a stored prediction with a later notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// When the comparison was made
    pub reconciled_at: DateTime<Utc>,
    /// `extracted_at` of the prediction that was compared
    pub prediction_extracted_at: DateTime<Utc>,
    /// Amount comparison
    pub amount: FieldComparison,
    /// Purchase date comparison
    pub purchase_date: FieldComparison,
}

impl Reconciliation {
    /// Compare a record against the document's current field values
    ///
    /// Actual amounts go through the same normalization as predictions, so a
    /// document value of `EUR24.19` matches a prediction of `24.19`.
    pub fn compare(
        record: &PredictionRecord,
        actual_amount: Option<String>,
        actual_date: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let amount_matches = actual_amount
            .as_deref()
            .and_then(normalize_amount)
            .is_some_and(|a| a == record.amount_pred);
        let date_matches = actual_date
            .as_deref()
            .and_then(normalize_date)
            .is_some_and(|d| d == record.purchase_date_pred);

        Self {
            reconciled_at: now,
            prediction_extracted_at: record.extracted_at,
            amount: FieldComparison {
                predicted: record.amount_pred.clone(),
                actual: actual_amount,
                matches: amount_matches,
            },
            purchase_date: FieldComparison {
                predicted: record.purchase_date_pred.clone(),
                actual: actual_date,
                matches: date_matches,
            },
        }
    }

    /// Whether the document still holds exactly what was predicted
    pub fn all_match(&self) -> bool {
        self.amount.matches && self.purchase_date.matches
    }

    /// Whether this comparison was made against `record`'s prediction
    pub fn describes(&self, record: &PredictionRecord) -> bool {
        self.prediction_extracted_at == record.extracted_at
    }
}

/// Prediction persisted by document ID
///
/// Written when extraction completes, read when the notification for the
/// same document arrives, and overwritten if extraction runs again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Document the prediction belongs to
    pub doc_id: DocumentId,
    /// Amount written to the document
    pub amount_pred: String,
    /// Purchase date written to the document
    pub purchase_date_pred: String,
    /// Whether the amount is a sentinel
    #[serde(default)]
    pub amount_origin: FieldOrigin,
    /// Whether the purchase date is a sentinel
    #[serde(default)]
    pub date_origin: FieldOrigin,
    /// Amount as the model wrote it
    #[serde(default)]
    pub raw_amount_token: Option<String>,
    /// Purchase date as the model wrote it
    #[serde(default)]
    pub raw_date_token: Option<String>,
    /// When the extraction finished
    pub extracted_at: DateTime<Utc>,
    /// Latest correlation result, if a notification has been seen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<Reconciliation>,
}

impl PredictionRecord {
    /// Build a record from a prediction, substituting sentinels for unknowns
    pub fn new(
        doc_id: DocumentId,
        prediction: &Prediction,
        raw_amount_token: Option<String>,
        raw_date_token: Option<String>,
        extracted_at: DateTime<Utc>,
    ) -> Self {
        let (amount_pred, amount_origin) = prediction.amount_or_fallback();
        let (purchase_date_pred, date_origin) = prediction.purchase_date_or_fallback();
        Self {
            doc_id,
            amount_pred,
            purchase_date_pred,
            amount_origin,
            date_origin,
            raw_amount_token,
            raw_date_token,
            extracted_at,
            reconciliation: None,
        }
    }
}

impl PredictionRecord {
    /// Build a record from an extraction, keeping its field origins
    ///
    /// A field the extraction marked as a fallback stays a fallback even
    /// when it already carries the sentinel value.
    pub fn from_extraction(
        doc_id: DocumentId,
        extraction: &Extraction,
        extracted_at: DateTime<Utc>,
    ) -> Self {
        let mut record = Self::new(
            doc_id,
            &extraction.prediction,
            extraction.raw_amount.clone(),
            extraction.raw_purchase_date.clone(),
            extracted_at,
        );
        if extraction.amount_origin == FieldOrigin::Fallback {
            record.amount_origin = FieldOrigin::Fallback;
        }
        if extraction.date_origin == FieldOrigin::Fallback {
            record.date_origin = FieldOrigin::Fallback;
        }
        record
    }
}
