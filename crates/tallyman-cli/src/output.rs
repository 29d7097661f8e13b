//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use tallyman_domain::{FieldComparison, FieldIdMap, FieldOrigin, PredictionRecord};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format a stored prediction record.
    pub fn format_record(&self, record: &PredictionRecord) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
            OutputFormat::Table => Ok(self.format_record_table(record)),
            OutputFormat::Quiet => Ok(format!(
                "{}\t{}",
                record.amount_pred, record.purchase_date_pred
            )),
        }
    }

    fn format_record_table(&self, record: &PredictionRecord) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Predicted", "Origin", "Raw", "Current", "Match"]);

        let reconciliation = record.reconciliation.as_ref();
        let rows = [
            (
                "amount",
                &record.amount_pred,
                record.amount_origin,
                record.raw_amount_token.as_deref(),
                reconciliation.map(|r| &r.amount),
            ),
            (
                "purchase_date",
                &record.purchase_date_pred,
                record.date_origin,
                record.raw_date_token.as_deref(),
                reconciliation.map(|r| &r.purchase_date),
            ),
        ];

        for (name, predicted, origin, raw, comparison) in rows {
            let (current, matched) = self.comparison_cells(comparison);
            builder.push_record([
                name.to_string(),
                predicted.clone(),
                self.origin_cell(origin),
                raw.unwrap_or("-").to_string(),
                current,
                matched,
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        let mut heading = format!(
            "Document {} (extracted {})",
            record.doc_id,
            record.extracted_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        if let Some(r) = reconciliation {
            heading.push_str(&format!(
                ", reconciled {}",
                r.reconciled_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }

        format!("{}\n{}", heading, table)
    }

    fn origin_cell(&self, origin: FieldOrigin) -> String {
        match origin {
            FieldOrigin::Extracted => "extracted".to_string(),
            FieldOrigin::Fallback => self.colorize("fallback", "yellow"),
        }
    }

    fn comparison_cells(&self, comparison: Option<&FieldComparison>) -> (String, String) {
        match comparison {
            None => ("-".to_string(), self.colorize("pending", "blue")),
            Some(c) => (
                c.actual.clone().unwrap_or_else(|| "-".to_string()),
                if c.matches {
                    self.colorize("yes", "green")
                } else {
                    self.colorize("no", "red")
                },
            ),
        }
    }

    /// Format resolved custom field IDs.
    pub fn format_fields(&self, fields: &FieldIdMap) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let map: serde_json::Map<String, serde_json::Value> = fields
                    .iter()
                    .map(|(name, id)| (name.to_string(), id.value().into()))
                    .collect();
                Ok(serde_json::to_string_pretty(&map)?)
            }
            OutputFormat::Table => {
                if fields.is_empty() {
                    return Ok(self.colorize("No fields resolved.", "yellow"));
                }

                let mut builder = Builder::default();
                builder.push_record(["Name", "ID"]);
                for (name, id) in fields.iter() {
                    builder.push_record([name.to_string(), id.to_string()]);
                }

                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
            OutputFormat::Quiet => Ok(fields
                .iter()
                .map(|(name, id)| format!("{}\t{}", id, name))
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tallyman_domain::{DocumentId, FieldId, Prediction, Reconciliation};

    fn create_test_record() -> PredictionRecord {
        PredictionRecord::new(
            DocumentId::new(12),
            &Prediction {
                amount: Some("24.19".to_string()),
                purchase_date: None,
            },
            Some("$24.19".to_string()),
            None,
            Utc.with_ymd_and_hms(2025, 11, 26, 9, 30, 0).unwrap(),
        )
    }

    fn create_test_fields() -> FieldIdMap {
        [
            ("Amount".to_string(), FieldId::new(3)),
            ("Purchase Date".to_string(), FieldId::new(8)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_record_json_format() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_record(&create_test_record()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["amount_pred"], "24.19");
        assert_eq!(value["date_origin"], "fallback");
    }

    #[test]
    fn test_record_quiet_format() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let output = formatter.format_record(&create_test_record()).unwrap();
        assert_eq!(output, "24.19\t1970-01-01");
    }

    #[test]
    fn test_record_table_pending() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_record(&create_test_record()).unwrap();
        assert!(output.starts_with("Document 12 (extracted 2025-11-26 09:30:00 UTC)"));
        assert!(output.contains("Predicted"));
        assert!(output.contains("$24.19"));
        assert!(output.contains("fallback"));
        assert!(output.contains("pending"));
    }

    #[test]
    fn test_record_table_reconciled() {
        let mut record = create_test_record();
        record.reconciliation = Some(Reconciliation::compare(
            &record,
            Some("EUR24.19".to_string()),
            Some("2025-11-27".to_string()),
            Utc.with_ymd_and_hms(2025, 11, 27, 8, 0, 0).unwrap(),
        ));

        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_record(&record).unwrap();
        assert!(output.contains("reconciled 2025-11-27 08:00:00 UTC"));
        assert!(output.contains("EUR24.19"));
        assert!(output.contains("yes"));
        assert!(output.contains("no"));
    }

    #[test]
    fn test_fields_formats() {
        let fields = create_test_fields();

        let table = Formatter::new(OutputFormat::Table, false)
            .format_fields(&fields)
            .unwrap();
        assert!(table.contains("Purchase Date"));

        let json = Formatter::new(OutputFormat::Json, false)
            .format_fields(&fields)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["Amount"], 3);

        let quiet = Formatter::new(OutputFormat::Quiet, false)
            .format_fields(&fields)
            .unwrap();
        assert!(quiet.lines().any(|line| line == "8\tPurchase Date"));
    }

    #[test]
    fn test_empty_fields() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_fields(&FieldIdMap::default()).unwrap();
        assert!(output.contains("No fields resolved"));
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
        assert_eq!(formatter.error("test"), "✗ test");
    }
}
