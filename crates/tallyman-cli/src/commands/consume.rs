//! Consume command implementation.
//!
//! Runs once per newly consumed document: fetch its text, ask the
//! extraction endpoint for amount and date, write both into the document's
//! custom fields, and record what was written for later correlation.

use crate::cli::ConsumeArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::helper::{ExtractionSource, HelperClient};
use crate::output::Formatter;
use chrono::Utc;
use tallyman_domain::traits::PredictionStore;
use tallyman_domain::{DocumentId, Extraction, PredictionRecord, ReceiptFields};
use tallyman_paperless::{apply_prediction, resolve_field_ids, DocumentApi, PaperlessClient};
use tallyman_store::FilePredictionStore;
use tracing::{info, warn};

/// Execute the consume command.
pub async fn execute_consume(args: ConsumeArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let Some(doc_id) = args.document_id else {
        info!("No document id, nothing to do");
        return Ok(());
    };

    config.validate_consume()?;

    let api = PaperlessClient::new(&config.paperless)?;
    let names = config.fields.names();
    let resolved = resolve_field_ids(&api, &names, config.fields.retry_policy()).await?;
    let fields = ReceiptFields::from_map(&resolved, &config.fields.amount, &config.fields.purchase_date)
        .ok_or_else(|| CliError::Config("resolved field map is incomplete".to_string()))?;

    let helper = HelperClient::new(config.helper_url.clone(), config.helper_timeout())?;
    let store = FilePredictionStore::new(&config.store.dir);

    let record = consume_document(&api, &helper, &store, fields, doc_id).await?;

    println!(
        "{}",
        formatter.success(&format!(
            "Document {}: amount={} purchase_date={}",
            doc_id, record.amount_pred, record.purchase_date_pred
        ))
    );
    Ok(())
}

/// Extract, write back and record the prediction for one document
///
/// A failed extraction is logged and treated as an empty prediction, so the
/// document still receives sentinel values. Failures reading or updating
/// the document are returned.
pub async fn consume_document<A, S>(
    api: &A,
    source: &S,
    store: &FilePredictionStore,
    fields: ReceiptFields,
    doc_id: DocumentId,
) -> Result<PredictionRecord>
where
    A: DocumentApi,
    S: ExtractionSource,
{
    let document = api.get_document(doc_id).await?;
    info!(%doc_id, ocr_len = document.content().len(), "Fetched document");

    let extraction = match source.extract(doc_id, document.content()).await {
        Ok(extraction) => extraction,
        Err(e) => {
            warn!(%doc_id, error = %e, "Extraction failed, writing fallback values");
            Extraction::no_text()
        }
    };

    let record = PredictionRecord::from_extraction(doc_id, &extraction, Utc::now());

    let updated = apply_prediction(
        &document.custom_fields,
        fields,
        &record.amount_pred,
        &record.purchase_date_pred,
    );
    api.update_custom_fields(doc_id, &updated).await?;
    info!(
        %doc_id,
        amount = %record.amount_pred,
        purchase_date = %record.purchase_date_pred,
        amount_origin = ?record.amount_origin,
        date_origin = ?record.date_origin,
        "Updated custom fields"
    );

    store.store(&record)?;
    info!(%doc_id, path = %store.record_path(doc_id).display(), "Stored prediction");

    Ok(record)
}
