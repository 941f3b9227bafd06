//! Pre-persistence hook for ERP documents.

use crate::models::{DocumentNumber, ErpDocument, TotalsPolicy};
use crate::services::metrics::DOCUMENTS_FINALIZED_TOTAL;
use crate::services::sequence::SequenceSource;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use tracing::debug;

/// Prepare `document` for a write.
///
/// Assigns a document number when none is set, drawing the sequence from
/// `sequences` and the year/month from `now`, then recomputes every aggregate
/// field from the line items. An existing number is never changed. On error
/// a number issued by this call is removed again.
pub async fn finalize<D, S>(
    document: &mut D,
    sequences: &S,
    policy: &TotalsPolicy,
    now: DateTime<Utc>,
) -> Result<(), AppError>
where
    D: ErpDocument + Send,
    S: SequenceSource + ?Sized,
{
    let unnumbered = document.document_number().is_none();
    if unnumbered {
        let sequence = sequences.next_sequence(D::KIND).await?;
        let number = DocumentNumber::new(D::KIND, now, sequence);
        debug!(kind = %D::KIND, number = %number, "Assigned document number");
        document.assign_document_number(&number);
    }

    if let Err(e) = document.recalculate_totals(policy) {
        if unnumbered {
            document.clear_document_number();
        }
        return Err(AppError::BadRequest(anyhow::Error::new(e)));
    }

    DOCUMENTS_FINALIZED_TOTAL
        .with_label_values(&[D::KIND.as_str()])
        .inc();

    Ok(())
}
