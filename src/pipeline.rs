// src/pipeline.rs

use std::sync::Arc;

use tracing::{Instrument, error, info_span};

use crate::assemble::{self, ExtractionOutcome};
use crate::gateway::{OcrGateway, Upload};
use crate::heuristics::ExtractionOptions;

/// Gateway call, then normalize, extract and assemble.
///
/// Never fails: every error path ends in an [`ExtractionOutcome`].
#[derive(Clone)]
pub struct InvoicePipeline {
    gateway: Arc<dyn OcrGateway>,
    options: ExtractionOptions,
}

impl InvoicePipeline {
    pub fn new(gateway: Arc<dyn OcrGateway>, options: ExtractionOptions) -> Self {
        Self { gateway, options }
    }

    pub async fn process(&self, upload: &Upload) -> ExtractionOutcome {
        let span = info_span!(
            "pipeline",
            filename = upload.filename.as_deref().unwrap_or("-"),
            backend = self.gateway.backend(),
        );

        async move {
            let result = self.gateway.recognize(upload).await;
            let options = self.options;

            // Extraction runs off the async workers; a panic there becomes a fallback.
            match tokio::task::spawn_blocking(move || assemble::assemble(result, &options)).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, "Extraction task failed");
                    ExtractionOutcome::error_fallback(format!("Greška pri obradi: {e}"))
                }
            }
        }
        .instrument(span)
        .await
    }
}
