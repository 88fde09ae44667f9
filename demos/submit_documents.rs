// demos/submit_documents.rs
//
// Submits a burst of documents through a 2-per-second gate and logs when each one
// was let through. Reads SUBMISSION_BASE_URL and SUBMISSION_SIGNATURE from the
// environment or a `.env` file.

use std::{env, time::Duration};

use submission_gate::{
    documents::{DEFAULT_BASE_URL, Document, DocumentClient, DocumentClientConfig, Signature},
    window_limit::WindowLimitSettings,
};
use tokio::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const BASE_URL_ENV_VAR: &str = "SUBMISSION_BASE_URL";
const SIGNATURE_ENV_VAR: &str = "SUBMISSION_SIGNATURE";
const NUM_DOCUMENTS_TO_SEND: usize = 6;

fn sample_document(i: usize) -> Document {
    Document {
        description: "Description".to_string(),
        doc_id: format!("doc_id_{i}"),
        doc_status: "status".to_string(),
        doc_type: "LP_INTRODUCE_GOODS".to_string(),
        import_request: true,
        owner_inn: "1234567890".to_string(),
        participant_inn: "0987654321".to_string(),
        producer_inn: "1122334455".to_string(),
        production_date: "2024-09-02".to_string(),
        production_type: "production_type".to_string(),
        reg_date: "2024-09-02".to_string(),
        reg_number: "reg_number".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), submission_gate::Error> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,submission_gate=debug,window_limit::stats=debug")
        }))
        .with(fmt::layer())
        .init();

    let base_url = env::var(BASE_URL_ENV_VAR).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let signature = Signature::from(
        env::var(SIGNATURE_ENV_VAR).unwrap_or_else(|_| "signature".to_string()),
    );

    let config = DocumentClientConfig {
        base_url,
        limit: WindowLimitSettings::builder()
            .window(Duration::from_secs(1))
            .max_requests(2)
            .build(),
        ..Default::default()
    };
    let client = DocumentClient::new(config)?;
    let start = Instant::now();

    let handles: Vec<_> = (0..NUM_DOCUMENTS_TO_SEND)
        .map(|i| {
            let mut client = client.clone();
            let signature = signature.clone();
            tokio::spawn(async move {
                let document = sample_document(i);
                match client.create_document(&document, &signature).await {
                    Ok(body) => info!(
                        doc_id = %document.doc_id,
                        elapsed_ms = start.elapsed().as_millis(),
                        response = %body,
                        "Document submitted"
                    ),
                    Err(e) => error!(
                        doc_id = %document.doc_id,
                        elapsed_ms = start.elapsed().as_millis(),
                        error = %e,
                        "Document submission failed"
                    ),
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await?;
    }

    client.limiter().shutdown();
    Ok(())
}
