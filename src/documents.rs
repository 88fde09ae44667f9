// src/documents.rs

use crate::Error as CrateError;
use crate::window_limit::{
    LimitError, Limiter, WindowLimitSettings, reqwest_integration::ReqwestService,
};

use bytes::Bytes;
use http::{Method, Request as HttpRequest, Response as HttpResponse, header};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use std::{fmt, sync::Arc, time::Duration};
use tower::{Service, ServiceExt};

pub const DEFAULT_BASE_URL: &str = "https://ismp.crpt.ru";
pub const CREATE_DOCUMENT_PATH: &str = "/api/v3/lk/documents/create";
pub const SIGNATURE_HEADER: &str = "Signature";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SubmitError {
    #[snafu(display("Invalid rate limit configuration: {}", source))]
    InvalidLimit { source: LimitError },

    #[snafu(display("Failed to build HTTP client: {}", source))]
    BuildHttpClient { source: reqwest::Error },

    #[snafu(display("Failed to serialize document: {}", source))]
    Serialization { source: serde_json::Error },

    #[snafu(display("Failed to build request: {}", source))]
    BuildRequest { source: http::Error },

    #[snafu(display("Document submission transport error: {}", source))]
    Transport { source: CrateError },

    #[snafu(display("Interrupted while waiting for a request slot: {}", source))]
    Interrupted { source: LimitError },
}

/// Document record accepted by the submission endpoint.
///
/// Serialized with camelCase keys; `importRequest` is a JSON boolean.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub description: String,
    pub doc_id: String,
    pub doc_status: String,
    pub doc_type: String,
    pub import_request: bool,
    pub owner_inn: String,
    pub participant_inn: String,
    pub producer_inn: String,
    pub production_date: String,
    pub production_type: String,
    pub reg_date: String,
    pub reg_number: String,
}

/// Precomputed signature, sent verbatim in the `Signature` header.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Signature {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Signature {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signature")
            .field(&format_args!("<{} bytes>", self.0.len()))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DocumentClientConfig {
    pub base_url: String,
    pub limit: WindowLimitSettings,
    pub reqwest_client: Option<reqwest::Client>,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for DocumentClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            limit: WindowLimitSettings::default(),
            reqwest_client: None,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: Some(format!(
                "submission-gate/{}",
                option_env!("CARGO_PKG_VERSION").unwrap_or("0.1.0")
            )),
        }
    }
}

/// Submits documents through a shared [`Limiter`].
///
/// Clones share the limiter, so any number of tasks can submit concurrently
/// without exceeding the configured quota.
#[derive(Clone, Debug)]
pub struct DocumentClient<S = ReqwestService> {
    transport: S,
    limiter: Arc<Limiter>,
    create_url: String,
}

impl DocumentClient<ReqwestService> {
    /// Build a client over `reqwest` with its own limiter, spawned on the current
    /// tokio runtime.
    pub fn new(config: DocumentClientConfig) -> Result<Self, SubmitError> {
        let client = match config.reqwest_client.clone() {
            Some(client) => client,
            None => {
                let mut builder = reqwest::Client::builder()
                    .timeout(config.request_timeout)
                    .connect_timeout(config.connect_timeout);
                if let Some(ua) = &config.user_agent {
                    builder = builder.user_agent(ua);
                }
                builder.build().context(BuildHttpClientSnafu)?
            }
        };

        let limiter = Limiter::with_settings(config.limit).context(InvalidLimitSnafu)?;

        info!(
            target: "documents",
            base_url = %config.base_url,
            window_ms = config.limit.get_window().as_millis(),
            max_requests = config.limit.get_max_requests(),
            "DocumentClient initialized"
        );

        Ok(Self::from_parts(
            ReqwestService::new_with_client(client),
            Arc::new(limiter),
            &config.base_url,
        ))
    }
}

impl<S> DocumentClient<S> {
    /// Assemble a client from an arbitrary transport and an existing limiter.
    pub fn from_parts(transport: S, limiter: Arc<Limiter>, base_url: &str) -> Self {
        let create_url = format!(
            "{}{}",
            base_url.trim_end_matches('/'),
            CREATE_DOCUMENT_PATH
        );
        Self {
            transport,
            limiter,
            create_url,
        }
    }

    pub fn limiter(&self) -> &Arc<Limiter> {
        &self.limiter
    }

    pub fn create_url(&self) -> &str {
        &self.create_url
    }
}

impl<S> DocumentClient<S>
where
    S: Service<HttpRequest<Bytes>, Response = HttpResponse<String>>,
    S::Error: Into<CrateError>,
{
    /// Wait for a window slot, then POST `document` and return the raw response
    /// body, whatever its status.
    ///
    /// The slot stays consumed when serialization or the transport fails.
    pub async fn create_document(
        &mut self,
        document: &Document,
        signature: &Signature,
    ) -> Result<String, SubmitError> {
        self.limiter.acquire().await.context(InterruptedSnafu)?;

        let payload = serde_json::to_vec(document).context(SerializationSnafu)?;

        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri(self.create_url.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature.as_str())
            .body(Bytes::from(payload))
            .context(BuildRequestSnafu)?;

        debug!(target: "documents", doc_id = %document.doc_id, url = %self.create_url, "Submitting document");

        let transport = self
            .transport
            .ready()
            .await
            .map_err(Into::<CrateError>::into)
            .context(TransportSnafu)?;
        let response = transport
            .call(request)
            .await
            .map_err(Into::<CrateError>::into)
            .context(TransportSnafu)?;

        debug!(target: "documents", status = %response.status(), "Document submission answered");
        Ok(response.into_body())
    }
}
