use crate::window_limit::http::HttpError;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Request as HttpRequest, Response as HttpResponse};
use std::task::{Context, Poll};
use tower::Service;

/// A `tower::Service` wrapper for `reqwest::Client`.
///
/// Accepts `http::Request<Bytes>` and resolves to the server's status, headers and
/// body text without interpreting the status.
#[derive(Clone, Debug)]
pub struct ReqwestService {
    client: reqwest::Client,
}

impl ReqwestService {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn new_with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<HttpRequest<Bytes>> for ReqwestService {
    type Response = HttpResponse<String>;
    type Error = HttpError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, http_request: HttpRequest<Bytes>) -> Self::Future {
        let (parts, body) = http_request.into_parts();

        let url_str = parts.uri.to_string();
        let url = match reqwest::Url::parse(&url_str) {
            Ok(u) => u,
            Err(parse_err) => {
                let err = HttpError::InvalidRequest {
                    details: format!("Invalid URL '{}': {}", url_str, parse_err),
                };
                return Box::pin(async move { Err(err) });
            }
        };

        let request_future = self
            .client
            .request(parts.method, url)
            .headers(parts.headers)
            .body(body)
            .send();

        Box::pin(async move {
            let response = match request_future.await {
                Ok(response) => response,
                Err(e) if e.is_timeout() => {
                    warn!(error = %e, "Request timed out");
                    return Err(HttpError::Timeout);
                }
                Err(e) if e.is_connect() => {
                    error!(error = %e, "Connection error");
                    return Err(HttpError::Transport {
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    error!(error = %e, "Other reqwest error");
                    return Err(HttpError::ClientError {
                        source: Box::new(e),
                    });
                }
            };

            let status = response.status();
            let headers = response.headers().clone();
            let version = response.version();
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, %status, "Could not read response body");
                    return Err(HttpError::ClientError {
                        source: Box::new(e),
                    });
                }
            };

            debug!(%status, body_len = text.len(), "Received response");

            let mut http_response = HttpResponse::new(text);
            *http_response.status_mut() = status;
            *http_response.version_mut() = version;
            *http_response.headers_mut() = headers;
            Ok(http_response)
        })
    }
}
