use std::{
    sync::Arc,
    task::{Context, Poll},
};

use futures::future::BoxFuture;
use tower::Service;

use super::Limiter;
use crate::Error as CrateError;

/// Service that reserves a window slot before forwarding each request.
///
/// Readiness is delegated to the inner service; the wait for a slot happens inside
/// the response future, so a saturated window never blocks `poll_ready`.
#[derive(Clone, Debug)]
pub struct WindowLimit<S> {
    inner: S,
    limiter: Arc<Limiter>,
}

impl<S> WindowLimit<S> {
    pub const fn new(inner: S, limiter: Arc<Limiter>) -> Self {
        Self { inner, limiter }
    }

    pub fn limiter(&self) -> &Arc<Limiter> {
        &self.limiter
    }
}

impl<S, Request> Service<Request> for WindowLimit<S>
where
    S: Service<Request> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<CrateError>,
    Request: Send + 'static,
{
    type Response = S::Response;
    type Error = CrateError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // Keep the instance that was driven to readiness for this request.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let limiter = Arc::clone(&self.limiter);

        Box::pin(async move {
            limiter.acquire().await?;
            let response = inner.call(request).await.map_err(Into::<CrateError>::into)?;
            Ok::<_, CrateError>(response)
        })
    }
}
