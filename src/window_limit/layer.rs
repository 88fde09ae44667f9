use std::sync::Arc;

use tower::Layer;

use super::{Limiter, service::WindowLimit};

/// Gates the wrapped service through a shared [`Limiter`].
///
/// Every service produced by this layer draws from the same windows, so clones and
/// separately built stacks stay within one quota.
#[derive(Clone, Debug)]
pub struct WindowLimitLayer {
    limiter: Arc<Limiter>,
}

impl WindowLimitLayer {
    pub const fn new(limiter: Arc<Limiter>) -> Self {
        Self { limiter }
    }
}

impl<S> Layer<S> for WindowLimitLayer {
    type Service = WindowLimit<S>;

    fn layer(&self, service: S) -> Self::Service {
        WindowLimit::new(service, Arc::clone(&self.limiter))
    }
}
