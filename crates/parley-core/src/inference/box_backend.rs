//! BoxInferenceBackend -- object-safe dynamic dispatch wrapper for InferenceBackend.
//!
//! 1. `InferenceBackendDyn` is the object-safe twin with a boxed future
//! 2. Blanket impl for every `T: InferenceBackend`
//! 3. `BoxInferenceBackend` wraps `Box<dyn InferenceBackendDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use parley_types::inference::{InferenceError, InferenceRequest};

use super::backend::InferenceBackend;

/// Object-safe version of [`InferenceBackend`] with boxed futures.
pub trait InferenceBackendDyn: Send + Sync {
    fn name(&self) -> &str;

    fn generate_boxed<'a>(
        &'a self,
        request: &'a InferenceRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, InferenceError>> + Send + 'a>>;
}

impl<T: InferenceBackend> InferenceBackendDyn for T {
    fn name(&self) -> &str {
        InferenceBackend::name(self)
    }

    fn generate_boxed<'a>(
        &'a self,
        request: &'a InferenceRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, InferenceError>> + Send + 'a>> {
        Box::pin(self.generate(request))
    }
}

/// Type-erased inference backend, selected at startup from configuration.
pub struct BoxInferenceBackend {
    inner: Box<dyn InferenceBackendDyn + Send + Sync>,
}

impl BoxInferenceBackend {
    pub fn new<T: InferenceBackend + 'static>(backend: T) -> Self {
        Self {
            inner: Box::new(backend),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn generate(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        self.inner.generate_boxed(request).await
    }
}

impl std::fmt::Debug for BoxInferenceBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxInferenceBackend")
            .field("name", &self.name())
            .finish()
    }
}
