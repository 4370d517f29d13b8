//! InferenceBackend trait definition.

use parley_types::inference::{InferenceError, InferenceRequest};

/// Generates an assistant reply for processed user text.
///
/// Implementations report provider failures and empty or malformed output as
/// errors. They do not enforce a deadline; the session layer wraps every call
/// in a timeout.
pub trait InferenceBackend: Send + Sync {
    /// Short backend name for logs and status output.
    fn name(&self) -> &str;

    fn generate(
        &self,
        request: &InferenceRequest,
    ) -> impl std::future::Future<Output = Result<String, InferenceError>> + Send;
}
