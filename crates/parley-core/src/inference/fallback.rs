//! Primary backend with an offline safety net.
//!
//! Provider failures (and a primary that exceeds its own deadline) are
//! answered by the `OfflineResponder` instead of surfacing as errors.

use std::time::Duration;

use parley_types::inference::{InferenceError, InferenceRequest};

use super::backend::InferenceBackend;
use super::box_backend::BoxInferenceBackend;
use super::offline::OfflineResponder;

pub struct FallbackBackend {
    primary: BoxInferenceBackend,
    fallback: OfflineResponder,
    primary_timeout: Duration,
}

impl FallbackBackend {
    pub fn new(primary: BoxInferenceBackend, primary_timeout: Duration) -> Self {
        Self {
            primary,
            fallback: OfflineResponder::new(),
            primary_timeout,
        }
    }
}

impl InferenceBackend for FallbackBackend {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn generate(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        let error = match tokio::time::timeout(self.primary_timeout, self.primary.generate(request))
            .await
        {
            Ok(Ok(reply)) => return Ok(reply),
            Ok(Err(e)) => e,
            Err(_) => InferenceError::Timeout(self.primary_timeout.as_secs()),
        };
        tracing::warn!(
            backend = self.primary.name(),
            error = %error,
            "primary inference failed, answering offline"
        );
        Ok(self.fallback.respond(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;
    use parley_types::language::Language;

    fn request() -> InferenceRequest {
        InferenceRequest {
            text: "hello".to_string(),
            language: Language::En,
            web_search_enabled: false,
        }
    }

    #[tokio::test]
    async fn test_primary_success_passes_through() {
        let backend = FallbackBackend::new(
            BoxInferenceBackend::new(ScriptedBackend::reply("from primary")),
            Duration::from_secs(1),
        );
        assert_eq!(backend.generate(&request()).await.unwrap(), "from primary");
        assert_eq!(InferenceBackend::name(&backend), "scripted");
    }

    #[tokio::test]
    async fn test_primary_failure_answers_offline() {
        let backend = FallbackBackend::new(
            BoxInferenceBackend::new(ScriptedBackend::failing()),
            Duration::from_secs(1),
        );
        let reply = backend.generate(&request()).await.unwrap();
        assert_eq!(reply, OfflineResponder::new().respond(&request()));
    }

    #[tokio::test]
    async fn test_slow_primary_answers_offline() {
        let backend = FallbackBackend::new(
            BoxInferenceBackend::new(ScriptedBackend::slow(Duration::from_secs(5))),
            Duration::from_millis(20),
        );
        let reply = backend.generate(&request()).await.unwrap();
        assert!(reply.starts_with("H"));
    }
}
