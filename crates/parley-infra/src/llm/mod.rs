//! Inference provider implementations.
//!
//! [`create_backend`] turns the inference config into the boxed backend the
//! session layer calls for every reply.

pub mod openrouter;

use std::time::Duration;

use parley_core::inference::{BoxInferenceBackend, FallbackBackend, OfflineResponder};
use parley_types::config::{InferenceConfig, InferenceProviderKind};
use secrecy::SecretString;

use self::openrouter::OpenRouterBackend;

/// Share of the session's inference timeout the primary provider gets when
/// an offline fallback is configured, so the fallback answers before the
/// session gives up.
const FALLBACK_PRIMARY_SHARE: f64 = 0.8;

/// Build the reply backend described by `config`.
///
/// - `offline` always uses the pattern responder.
/// - `openrouter` without an API key logs a warning and uses the pattern
///   responder.
/// - `openrouter` with `offline_fallback` answers provider failures from the
///   pattern responder instead of surfacing them.
pub fn create_backend(config: &InferenceConfig, api_key: Option<&SecretString>) -> BoxInferenceBackend {
    match (config.provider, api_key) {
        (InferenceProviderKind::Offline, _) => BoxInferenceBackend::new(OfflineResponder::new()),
        (InferenceProviderKind::OpenRouter, None) => {
            tracing::warn!(
                env = %config.api_key_env,
                "no API key set, replies come from the offline responder"
            );
            BoxInferenceBackend::new(OfflineResponder::new())
        }
        (InferenceProviderKind::OpenRouter, Some(key)) => {
            let primary = BoxInferenceBackend::new(OpenRouterBackend::new(key, config));
            if config.offline_fallback {
                let budget =
                    Duration::from_secs(config.timeout_secs).mul_f64(FALLBACK_PRIMARY_SHARE);
                BoxInferenceBackend::new(FallbackBackend::new(primary, budget))
            } else {
                primary
            }
        }
    }
}
