//! Global configuration types for Parley.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! listener address, the inference provider, the summarizer, and session
//! behaviour.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::language::Language;

/// Top-level configuration for the Parley server.
///
/// Loaded from `~/.parley/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which inference backend generates replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceProviderKind {
    /// OpenRouter chat completions; falls back to offline when no key is set.
    #[default]
    OpenRouter,
    /// Deterministic pattern responder, no network.
    Offline,
}

impl fmt::Display for InferenceProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceProviderKind::OpenRouter => write!(f, "openrouter"),
            InferenceProviderKind::Offline => write!(f, "offline"),
        }
    }
}

/// Model settings used for one conversation language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.7
}

/// Per-language model profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfiles {
    #[serde(default = "default_en_profile")]
    pub en: ModelProfile,
    #[serde(default = "default_si_profile")]
    pub si: ModelProfile,
}

fn default_en_profile() -> ModelProfile {
    ModelProfile {
        model: "anthropic/claude-3-haiku".to_string(),
        max_tokens: default_max_tokens(),
        temperature: default_temperature(),
    }
}

fn default_si_profile() -> ModelProfile {
    ModelProfile {
        model: "meta-llama/llama-3.1-8b-instruct".to_string(),
        max_tokens: default_max_tokens(),
        temperature: default_temperature(),
    }
}

impl ModelProfiles {
    pub fn for_language(&self, language: Language) -> &ModelProfile {
        match language {
            Language::En => &self.en,
            Language::Si => &self.si,
        }
    }
}

impl Default for ModelProfiles {
    fn default() -> Self {
        Self {
            en: default_en_profile(),
            si: default_si_profile(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default)]
    pub provider: InferenceProviderKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Upper bound on one reply generation, enforced by the session layer.
    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,
    /// Answer from the offline responder when the provider call fails
    /// instead of sending the apology.
    #[serde(default)]
    pub offline_fallback: bool,
    #[serde(default)]
    pub models: ModelProfiles,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

fn default_inference_timeout() -> u64 {
    30
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            provider: InferenceProviderKind::default(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_inference_timeout(),
            offline_fallback: false,
            models: ModelProfiles::default(),
        }
    }
}

/// Which summarizer refreshes the rolling conversation summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryEngine {
    #[default]
    Extractive,
    Llm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default)]
    pub engine: SummaryEngine,
    /// Most recent history entries considered.
    #[serde(default = "default_summary_window")]
    pub window: usize,
    /// Upper bound on summary length, in characters.
    #[serde(default = "default_summary_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_summary_timeout")]
    pub timeout_secs: u64,
    /// Model used when `engine = "llm"`.
    #[serde(default = "default_summary_model")]
    pub model: String,
}

fn default_summary_window() -> usize {
    20
}

fn default_summary_max_chars() -> usize {
    600
}

fn default_summary_timeout() -> u64 {
    5
}

fn default_summary_model() -> String {
    "anthropic/claude-3-haiku".to_string()
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            engine: SummaryEngine::default(),
            window: default_summary_window(),
            max_chars: default_summary_max_chars(),
            timeout_secs: default_summary_timeout(),
            model: default_summary_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Assistant reply persisted when inference fails or times out.
    #[serde(default = "default_apology")]
    pub apology_text: String,
}

fn default_apology() -> String {
    "I apologize, but I encountered an error while processing your request. Please try again."
        .to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            apology_text: default_apology(),
        }
    }
}
