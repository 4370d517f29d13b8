//! OpenRouter chat-completions client and the reply backend built on it.
//!
//! OpenRouter speaks the OpenAI chat completions protocol, so requests go
//! through [`async_openai`] with the base URL pointed at OpenRouter. Each
//! conversation language has its own model profile and system prompt.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};
use parley_core::inference::InferenceBackend;
use parley_types::config::{InferenceConfig, ModelProfile, ModelProfiles};
use parley_types::inference::{InferenceError, InferenceRequest};
use parley_types::language::Language;
use secrecy::{ExposeSecret, SecretString};
use tracing::Instrument;

pub const PROVIDER_NAME: &str = "openrouter";

/// Thin wrapper over the async-openai client: one system prompt, one user
/// message, first choice back.
///
/// Does not derive Debug; the client holds the API key.
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client<OpenAIConfig>,
}

impl OpenRouterClient {
    pub fn new(api_key: &SecretString, base_url: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key.expose_secret())
            .with_api_base(base_url);
        Self {
            client: Client::with_config(config),
        }
    }

    /// Send a single-turn chat completion and return the reply text.
    pub async fn complete(
        &self,
        profile: &ModelProfile,
        system: &str,
        user: &str,
    ) -> Result<String, InferenceError> {
        let request = build_request(profile, system, user);

        let span = tracing::info_span!(
            "gen_ai.complete",
            gen_ai.system = PROVIDER_NAME,
            gen_ai.request.model = %profile.model,
            gen_ai.request.max_tokens = profile.max_tokens,
            gen_ai.request.temperature = profile.temperature,
        );

        let response = self
            .client
            .chat()
            .create(request)
            .instrument(span)
            .await
            .map_err(map_openai_error)?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                model = %response.model,
                input_tokens = usage.prompt_tokens,
                output_tokens = usage.completion_tokens,
                "completion received"
            );
        }

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let content = content.trim();
        if content.is_empty() {
            return Err(InferenceError::EmptyResponse);
        }
        Ok(content.to_string())
    }
}

fn build_request(profile: &ModelProfile, system: &str, user: &str) -> CreateChatCompletionRequest {
    let messages = vec![
        ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
            content: ChatCompletionRequestSystemMessageContent::Text(system.to_string()),
            name: None,
        }),
        ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(user.to_string()),
            name: None,
        }),
    ];

    CreateChatCompletionRequest {
        model: profile.model.clone(),
        messages,
        max_completion_tokens: Some(profile.max_tokens),
        temperature: Some(profile.temperature),
        ..Default::default()
    }
}

/// System prompt for a reply in `language`. The web-search sentence only
/// changes the wording; no search is performed.
pub fn system_prompt(language: Language, web_search_enabled: bool) -> String {
    match language {
        Language::En => {
            let capability = if web_search_enabled {
                "You have access to web search capabilities for real-time information."
            } else {
                "You provide responses based on your training data."
            };
            format!(
                "You are a helpful AI assistant. {capability} Provide clear, accurate, and helpful responses to user questions."
            )
        }
        Language::Si => {
            let capability = if web_search_enabled {
                "ඔබට තථ්‍ය කාලීන තොරතුරු සඳහා වෙබ් සෙවුම් හැකියාවන් ඇත."
            } else {
                "ඔබ ඔබේ පුහුණු දත්ත මත පදනම්ව පිළිතුරු සපයයි."
            };
            format!(
                "ඔබ ප්‍රයෝජනවත් AI සහායකයෙකි. {capability} පරිශීලක ප්‍රශ්නවලට පැහැදිලි, නිවැරදි සහ ප්‍රයෝජනවත් පිළිතුරු ලබා දෙන්න."
            )
        }
    }
}

/// Map an `async_openai` error to an [`InferenceError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> InferenceError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            if code == "invalid_api_key" || api_err.message.contains("No auth credentials") {
                InferenceError::MissingApiKey(PROVIDER_NAME.to_string())
            } else {
                InferenceError::Provider(api_err.message.clone())
            }
        }
        OpenAIError::JSONDeserialize(_, content) => {
            InferenceError::Malformed(format!("failed to parse response: {content}"))
        }
        OpenAIError::InvalidArgument(msg) => InferenceError::Provider(msg.clone()),
        _ => InferenceError::Provider(err.to_string()),
    }
}

/// Reply backend that answers in the thread's language via OpenRouter.
pub struct OpenRouterBackend {
    client: OpenRouterClient,
    models: ModelProfiles,
}

impl OpenRouterBackend {
    pub fn new(api_key: &SecretString, config: &InferenceConfig) -> Self {
        Self {
            client: OpenRouterClient::new(api_key, &config.base_url),
            models: config.models.clone(),
        }
    }

    pub fn client(&self) -> &OpenRouterClient {
        &self.client
    }
}

impl InferenceBackend for OpenRouterBackend {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn generate(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        let profile = self.models.for_language(request.language);
        let system = system_prompt(request.language, request.web_search_enabled);
        self.client.complete(profile, &system, &request.text).await
    }
}
