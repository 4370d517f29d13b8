//! Application state wiring all services together.
//!
//! Core services are generic over their ports; `AppState` pins them to the
//! SQLite repository, the lexicon translator, and the configured summarizer
//! and inference backend.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parley_core::chat::thread::ThreadService;
use parley_core::language::LexiconTranslator;
use parley_core::session::{RoomRegistry, SessionManager, SessionSettings};
use parley_infra::config::{load_global_config, resolve_api_key, resolve_data_dir};
use parley_infra::llm::create_backend;
use parley_infra::sqlite::chat::SqliteChatRepository;
use parley_infra::sqlite::pool::{DatabasePool, database_url};
use parley_infra::summary::ConfiguredSummarizer;
use parley_types::config::GlobalConfig;
use secrecy::SecretString;

pub type ConcreteSessionManager =
    SessionManager<SqliteChatRepository, LexiconTranslator, ConfiguredSummarizer>;

pub type ConcreteThreadService = ThreadService<SqliteChatRepository>;

/// Shared application state, used by the CLI and by every HTTP and
/// WebSocket handler.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<ConcreteSessionManager>,
    pub threads: Arc<ConcreteThreadService>,
    pub config: Arc<GlobalConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Resolve the data directory, load `config.toml`, and wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_global_config(&data_dir).await;
        let api_key = resolve_api_key(&config.inference);
        Self::build(data_dir, config, api_key.as_ref()).await
    }

    /// Wire services for an explicit data directory and config.
    pub async fn build(
        data_dir: PathBuf,
        config: GlobalConfig,
        api_key: Option<&SecretString>,
    ) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir).await?;

        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;
        let repo = Arc::new(SqliteChatRepository::new(db_pool.clone()));

        let summarizer = ConfiguredSummarizer::from_config(&config.summary, &config.inference, api_key);
        let backend = create_backend(&config.inference, api_key);
        tracing::info!(
            backend = backend.name(),
            summary_engine = ?summarizer.engine(),
            data_dir = %data_dir.display(),
            "services configured"
        );

        let settings = SessionSettings {
            inference_timeout: Duration::from_secs(config.inference.timeout_secs),
            summary_timeout: Duration::from_secs(config.summary.timeout_secs),
            apology_text: config.session.apology_text.clone(),
        };

        let sessions = SessionManager::new(
            repo.clone(),
            Arc::new(LexiconTranslator::new()),
            Arc::new(summarizer),
            backend,
            Arc::new(RoomRegistry::new()),
            settings,
        );

        let threads = ThreadService::new(repo).with_locks(sessions.conversation_locks());

        Ok(Self {
            sessions: Arc::new(sessions),
            threads: Arc::new(threads),
            config: Arc::new(config),
            data_dir,
            db_pool,
        })
    }
}
