//! SQLite chat repository implementation.
//!
//! Implements `ChatRepository` from `parley-core` with raw sqlx queries,
//! private Row structs, and the split reader/writer pool. Arrival order of
//! messages and translations is the table's rowid, which only grows.

use chrono::{DateTime, SecondsFormat, Utc};
use parley_core::chat::repository::ChatRepository;
use parley_types::chat::{
    ChatMessage, ChatStats, ConversationSummary, ReactionKind, Thread, TranslationRecord, User,
};
use parley_types::error::RepositoryError;
use parley_types::language::Language;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// Message columns plus reaction tallies and the viewer's own reaction.
/// The first bind parameter is the viewer id (NULL for none).
const MESSAGE_SELECT: &str = r#"SELECT m.id, m.conversation_id, m.role, m.content, m.created_at, m.updated_at,
       (SELECT COUNT(*) FROM reactions r WHERE r.message_id = m.id AND r.kind = 'like') AS likes,
       (SELECT COUNT(*) FROM reactions r WHERE r.message_id = m.id AND r.kind = 'dislike') AS dislikes,
       (SELECT r.kind FROM reactions r WHERE r.message_id = m.id AND r.user_id = ?) AS user_reaction
  FROM messages m"#;

/// SQLite-backed implementation of `ChatRepository`.
pub struct SqliteChatRepository {
    pool: DatabasePool,
}

impl SqliteChatRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn fetch_message(
        &self,
        pool: &SqlitePool,
        message_id: &Uuid,
        viewer: Option<&Uuid>,
    ) -> Result<Option<ChatMessage>, RepositoryError> {
        let sql = format!("{MESSAGE_SELECT} WHERE m.id = ?");
        let row = sqlx::query(&sql)
            .bind(viewer.map(Uuid::to_string))
            .bind(message_id.to_string())
            .fetch_optional(pool)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| {
            MessageRow::from_row(&row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_message()
        })
        .transpose()
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct MessageRow {
    id: String,
    conversation_id: String,
    role: String,
    content: String,
    created_at: String,
    updated_at: String,
    likes: i64,
    dislikes: i64,
    user_reaction: Option<String>,
}

impl MessageRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            likes: row.try_get("likes")?,
            dislikes: row.try_get("dislikes")?,
            user_reaction: row.try_get("user_reaction")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        Ok(ChatMessage {
            id: parse_uuid(&self.id, "message id")?,
            conversation_id: parse_uuid(&self.conversation_id, "conversation_id")?,
            role: self.role.parse().map_err(RepositoryError::Query)?,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
            likes: self.likes as u32,
            dislikes: self.dislikes as u32,
            user_reaction: self
                .user_reaction
                .as_deref()
                .map(str::parse::<ReactionKind>)
                .transpose()
                .map_err(RepositoryError::Query)?,
        })
    }
}

struct ThreadRow {
    id: String,
    user_id: String,
    title: String,
    language: String,
    web_search_enabled: bool,
    created_at: String,
    updated_at: String,
}

impl ThreadRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            language: row.try_get("language")?,
            web_search_enabled: row.try_get("web_search_enabled")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_thread(self) -> Result<Thread, RepositoryError> {
        Ok(Thread {
            id: parse_uuid(&self.id, "thread id")?,
            user_id: parse_uuid(&self.user_id, "user_id")?,
            title: self.title,
            language: parse_language(&self.language)?,
            web_search_enabled: self.web_search_enabled,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

struct TranslationRow {
    id: String,
    message_id: String,
    conversation_id: String,
    original_text: String,
    translated_text: String,
    source_language: String,
    target_language: String,
    created_at: String,
}

impl TranslationRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            message_id: row.try_get("message_id")?,
            conversation_id: row.try_get("conversation_id")?,
            original_text: row.try_get("original_text")?,
            translated_text: row.try_get("translated_text")?,
            source_language: row.try_get("source_language")?,
            target_language: row.try_get("target_language")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_record(self) -> Result<TranslationRecord, RepositoryError> {
        Ok(TranslationRecord {
            id: parse_uuid(&self.id, "translation id")?,
            message_id: parse_uuid(&self.message_id, "message_id")?,
            conversation_id: parse_uuid(&self.conversation_id, "conversation_id")?,
            original_text: self.original_text,
            translated_text: self.translated_text,
            source_language: parse_language(&self.source_language)?,
            target_language: parse_language(&self.target_language)?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

struct UserRow {
    id: String,
    display_name: String,
    preferred_language: String,
    created_at: String,
}

impl UserRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            display_name: row.try_get("display_name")?,
            preferred_language: row.try_get("preferred_language")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_user(self) -> Result<User, RepositoryError> {
        Ok(User {
            id: parse_uuid(&self.id, "user id")?,
            display_name: self.display_name,
            preferred_language: parse_language(&self.preferred_language)?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str, what: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(|e| RepositoryError::Query(format!("invalid {what}: {e}")))
}

fn parse_language(s: &str) -> Result<Language, RepositoryError> {
    s.parse().map_err(RepositoryError::Query)
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width RFC 3339 so `ORDER BY` on the text column is chronological.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn rows_to_messages(rows: &[SqliteRow]) -> Result<Vec<ChatMessage>, RepositoryError> {
    let mut messages = Vec::with_capacity(rows.len());
    for row in rows {
        let msg_row = MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
        messages.push(msg_row.into_message()?);
    }
    Ok(messages)
}

fn count(row: &SqliteRow, column: &str) -> Result<u64, RepositoryError> {
    let value: i64 = row
        .try_get(column)
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    Ok(value as u64)
}

// ---------------------------------------------------------------------------
// ChatRepository implementation
// ---------------------------------------------------------------------------

impl ChatRepository for SqliteChatRepository {
    async fn create_message(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO messages (id, conversation_id, role, content, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(message.conversation_id.to_string())
        .bind(message.role.to_string())
        .bind(&message.content)
        .bind(format_datetime(&message.created_at))
        .bind(format_datetime(&message.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn update_message(
        &self,
        message_id: &Uuid,
        content: &str,
    ) -> Result<ChatMessage, RepositoryError> {
        let result = sqlx::query("UPDATE messages SET content = ?, updated_at = ? WHERE id = ?")
            .bind(content)
            .bind(format_datetime(&Utc::now()))
            .bind(message_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.fetch_message(&self.pool.writer, message_id, None)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_message(&self, message_id: &Uuid) -> Result<(), RepositoryError> {
        // Reactions and translations go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(message_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn get_messages(
        &self,
        conversation_id: &Uuid,
        viewer: Option<&Uuid>,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let sql = format!("{MESSAGE_SELECT} WHERE m.conversation_id = ? ORDER BY m.rowid ASC");
        let rows = sqlx::query(&sql)
            .bind(viewer.map(Uuid::to_string))
            .bind(conversation_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows_to_messages(&rows)
    }

    async fn get_message(
        &self,
        message_id: &Uuid,
        viewer: Option<&Uuid>,
    ) -> Result<Option<ChatMessage>, RepositoryError> {
        self.fetch_message(&self.pool.reader, message_id, viewer).await
    }

    async fn get_last_assistant_message(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ChatMessage>, RepositoryError> {
        let sql = format!(
            "{MESSAGE_SELECT} WHERE m.conversation_id = ? AND m.role = 'assistant' ORDER BY m.rowid DESC LIMIT 1"
        );
        let rows = sqlx::query(&sql)
            .bind(None::<String>)
            .bind(conversation_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(rows_to_messages(&rows)?.into_iter().next())
    }

    async fn save_translation(&self, record: &TranslationRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO translations (id, message_id, conversation_id, original_text, translated_text, source_language, target_language, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.id.to_string())
        .bind(record.message_id.to_string())
        .bind(record.conversation_id.to_string())
        .bind(&record.original_text)
        .bind(&record.translated_text)
        .bind(record.source_language.code())
        .bind(record.target_language.code())
        .bind(format_datetime(&record.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_translations(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<TranslationRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM translations WHERE conversation_id = ? ORDER BY rowid ASC",
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let translation_row =
                TranslationRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            records.push(translation_row.into_record()?);
        }
        Ok(records)
    }

    async fn upsert_summary(&self, summary: &ConversationSummary) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO thread_summaries (conversation_id, summary, message_count, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(conversation_id) DO UPDATE SET
                   summary = excluded.summary,
                   message_count = excluded.message_count,
                   updated_at = excluded.updated_at"#,
        )
        .bind(summary.conversation_id.to_string())
        .bind(&summary.summary)
        .bind(summary.message_count as i64)
        .bind(format_datetime(&summary.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_summary(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationSummary>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM thread_summaries WHERE conversation_id = ?")
            .bind(conversation_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let summary: String = row
            .try_get("summary")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let updated_at: String = row
            .try_get("updated_at")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(Some(ConversationSummary {
            conversation_id: *conversation_id,
            summary,
            message_count: count(&row, "message_count")? as u32,
            updated_at: parse_datetime(&updated_at)?,
        }))
    }

    async fn create_thread(&self, thread: &Thread) -> Result<Thread, RepositoryError> {
        let result = sqlx::query(
            r#"INSERT INTO threads (id, user_id, title, language, web_search_enabled, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(thread.id.to_string())
        .bind(thread.user_id.to_string())
        .bind(&thread.title)
        .bind(thread.language.code())
        .bind(thread.web_search_enabled)
        .bind(format_datetime(&thread.created_at))
        .bind(format_datetime(&thread.updated_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(thread.clone()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                RepositoryError::Conflict(format!("thread '{}' already exists", thread.id)),
            ),
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }

    async fn get_thread(&self, conversation_id: &Uuid) -> Result<Option<Thread>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM threads WHERE id = ?")
            .bind(conversation_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let thread_row =
                    ThreadRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(thread_row.into_thread()?))
            }
            None => Ok(None),
        }
    }

    async fn list_threads(&self, user_id: &Uuid) -> Result<Vec<Thread>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM threads WHERE user_id = ? ORDER BY updated_at DESC, rowid DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut threads = Vec::with_capacity(rows.len());
        for row in &rows {
            let thread_row =
                ThreadRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            threads.push(thread_row.into_thread()?);
        }
        Ok(threads)
    }

    async fn rename_thread(&self, conversation_id: &Uuid, title: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE threads SET title = ?, updated_at = ? WHERE id = ?")
            .bind(title)
            .bind(format_datetime(&Utc::now()))
            .bind(conversation_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_web_search(&self, conversation_id: &Uuid, enabled: bool) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE threads SET web_search_enabled = ?, updated_at = ? WHERE id = ?")
                .bind(enabled)
                .bind(format_datetime(&Utc::now()))
                .bind(conversation_id.to_string())
                .execute(&self.pool.writer)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_thread_language(
        &self,
        conversation_id: &Uuid,
        language: Language,
    ) -> Result<bool, RepositoryError> {
        let id = conversation_id.to_string();
        let result = sqlx::query(
            r#"UPDATE threads
               SET language = ?, updated_at = ?
               WHERE id = ?
                 AND NOT EXISTS (
                     SELECT 1 FROM messages WHERE conversation_id = ? AND role = 'user'
                 )"#,
        )
        .bind(language.code())
        .bind(format_datetime(&Utc::now()))
        .bind(&id)
        .bind(&id)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Nothing changed: either the thread is gone or it is locked.
        let exists = sqlx::query("SELECT 1 FROM threads WHERE id = ?")
            .bind(&id)
            .fetch_optional(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        match exists {
            Some(_) => Ok(false),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete_thread(&self, conversation_id: &Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM threads WHERE id = ?")
            .bind(conversation_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn touch_thread(&self, conversation_id: &Uuid) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE threads SET updated_at = ? WHERE id = ?")
            .bind(format_datetime(&Utc::now()))
            .bind(conversation_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_reaction(
        &self,
        message_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<ReactionKind>, RepositoryError> {
        let kind: Option<(String,)> =
            sqlx::query_as("SELECT kind FROM reactions WHERE message_id = ? AND user_id = ?")
                .bind(message_id.to_string())
                .bind(user_id.to_string())
                .fetch_optional(&self.pool.reader)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        kind.map(|(kind,)| kind.parse().map_err(RepositoryError::Query))
            .transpose()
    }

    async fn set_reaction(
        &self,
        message_id: &Uuid,
        user_id: &Uuid,
        reaction: Option<ReactionKind>,
    ) -> Result<(), RepositoryError> {
        let query = match reaction {
            Some(kind) => sqlx::query(
                r#"INSERT INTO reactions (message_id, user_id, kind, created_at)
                   VALUES (?, ?, ?, ?)
                   ON CONFLICT(message_id, user_id) DO UPDATE SET kind = excluded.kind"#,
            )
            .bind(message_id.to_string())
            .bind(user_id.to_string())
            .bind(kind.to_string())
            .bind(format_datetime(&Utc::now())),
            None => sqlx::query("DELETE FROM reactions WHERE message_id = ? AND user_id = ?")
                .bind(message_id.to_string())
                .bind(user_id.to_string()),
        };

        query
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_user(&self, user_id: &Uuid) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let user_row =
                    UserRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(user_row.into_user()?))
            }
            None => Ok(None),
        }
    }

    async fn upsert_user(&self, user: &User) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO users (id, display_name, preferred_language, created_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   display_name = excluded.display_name,
                   preferred_language = excluded.preferred_language"#,
        )
        .bind(user.id.to_string())
        .bind(&user.display_name)
        .bind(user.preferred_language.code())
        .bind(format_datetime(&user.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_stats(&self) -> Result<ChatStats, RepositoryError> {
        let row = sqlx::query(
            r#"SELECT (SELECT COUNT(*) FROM users) AS users,
                      (SELECT COUNT(*) FROM threads) AS threads,
                      (SELECT COUNT(*) FROM messages) AS messages,
                      (SELECT COUNT(*) FROM translations) AS translations"#,
        )
        .fetch_one(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(ChatStats {
            users: count(&row, "users")?,
            threads: count(&row, "threads")?,
            messages: count(&row, "messages")?,
            translations: count(&row, "translations")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::chat::MessageRole;

    async fn test_repo() -> (SqliteChatRepository, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("chat.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = DatabasePool::new(&url).await.unwrap();
        (SqliteChatRepository::new(pool), dir)
    }

    fn make_user(language: Language) -> User {
        User {
            id: Uuid::now_v7(),
            display_name: "tester".to_string(),
            preferred_language: language,
            created_at: Utc::now(),
        }
    }

    fn make_thread(user_id: Uuid, language: Language) -> Thread {
        let now = Utc::now();
        Thread {
            id: Uuid::now_v7(),
            user_id,
            title: "New Chat".to_string(),
            language,
            web_search_enabled: false,
            created_at: now,
            updated_at: now,
        }
    }

    async fn seeded(repo: &SqliteChatRepository, language: Language) -> (User, Thread) {
        let user = make_user(language);
        repo.upsert_user(&user).await.unwrap();
        let thread = repo.create_thread(&make_thread(user.id, language)).await.unwrap();
        (user, thread)
    }

    fn translation(message: &ChatMessage, original: &str, translated: &str) -> TranslationRecord {
        TranslationRecord {
            id: Uuid::now_v7(),
            message_id: message.id,
            conversation_id: message.conversation_id,
            original_text: original.to_string(),
            translated_text: translated.to_string(),
            source_language: Language::Si,
            target_language: Language::En,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_thread_round_trip_and_update() {
        let (repo, _dir) = test_repo().await;
        let (user, thread) = seeded(&repo, Language::Si).await;

        let loaded = repo.get_thread(&thread.id).await.unwrap().unwrap();
        assert_eq!(loaded.user_id, user.id);
        assert_eq!(loaded.language, Language::Si);
        assert!(!loaded.web_search_enabled);

        repo.rename_thread(&thread.id, "Cloud").await.unwrap();
        repo.set_web_search(&thread.id, true).await.unwrap();

        let reloaded = repo.get_thread(&thread.id).await.unwrap().unwrap();
        assert_eq!(reloaded.title, "Cloud");
        assert!(reloaded.web_search_enabled);
        assert_eq!(reloaded.language, Language::Si);

        let missing = Uuid::now_v7();
        assert!(matches!(
            repo.rename_thread(&missing, "Nope").await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            repo.set_web_search(&missing, true).await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            repo.set_thread_language(&missing, Language::En).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_setters_keep_both_changes() {
        let (repo, _dir) = test_repo().await;
        let (_user, thread) = seeded(&repo, Language::En).await;

        let (renamed, toggled) = tokio::join!(
            repo.rename_thread(&thread.id, "Billing"),
            repo.set_web_search(&thread.id, true),
        );
        renamed.unwrap();
        toggled.unwrap();

        let reloaded = repo.get_thread(&thread.id).await.unwrap().unwrap();
        assert_eq!(reloaded.title, "Billing");
        assert!(reloaded.web_search_enabled);
    }

    #[tokio::test]
    async fn test_language_change_refused_once_user_message_exists() {
        let (repo, _dir) = test_repo().await;
        let (_user, thread) = seeded(&repo, Language::Si).await;

        // Assistant messages alone do not lock the language.
        repo.create_message(&ChatMessage::new(thread.id, MessageRole::Assistant, "welcome"))
            .await
            .unwrap();
        assert!(repo.set_thread_language(&thread.id, Language::En).await.unwrap());
        assert!(repo.set_thread_language(&thread.id, Language::Si).await.unwrap());

        repo.create_message(&ChatMessage::new(thread.id, MessageRole::User, "ආයුබෝවන්"))
            .await
            .unwrap();
        assert!(!repo.set_thread_language(&thread.id, Language::En).await.unwrap());

        let reloaded = repo.get_thread(&thread.id).await.unwrap().unwrap();
        assert_eq!(reloaded.language, Language::Si);
    }

    #[tokio::test]
    async fn test_duplicate_thread_is_conflict() {
        let (repo, _dir) = test_repo().await;
        let (_user, thread) = seeded(&repo, Language::En).await;
        assert!(matches!(
            repo.create_thread(&thread).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_list_threads_most_recent_first() {
        let (repo, _dir) = test_repo().await;
        let (user, first) = seeded(&repo, Language::En).await;
        let second = repo
            .create_thread(&make_thread(user.id, Language::En))
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        repo.touch_thread(&first.id).await.unwrap();

        let listed = repo.list_threads(&user.id).await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert!(repo.list_threads(&Uuid::now_v7()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_messages_keep_arrival_order() {
        let (repo, _dir) = test_repo().await;
        let (_user, thread) = seeded(&repo, Language::En).await;

        let contents = ["one", "two", "three", "four"];
        for (i, content) in contents.iter().enumerate() {
            let role = if i % 2 == 0 {
                MessageRole::User
            } else {
                MessageRole::Assistant
            };
            repo.create_message(&ChatMessage::new(thread.id, role, *content))
                .await
                .unwrap();
        }

        let messages = repo.get_messages(&thread.id, None).await.unwrap();
        let got: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(got, contents);

        let last = repo.get_last_assistant_message(&thread.id).await.unwrap().unwrap();
        assert_eq!(last.content, "four");
    }

    #[tokio::test]
    async fn test_update_message_in_place() {
        let (repo, _dir) = test_repo().await;
        let (_user, thread) = seeded(&repo, Language::En).await;
        let message = ChatMessage::new(thread.id, MessageRole::User, "draft");
        repo.create_message(&message).await.unwrap();

        let updated = repo.update_message(&message.id, "final").await.unwrap();
        assert_eq!(updated.id, message.id);
        assert_eq!(updated.content, "final");
        assert!(updated.updated_at >= message.updated_at);

        let messages = repo.get_messages(&thread.id, None).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "final");

        assert!(matches!(
            repo.update_message(&Uuid::now_v7(), "x").await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_reaction_tallies_and_viewer() {
        let (repo, _dir) = test_repo().await;
        let (owner, thread) = seeded(&repo, Language::En).await;
        let other = Uuid::now_v7();
        let message = ChatMessage::new(thread.id, MessageRole::Assistant, "answer");
        repo.create_message(&message).await.unwrap();

        repo.set_reaction(&message.id, &owner.id, Some(ReactionKind::Like))
            .await
            .unwrap();
        repo.set_reaction(&message.id, &other, Some(ReactionKind::Dislike))
            .await
            .unwrap();

        let seen = repo.get_message(&message.id, Some(&owner.id)).await.unwrap().unwrap();
        assert_eq!((seen.likes, seen.dislikes), (1, 1));
        assert_eq!(seen.user_reaction, Some(ReactionKind::Like));

        let anonymous = repo.get_message(&message.id, None).await.unwrap().unwrap();
        assert_eq!(anonymous.user_reaction, None);

        // Switching replaces the previous reaction rather than adding one.
        repo.set_reaction(&message.id, &owner.id, Some(ReactionKind::Dislike))
            .await
            .unwrap();
        let seen = repo.get_message(&message.id, Some(&owner.id)).await.unwrap().unwrap();
        assert_eq!((seen.likes, seen.dislikes), (0, 2));

        repo.set_reaction(&message.id, &owner.id, None).await.unwrap();
        assert_eq!(repo.get_reaction(&message.id, &owner.id).await.unwrap(), None);
        assert_eq!(
            repo.get_reaction(&message.id, &other).await.unwrap(),
            Some(ReactionKind::Dislike)
        );
    }

    #[tokio::test]
    async fn test_delete_message_cascades() {
        let (repo, _dir) = test_repo().await;
        let (owner, thread) = seeded(&repo, Language::Si).await;
        let message = ChatMessage::new(thread.id, MessageRole::User, "ආයුබෝවන්");
        repo.create_message(&message).await.unwrap();
        repo.save_translation(&translation(&message, "ආයුබෝවන්", "hello"))
            .await
            .unwrap();
        repo.set_reaction(&message.id, &owner.id, Some(ReactionKind::Like))
            .await
            .unwrap();

        repo.delete_message(&message.id).await.unwrap();

        assert!(repo.get_message(&message.id, None).await.unwrap().is_none());
        assert!(repo.get_translations(&thread.id).await.unwrap().is_empty());
        assert_eq!(repo.get_reaction(&message.id, &owner.id).await.unwrap(), None);
        assert!(matches!(
            repo.delete_message(&message.id).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_translations_oldest_first() {
        let (repo, _dir) = test_repo().await;
        let (_owner, thread) = seeded(&repo, Language::Si).await;
        let message = ChatMessage::new(thread.id, MessageRole::User, "first");
        repo.create_message(&message).await.unwrap();

        repo.save_translation(&translation(&message, "first", "first-en"))
            .await
            .unwrap();
        repo.save_translation(&translation(&message, "edited", "edited-en"))
            .await
            .unwrap();

        let records = repo.get_translations(&thread.id).await.unwrap();
        let texts: Vec<&str> = records.iter().map(|r| r.translated_text.as_str()).collect();
        assert_eq!(texts, ["first-en", "edited-en"]);
        assert_eq!(records[0].source_language, Language::Si);
        assert_eq!(records[0].target_language, Language::En);
    }

    #[tokio::test]
    async fn test_summary_is_replaced_wholesale() {
        let (repo, _dir) = test_repo().await;
        let (_owner, thread) = seeded(&repo, Language::En).await;
        assert!(repo.get_summary(&thread.id).await.unwrap().is_none());

        for (text, count) in [("first", 2), ("second", 4)] {
            repo.upsert_summary(&ConversationSummary {
                conversation_id: thread.id,
                summary: text.to_string(),
                message_count: count,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
        }

        let summary = repo.get_summary(&thread.id).await.unwrap().unwrap();
        assert_eq!(summary.summary, "second");
        assert_eq!(summary.message_count, 4);
    }

    #[tokio::test]
    async fn test_delete_thread_removes_children() {
        let (repo, _dir) = test_repo().await;
        let (user, thread) = seeded(&repo, Language::En).await;
        let message = ChatMessage::new(thread.id, MessageRole::User, "hi");
        repo.create_message(&message).await.unwrap();
        repo.upsert_summary(&ConversationSummary {
            conversation_id: thread.id,
            summary: "hi".to_string(),
            message_count: 1,
            updated_at: Utc::now(),
        })
        .await
        .unwrap();

        repo.delete_thread(&thread.id).await.unwrap();

        assert!(repo.get_thread(&thread.id).await.unwrap().is_none());
        assert!(repo.get_messages(&thread.id, None).await.unwrap().is_empty());
        assert!(repo.get_summary(&thread.id).await.unwrap().is_none());
        assert!(repo.list_threads(&user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_upsert_and_stats() {
        let (repo, _dir) = test_repo().await;
        let mut user = make_user(Language::En);
        repo.upsert_user(&user).await.unwrap();
        user.preferred_language = Language::Si;
        repo.upsert_user(&user).await.unwrap();

        let loaded = repo.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(loaded.preferred_language, Language::Si);
        assert!(repo.get_user(&Uuid::now_v7()).await.unwrap().is_none());

        let thread = repo
            .create_thread(&make_thread(user.id, Language::Si))
            .await
            .unwrap();
        let message = ChatMessage::new(thread.id, MessageRole::User, "hi");
        repo.create_message(&message).await.unwrap();
        repo.save_translation(&translation(&message, "hi", "hi"))
            .await
            .unwrap();

        let stats = repo.get_stats().await.unwrap();
        assert_eq!(
            stats,
            ChatStats {
                users: 1,
                threads: 1,
                messages: 1,
                translations: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_thread_requires_existing_user() {
        let (repo, _dir) = test_repo().await;
        let orphan = make_thread(Uuid::now_v7(), Language::En);
        assert!(repo.create_thread(&orphan).await.is_err());
    }
}
