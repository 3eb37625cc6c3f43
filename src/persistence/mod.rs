// src/persistence/mod.rs
// Chat persistence adapter (spec.md §3 "external persisted state", §6).
// Schema ownership stays with this external collaborator per spec.md §1;
// this is a minimal sqlite-backed implementation satisfying the contract
// named by the spec, not a feature the core depends on at runtime beyond
// `onFinish` and chat lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::agent::{ChatMessage, MessageRole};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn create_chat(&self, user_id: &str, title: &str) -> anyhow::Result<Chat>;
    async fn get_chat(&self, chat_id: Uuid, user_id: &str) -> anyhow::Result<Option<Chat>>;
    async fn delete_chat(&self, chat_id: Uuid, user_id: &str) -> anyhow::Result<bool>;
    async fn list_messages(&self, chat_id: Uuid) -> anyhow::Result<Vec<ChatMessage>>;
    async fn append_message(&self, chat_id: Uuid, role: MessageRole, content: &str) -> anyhow::Result<ChatMessage>;
}

pub struct SqliteChatStore {
    pool: SqlitePool,
}

impl SqliteChatStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chats (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                chat_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }

    fn role_str(role: MessageRole) -> &'static str {
        match role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }

    fn role_from_str(s: &str) -> MessageRole {
        match s {
            "assistant" => MessageRole::Assistant,
            "system" => MessageRole::System,
            _ => MessageRole::User,
        }
    }
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn create_chat(&self, user_id: &str, title: &str) -> anyhow::Result<Chat> {
        let chat = Chat {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        sqlx::query("INSERT INTO chats (id, user_id, title, created_at, updated_at) VALUES (?, ?, ?, ?, ?)")
            .bind(chat.id.to_string())
            .bind(&chat.user_id)
            .bind(&chat.title)
            .bind(chat.created_at.to_rfc3339())
            .bind(chat.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(chat)
    }

    async fn get_chat(&self, chat_id: Uuid, user_id: &str) -> anyhow::Result<Option<Chat>> {
        let row: Option<(String, String, String, String, String)> = sqlx::query_as(
            "SELECT id, user_id, title, created_at, updated_at FROM chats WHERE id = ? AND user_id = ?",
        )
        .bind(chat_id.to_string())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, user_id, title, created_at, updated_at)| Chat {
            id: Uuid::parse_str(&id).unwrap_or_default(),
            user_id,
            title,
            created_at: DateTime::parse_from_rfc3339(&created_at).unwrap().with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_at).unwrap().with_timezone(&Utc),
        }))
    }

    async fn delete_chat(&self, chat_id: Uuid, user_id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM chats WHERE id = ? AND user_id = ?")
            .bind(chat_id.to_string())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() > 0 {
            sqlx::query("DELETE FROM messages WHERE chat_id = ?")
                .bind(chat_id.to_string())
                .execute(&self.pool)
                .await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn list_messages(&self, chat_id: Uuid) -> anyhow::Result<Vec<ChatMessage>> {
        let rows: Vec<(String, String, String)> =
            sqlx::query_as("SELECT id, role, content FROM messages WHERE chat_id = ? ORDER BY created_at ASC")
                .bind(chat_id.to_string())
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, role, content)| ChatMessage {
                id: Uuid::parse_str(&id).unwrap_or_default(),
                role: Self::role_from_str(&role),
                content,
            })
            .collect())
    }

    async fn append_message(&self, chat_id: Uuid, role: MessageRole, content: &str) -> anyhow::Result<ChatMessage> {
        let message = ChatMessage {
            id: Uuid::new_v4(),
            role,
            content: content.to_string(),
        };
        sqlx::query("INSERT INTO messages (id, chat_id, role, content, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(message.id.to_string())
            .bind(chat_id.to_string())
            .bind(Self::role_str(role))
            .bind(&message.content)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        sqlx::query("UPDATE chats SET updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(chat_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(message)
    }
}

/// In-process double for `ChatStore`, used by the integration-test harness.
pub mod test_support {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryChatStore {
        chats: Mutex<HashMap<Uuid, Chat>>,
        messages: Mutex<HashMap<Uuid, Vec<ChatMessage>>>,
    }

    impl InMemoryChatStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl ChatStore for InMemoryChatStore {
        async fn create_chat(&self, user_id: &str, title: &str) -> anyhow::Result<Chat> {
            let chat = Chat {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                title: title.to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.chats.lock().unwrap().insert(chat.id, chat.clone());
            Ok(chat)
        }

        async fn get_chat(&self, chat_id: Uuid, user_id: &str) -> anyhow::Result<Option<Chat>> {
            Ok(self
                .chats
                .lock()
                .unwrap()
                .get(&chat_id)
                .filter(|c| c.user_id == user_id)
                .cloned())
        }

        async fn delete_chat(&self, chat_id: Uuid, user_id: &str) -> anyhow::Result<bool> {
            let mut chats = self.chats.lock().unwrap();
            let owned = chats.get(&chat_id).map(|c| c.user_id == user_id).unwrap_or(false);
            if owned {
                chats.remove(&chat_id);
                self.messages.lock().unwrap().remove(&chat_id);
            }
            Ok(owned)
        }

        async fn list_messages(&self, chat_id: Uuid) -> anyhow::Result<Vec<ChatMessage>> {
            Ok(self.messages.lock().unwrap().get(&chat_id).cloned().unwrap_or_default())
        }

        async fn append_message(&self, chat_id: Uuid, role: MessageRole, content: &str) -> anyhow::Result<ChatMessage> {
            let message = ChatMessage {
                id: Uuid::new_v4(),
                role,
                content: content.to_string(),
            };
            self.messages
                .lock()
                .unwrap()
                .entry(chat_id)
                .or_default()
                .push(message.clone());
            Ok(message)
        }
    }
}
