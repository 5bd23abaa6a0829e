//! SQLite implementation of MemoryRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use telly::{DomainError, MemoryItem, MemoryRepository};

use super::{from_json, repo_err, to_json};

/// SQLite implementation of MemoryRepository
pub struct SqliteMemoryRepository {
    pool: SqlitePool,
}

impl SqliteMemoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct MemoryRow {
    id: String,
    session_id: Option<String>,
    content: String,
    embedding: String,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    access_count: i64,
    tags: String,
    emotion_tag: Option<String>,
    priority: String,
    source: String,
}

impl TryFrom<MemoryRow> for MemoryItem {
    type Error = DomainError;

    fn try_from(row: MemoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            session_id: row.session_id,
            content: row.content,
            embedding: from_json(&row.embedding)?,
            created_at: row.created_at,
            last_accessed_at: row.last_accessed_at,
            access_count: u32::try_from(row.access_count.max(0)).unwrap_or(u32::MAX),
            tags: from_json(&row.tags)?,
            emotion_tag: row.emotion_tag,
            priority: row.priority.parse().unwrap_or_default(),
            source: row.source.parse().unwrap_or_default(),
        })
    }
}

#[async_trait]
impl MemoryRepository for SqliteMemoryRepository {
    async fn upsert(&self, item: &MemoryItem) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO memories (id, session_id, content, embedding, created_at,
                                  last_accessed_at, access_count, tags, emotion_tag,
                                  priority, source)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                session_id = excluded.session_id,
                content = excluded.content,
                embedding = excluded.embedding,
                last_accessed_at = excluded.last_accessed_at,
                access_count = excluded.access_count,
                tags = excluded.tags,
                emotion_tag = excluded.emotion_tag,
                priority = excluded.priority,
                source = excluded.source
            "#,
        )
        .bind(&item.id)
        .bind(&item.session_id)
        .bind(&item.content)
        .bind(to_json(&item.embedding)?)
        .bind(item.created_at)
        .bind(item.last_accessed_at)
        .bind(i64::from(item.access_count))
        .bind(to_json(&item.tags)?)
        .bind(&item.emotion_tag)
        .bind(item.priority.to_string())
        .bind(item.source.to_string())
        .execute(&self.pool)
        .await
        .map_err(repo_err)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<MemoryItem>, DomainError> {
        let row = sqlx::query_as::<_, MemoryRow>("SELECT * FROM memories WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(repo_err)?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_all(&self) -> Result<Vec<MemoryItem>, DomainError> {
        let rows = sqlx::query_as::<_, MemoryRow>("SELECT * FROM memories ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(repo_err)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM memories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(repo_err)?;

        Ok(result.rows_affected() > 0)
    }
}
