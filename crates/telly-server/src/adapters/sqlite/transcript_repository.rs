//! SQLite implementation of TranscriptRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use telly::{DomainError, TranscriptRecord, TranscriptRepository};

use super::{from_json, repo_err, to_json};

/// SQLite implementation of TranscriptRepository
pub struct SqliteTranscriptRepository {
    pool: SqlitePool,
}

impl SqliteTranscriptRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TranscriptRow {
    id: String,
    url: String,
    title: String,
    transcript_text: String,
    action_plan: String,
    summary: String,
    embedding: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TranscriptRow> for TranscriptRecord {
    type Error = DomainError;

    fn try_from(row: TranscriptRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&row.id).map_err(repo_err)?,
            url: row.url,
            title: row.title,
            transcript_text: row.transcript_text,
            action_plan: row.action_plan,
            summary: row.summary,
            embedding: from_json(&row.embedding)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl TranscriptRepository for SqliteTranscriptRepository {
    async fn save(&self, record: &TranscriptRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO transcripts (id, url, title, transcript_text, action_plan, summary,
                                     embedding, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                transcript_text = excluded.transcript_text,
                action_plan = excluded.action_plan,
                summary = excluded.summary,
                embedding = excluded.embedding,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.url)
        .bind(&record.title)
        .bind(&record.transcript_text)
        .bind(&record.action_plan)
        .bind(&record.summary)
        .bind(to_json(&record.embedding)?)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(repo_err)?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TranscriptRecord>, DomainError> {
        let row = sqlx::query_as::<_, TranscriptRow>("SELECT * FROM transcripts WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(repo_err)?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<TranscriptRecord>, DomainError> {
        let row = sqlx::query_as::<_, TranscriptRow>("SELECT * FROM transcripts WHERE url = ?1")
            .bind(url.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(repo_err)?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_all(&self) -> Result<Vec<TranscriptRecord>, DomainError> {
        let rows = sqlx::query_as::<_, TranscriptRow>("SELECT * FROM transcripts ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(repo_err)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<TranscriptRecord>, DomainError> {
        let rows = sqlx::query_as::<_, TranscriptRow>(
            "SELECT * FROM transcripts ORDER BY updated_at DESC LIMIT ?1",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(repo_err)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
