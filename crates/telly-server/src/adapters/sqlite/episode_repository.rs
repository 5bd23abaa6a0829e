//! SQLite implementation of EpisodeRepository

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use telly::{DomainError, Episode, EpisodeRepository};

use super::{from_json, repo_err, to_json};

/// SQLite implementation of EpisodeRepository
///
/// The event log is stored as a JSON body next to the columns used for
/// lookups.
pub struct SqliteEpisodeRepository {
    pool: SqlitePool,
}

impl SqliteEpisodeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct EpisodeRow {
    body: String,
}

impl TryFrom<EpisodeRow> for Episode {
    type Error = DomainError;

    fn try_from(row: EpisodeRow) -> Result<Self, Self::Error> {
        from_json(&row.body)
    }
}

#[async_trait]
impl EpisodeRepository for SqliteEpisodeRepository {
    async fn save(&self, episode: &Episode) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO episodes (id, session_id, status, start_time, last_event_at, body)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                last_event_at = excluded.last_event_at,
                body = excluded.body
            "#,
        )
        .bind(episode.id.to_string())
        .bind(&episode.session_id)
        .bind(episode.status.to_string())
        .bind(episode.start_time)
        .bind(episode.last_event_at)
        .bind(to_json(episode)?)
        .execute(&self.pool)
        .await
        .map_err(repo_err)?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Episode>, DomainError> {
        let row = sqlx::query_as::<_, EpisodeRow>("SELECT body FROM episodes WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(repo_err)?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Episode>, DomainError> {
        let rows = sqlx::query_as::<_, EpisodeRow>("SELECT body FROM episodes ORDER BY start_time")
            .fetch_all(&self.pool)
            .await
            .map_err(repo_err)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Vec<Episode>, DomainError> {
        let rows = sqlx::query_as::<_, EpisodeRow>(
            "SELECT body FROM episodes WHERE session_id = ?1 ORDER BY start_time",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(repo_err)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
