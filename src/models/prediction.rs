//! Prediction log model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// One served prediction, as persisted by the audit sink
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PredictionLog {
    pub id: i64,
    pub url: String,
    pub malicious: bool,
    pub malicious_prob: f64,
    pub model_version: String,
    pub created_at: DateTime<Utc>,
}

/// Row about to be written by the audit sink
#[derive(Debug, Clone)]
pub struct NewPredictionLog {
    pub url: String,
    pub malicious: bool,
    pub malicious_prob: f64,
    pub model_version: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct PredictionLogFilter {
    pub malicious: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl NewPredictionLog {
    pub async fn insert(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO prediction_log (url, malicious, malicious_prob, model_version)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&self.url)
        .bind(self.malicious)
        .bind(self.malicious_prob)
        .bind(&self.model_version)
        .execute(pool)
        .await?;

        Ok(())
    }
}

impl PredictionLog {
    pub async fn list(pool: &PgPool, filter: PredictionLogFilter) -> Result<Vec<Self>, sqlx::Error> {
        let limit = filter.limit.unwrap_or(50).clamp(1, 500);
        let offset = filter.offset.unwrap_or(0).max(0);

        match filter.malicious {
            Some(malicious) => {
                sqlx::query_as::<_, PredictionLog>(
                    r#"
                    SELECT * FROM prediction_log
                    WHERE malicious = $1
                    ORDER BY created_at DESC
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(malicious)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, PredictionLog>(
                    r#"
                    SELECT * FROM prediction_log
                    ORDER BY created_at DESC
                    LIMIT $1 OFFSET $2
                    "#,
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await
            }
        }
    }
}
