//! Misclassification counts from PostgreSQL.
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::debug;

use retro_core::{CountError, Credential, MisclassificationSource};
use retro_model::Label;

use crate::ExecError;

/// Counts reviewed records whose confirmed value differs from the model prediction.
///
/// One aggregate query per label against `misclassified_complaints`.
#[derive(Clone)]
pub struct PgMisclassificationSource {
    pool: PgPool,
}

impl PgMisclassificationSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a pool that connects on first use.
    pub fn connect_lazy(database_url: &Credential) -> Result<Self, ExecError> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .connect_lazy(database_url.expose())
            .map_err(|e| ExecError::InvalidConfig(format!("database url: {e}")))?;
        Ok(Self { pool })
    }
}

/// Count query for `label`. Column names are fixed per label, never interpolated from input.
pub fn count_query(label: Label) -> &'static str {
    match label {
        Label::Department => {
            "SELECT COUNT(*) FROM misclassified_complaints mc \
             WHERE mc.reviewed = TRUE \
             AND mc.correct_department IS NOT NULL \
             AND mc.model_predicted_department IS DISTINCT FROM mc.correct_department"
        }
        Label::Urgency => {
            "SELECT COUNT(*) FROM misclassified_complaints mc \
             WHERE mc.reviewed = TRUE \
             AND mc.correct_urgency IS NOT NULL \
             AND mc.model_predicted_urgency IS DISTINCT FROM mc.correct_urgency"
        }
    }
}

#[async_trait]
impl MisclassificationSource for PgMisclassificationSource {
    async fn misclassified_count(&self, label: Label) -> Result<u64, CountError> {
        let count: i64 = sqlx::query_scalar(count_query(label))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CountError::Query {
                label,
                reason: e.to_string(),
            })?;
        debug!(%label, count, "misclassification count queried");
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_only_reviewed_disagreements() {
        for label in Label::ALL {
            let q = count_query(label);
            let col = label.as_str();
            assert!(q.contains("FROM misclassified_complaints"));
            assert!(q.contains("reviewed = TRUE"));
            assert!(q.contains(&format!("correct_{col} IS NOT NULL")));
            assert!(q.contains(&format!(
                "model_predicted_{col} IS DISTINCT FROM mc.correct_{col}"
            )));
        }
    }

    #[tokio::test]
    async fn invalid_url_is_a_config_error() {
        let res = PgMisclassificationSource::connect_lazy(&Credential::new("not a url"));
        assert!(matches!(res, Err(ExecError::InvalidConfig(_))));
    }
}
