use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::str::FromStr;

use crate::board::{NormalizationRecord, Phase, ReviewRecord, RunRecords, SynthesisRecord};
use sdk::Memo;

/// Run status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Complete,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Complete => "complete",
            RunStatus::Failed => "failed",
        }
    }
}

impl FromStr for RunStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "running" => Ok(RunStatus::Running),
            "complete" => Ok(RunStatus::Complete),
            "failed" => Ok(RunStatus::Failed),
            other => Err(anyhow!("Unknown run status '{}'", other)),
        }
    }
}

/// Run record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRow {
    pub id: String,
    pub decision: String,
    pub memo_json: String,
    pub status: RunStatus,
    pub model: String,
    pub total_tokens: i64,
    pub failed_phase: Option<String>,
    pub failed_persona: Option<String>,
    pub error_message: Option<String>,
    pub duration_ms: Option<i64>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

const RUN_COLUMNS: &str = "id, decision, memo_json, status, model, total_tokens, failed_phase, \
     failed_persona, error_message, duration_ms, created_at, completed_at";

/// Repository for board runs and their phase rows
///
/// Phase rows are written only once a run is complete, in a single
/// transaction. A failed run keeps just its run row with the failure details.
pub struct RunRepository {
    pool: SqlitePool,
}

impl RunRepository {
    /// Create a new run repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a run in the `running` state
    pub async fn create_run(&self, id: &str, memo: &Memo, model: &str) -> Result<RunRow> {
        let now = chrono::Utc::now().timestamp();
        let memo_json = serde_json::to_string(memo).context("Failed to serialize memo")?;

        sqlx::query(
            "INSERT INTO runs (id, decision, memo_json, status, model, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&memo.decision_required)
        .bind(&memo_json)
        .bind(RunStatus::Running.as_str())
        .bind(model)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create run")?;

        Ok(RunRow {
            id: id.to_string(),
            decision: memo.decision_required.clone(),
            memo_json,
            status: RunStatus::Running,
            model: model.to_string(),
            total_tokens: 0,
            failed_phase: None,
            failed_persona: None,
            error_message: None,
            duration_ms: None,
            created_at: now,
            completed_at: None,
        })
    }

    /// Write every phase row and mark the run complete, atomically
    pub async fn record_completed(
        &self,
        run_id: &str,
        records: &RunRecords,
        duration_ms: i64,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let n = &records.normalization;
        sqlx::query(
            "INSERT INTO normalizations (run_id, persona_id, raw_text, response_id, tokens) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(run_id)
        .bind(&n.persona_id)
        .bind(&n.raw_text)
        .bind(&n.response_id)
        .bind(n.tokens as i64)
        .execute(&mut *tx)
        .await
        .context("Failed to insert normalization")?;

        for (order, r) in records.reviews.iter().enumerate() {
            sqlx::query(
                "INSERT INTO reviews (run_id, persona_id, review_order, position, reasons, risks, \
                 modifications, validation_metrics, confidence, structured, raw_text, response_id, tokens) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(run_id)
            .bind(&r.persona_id)
            .bind(order as i64)
            .bind(&r.position)
            .bind(encode_list(&r.reasons)?)
            .bind(encode_list(&r.risks)?)
            .bind(encode_list(&r.modifications)?)
            .bind(encode_list(&r.validation_metrics)?)
            .bind(&r.confidence)
            .bind(r.structured)
            .bind(&r.raw_text)
            .bind(&r.response_id)
            .bind(r.tokens as i64)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert review for '{}'", r.persona_id))?;
        }

        let s = &records.synthesis;
        sqlx::query(
            "INSERT INTO syntheses (run_id, persona_id, decision_statement, recommendation, position, \
             reasons, risks, modifications, validation_metrics, confidence, next_steps, \
             reasoning_summary, structured, raw_text, response_id, tokens) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(run_id)
        .bind(&s.persona_id)
        .bind(&s.decision_statement)
        .bind(&s.recommendation)
        .bind(&s.position)
        .bind(encode_list(&s.reasons)?)
        .bind(encode_list(&s.risks)?)
        .bind(encode_list(&s.modifications)?)
        .bind(encode_list(&s.validation_metrics)?)
        .bind(&s.confidence)
        .bind(encode_list(&s.next_steps)?)
        .bind(&s.reasoning_summary)
        .bind(s.structured)
        .bind(&s.raw_text)
        .bind(&s.response_id)
        .bind(s.tokens as i64)
        .execute(&mut *tx)
        .await
        .context("Failed to insert synthesis")?;

        sqlx::query(
            "UPDATE runs SET status = ?, total_tokens = ?, duration_ms = ?, completed_at = ? WHERE id = ?",
        )
        .bind(RunStatus::Complete.as_str())
        .bind(records.total_tokens as i64)
        .bind(duration_ms)
        .bind(now)
        .bind(run_id)
        .execute(&mut *tx)
        .await
        .context("Failed to complete run")?;

        tx.commit().await.context("Failed to commit run")?;

        tracing::debug!(run_id, reviews = records.reviews.len(), "Run persisted");
        Ok(())
    }

    /// Mark a run as failed in a board phase
    pub async fn mark_failed(
        &self,
        run_id: &str,
        phase: Phase,
        persona_id: &str,
        message: &str,
        duration_ms: i64,
    ) -> Result<()> {
        self.finish_failed(run_id, Some(phase.as_str()), Some(persona_id), message, duration_ms)
            .await
    }

    /// Mark a run as failed after the board finished but its outcome could
    /// not be stored
    pub async fn mark_persist_failed(
        &self,
        run_id: &str,
        message: &str,
        duration_ms: i64,
    ) -> Result<()> {
        self.finish_failed(run_id, None, None, message, duration_ms).await
    }

    async fn finish_failed(
        &self,
        run_id: &str,
        phase: Option<&str>,
        persona_id: Option<&str>,
        message: &str,
        duration_ms: i64,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            "UPDATE runs SET status = ?, failed_phase = ?, failed_persona = ?, error_message = ?, \
             duration_ms = ?, completed_at = ? WHERE id = ?",
        )
        .bind(RunStatus::Failed.as_str())
        .bind(phase)
        .bind(persona_id)
        .bind(message)
        .bind(duration_ms)
        .bind(now)
        .bind(run_id)
        .execute(&self.pool)
        .await
        .context("Failed to mark run as failed")?;

        Ok(())
    }

    /// Get a run by ID
    pub async fn get_run(&self, run_id: &str) -> Result<Option<RunRow>> {
        let row = sqlx::query(&format!("SELECT {} FROM runs WHERE id = ?", RUN_COLUMNS))
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch run")?;

        row.as_ref().map(run_from_row).transpose()
    }

    /// Get recent runs, newest first
    pub async fn get_recent_runs(&self, limit: i64) -> Result<Vec<RunRow>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM runs ORDER BY created_at DESC, rowid DESC LIMIT ?",
            RUN_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch recent runs")?;

        rows.iter().map(run_from_row).collect()
    }

    pub async fn get_normalization(&self, run_id: &str) -> Result<Option<NormalizationRecord>> {
        let row = sqlx::query(
            "SELECT persona_id, raw_text, response_id, tokens FROM normalizations WHERE run_id = ?",
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch normalization")?;

        Ok(row.map(|r| NormalizationRecord {
            persona_id: r.get("persona_id"),
            raw_text: r.get("raw_text"),
            response_id: r.get("response_id"),
            tokens: r.get::<i64, _>("tokens") as u64,
        }))
    }

    /// Reviews of a run in configured reviewer order
    pub async fn get_reviews(&self, run_id: &str) -> Result<Vec<ReviewRecord>> {
        let rows = sqlx::query(
            "SELECT persona_id, position, reasons, risks, modifications, validation_metrics, \
             confidence, structured, raw_text, response_id, tokens \
             FROM reviews WHERE run_id = ? ORDER BY review_order ASC",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch reviews")?;

        let mut reviews = Vec::with_capacity(rows.len());
        for r in rows {
            reviews.push(ReviewRecord {
                persona_id: r.get("persona_id"),
                position: r.get("position"),
                reasons: decode_list(&r, "reasons")?,
                risks: decode_list(&r, "risks")?,
                modifications: decode_list(&r, "modifications")?,
                validation_metrics: decode_list(&r, "validation_metrics")?,
                confidence: r.get("confidence"),
                structured: r.get("structured"),
                raw_text: r.get("raw_text"),
                response_id: r.get("response_id"),
                tokens: r.get::<i64, _>("tokens") as u64,
            });
        }

        Ok(reviews)
    }

    pub async fn get_synthesis(&self, run_id: &str) -> Result<Option<SynthesisRecord>> {
        let row = sqlx::query(
            "SELECT persona_id, decision_statement, recommendation, position, reasons, risks, \
             modifications, validation_metrics, confidence, next_steps, reasoning_summary, \
             structured, raw_text, response_id, tokens FROM syntheses WHERE run_id = ?",
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch synthesis")?;

        let Some(r) = row else {
            return Ok(None);
        };

        Ok(Some(SynthesisRecord {
            persona_id: r.get("persona_id"),
            decision_statement: r.get("decision_statement"),
            recommendation: r.get("recommendation"),
            position: r.get("position"),
            reasons: decode_list(&r, "reasons")?,
            risks: decode_list(&r, "risks")?,
            modifications: decode_list(&r, "modifications")?,
            validation_metrics: decode_list(&r, "validation_metrics")?,
            confidence: r.get("confidence"),
            next_steps: decode_list(&r, "next_steps")?,
            reasoning_summary: r.get("reasoning_summary"),
            structured: r.get("structured"),
            raw_text: r.get("raw_text"),
            response_id: r.get("response_id"),
            tokens: r.get::<i64, _>("tokens") as u64,
        }))
    }
}

fn run_from_row(r: &SqliteRow) -> Result<RunRow> {
    Ok(RunRow {
        id: r.get("id"),
        decision: r.get("decision"),
        memo_json: r.get("memo_json"),
        status: r.get::<String, _>("status").parse()?,
        model: r.get("model"),
        total_tokens: r.get("total_tokens"),
        failed_phase: r.get("failed_phase"),
        failed_persona: r.get("failed_persona"),
        error_message: r.get("error_message"),
        duration_ms: r.get("duration_ms"),
        created_at: r.get("created_at"),
        completed_at: r.get("completed_at"),
    })
}

fn encode_list(items: &[String]) -> Result<String> {
    serde_json::to_string(items).context("Failed to encode list column")
}

fn decode_list(row: &SqliteRow, column: &str) -> Result<Vec<String>> {
    let text: String = row.get(column);
    serde_json::from_str(&text).with_context(|| format!("Corrupt list in column '{}'", column))
}
