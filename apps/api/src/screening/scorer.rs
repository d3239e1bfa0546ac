//! Candidate scoring: rate-limited remote assessment of parsed resumes.
//!
//! The remote scoring endpoint enforces its own request ceiling, so
//! [`BatchScorer`] issues one call at a time in input order and sleeps a fixed
//! delay between calls. Throughput is capped at `60 / delay` candidates per
//! minute and total latency grows linearly with the batch.
//!
//! A failed or malformed call scores that candidate 0 with an `error` and the
//! batch moves on. Results are ranked by `match_score`, ties keeping input order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm_client::{parse_json_reply, LlmClient};
use crate::screening::parser::ParsedRecord;
use crate::screening::prompts::{SCORING_PROMPT, SCORING_SYSTEM};

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Scoring failed: malformed response: {0}")]
    Malformed(String),

    #[error("Scoring failed: {0}")]
    Request(String),
}

/// Coarse fit label returned by the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitLabel {
    Perfect,
    High,
    Low,
    #[serde(alias = "very low", alias = "very-low")]
    VeryLow,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubScores {
    pub skill: u8,
    pub experience: u8,
    pub education: u8,
}

/// Validated assessment of one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    pub match_score: u8,
    pub sub_scores: SubScores,
    pub skills_for_role: Vec<String>,
    pub fit_label: FitLabel,
}

/// Wire shape of the scoring reply, before range checks.
#[derive(Debug, Deserialize)]
struct RawScoreCard {
    match_score: f64,
    #[serde(default)]
    skill_match_score: Option<f64>,
    #[serde(default)]
    experience_match_score: Option<f64>,
    #[serde(default)]
    education_match_score: Option<f64>,
    #[serde(default)]
    skillset_for_role: Vec<String>,
    #[serde(default)]
    overall_fit: FitLabel,
}

impl ScoreCard {
    pub fn from_value(value: Value) -> Result<Self, ScoreError> {
        let raw: RawScoreCard =
            serde_json::from_value(value).map_err(|e| ScoreError::Malformed(e.to_string()))?;

        let mut skills_for_role: Vec<String> = Vec::with_capacity(raw.skillset_for_role.len());
        for skill in raw.skillset_for_role {
            let skill = skill.trim().to_string();
            if !skill.is_empty() && !skills_for_role.contains(&skill) {
                skills_for_role.push(skill);
            }
        }

        Ok(Self {
            match_score: to_percent("match_score", raw.match_score)?,
            sub_scores: SubScores {
                skill: to_percent("skill_match_score", raw.skill_match_score.unwrap_or(0.0))?,
                experience: to_percent(
                    "experience_match_score",
                    raw.experience_match_score.unwrap_or(0.0),
                )?,
                education: to_percent(
                    "education_match_score",
                    raw.education_match_score.unwrap_or(0.0),
                )?,
            },
            skills_for_role,
            fit_label: raw.overall_fit,
        })
    }
}

fn to_percent(field: &str, value: f64) -> Result<u8, ScoreError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(ScoreError::Malformed(format!(
            "{field} must be between 0 and 100, got {value}"
        )));
    }
    Ok(value.round() as u8)
}

/// Final, immutable per-candidate result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub filename: String,
    pub candidate_name: String,
    pub match_score: u8,
    pub sub_scores: SubScores,
    pub skills_for_role: Vec<String>,
    pub fit_label: FitLabel,
    pub processed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CandidateResult {
    fn scored(record: &ParsedRecord, card: ScoreCard) -> Self {
        Self {
            filename: record.filename.clone(),
            candidate_name: record.candidate_name(),
            match_score: card.match_score,
            sub_scores: card.sub_scores,
            skills_for_role: card.skills_for_role,
            fit_label: card.fit_label,
            processed_at: Utc::now(),
            error: None,
        }
    }

    fn unscored(record: &ParsedRecord, error: &ScoreError) -> Self {
        Self {
            filename: record.filename.clone(),
            candidate_name: record.candidate_name(),
            match_score: 0,
            sub_scores: SubScores::default(),
            skills_for_role: Vec::new(),
            fit_label: FitLabel::Unknown,
            processed_at: Utc::now(),
            error: Some(error.to_string()),
        }
    }
}

/// One remote scoring call. Implement this to swap the scoring backend.
#[async_trait]
pub trait CandidateScorer: Send + Sync {
    async fn score(&self, job_description: &str, resume: &Value) -> Result<ScoreCard, ScoreError>;
}

pub struct LlmCandidateScorer {
    llm: LlmClient,
}

impl LlmCandidateScorer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl CandidateScorer for LlmCandidateScorer {
    async fn score(&self, job_description: &str, resume: &Value) -> Result<ScoreCard, ScoreError> {
        let resume_json = serde_json::to_string_pretty(resume)
            .map_err(|e| ScoreError::Request(format!("failed to serialize resume: {e}")))?;
        let prompt = SCORING_PROMPT
            .replace("{job_description}", job_description)
            .replace("{resume_json}", &resume_json);

        let response = self
            .llm
            .call(&prompt, SCORING_SYSTEM)
            .await
            .map_err(|e| ScoreError::Request(e.to_string()))?;
        let text = response
            .text()
            .ok_or_else(|| ScoreError::Malformed("empty response".to_string()))?;
        let value: Value =
            parse_json_reply(text).map_err(|e| ScoreError::Malformed(e.to_string()))?;

        ScoreCard::from_value(value)
    }
}

/// Output of a full scoring pass.
#[derive(Debug, Clone, Serialize)]
pub struct ScoringOutcome {
    pub processed_count: usize,
    pub processing_rate: String,
    pub results: Vec<CandidateResult>,
}

/// Sequential scorer with a fixed inter-call delay.
pub struct BatchScorer {
    remote: Arc<dyn CandidateScorer>,
    delay: Duration,
}

impl BatchScorer {
    pub fn new(remote: Arc<dyn CandidateScorer>, delay: Duration) -> Self {
        Self { remote, delay }
    }

    /// Expected wall-clock time for `items` candidates at this delay.
    pub fn estimate(&self, items: usize) -> Duration {
        self.delay.saturating_mul(items.try_into().unwrap_or(u32::MAX))
    }

    pub fn processing_rate(&self) -> String {
        if self.delay.is_zero() {
            return "unthrottled".to_string();
        }
        let per_minute = (60.0 / self.delay.as_secs_f64() * 10.0).round() / 10.0;
        format!("{per_minute} resumes per minute")
    }

    /// Scores the successfully parsed records in order, then ranks the results.
    pub async fn score_batch(
        &self,
        job_description: &str,
        records: &[ParsedRecord],
    ) -> ScoringOutcome {
        let candidates: Vec<&ParsedRecord> = records.iter().filter(|r| r.success).collect();
        let total = candidates.len();
        let mut results = Vec::with_capacity(total);

        for (index, record) in candidates.into_iter().enumerate() {
            debug!("Scoring {} ({}/{})", record.filename, index + 1, total);

            let result = match self.remote.score(job_description, &record.data).await {
                Ok(card) => CandidateResult::scored(record, card),
                Err(e) => {
                    warn!("Scoring failed for {}: {e}", record.filename);
                    CandidateResult::unscored(record, &e)
                }
            };
            results.push(result);

            if index + 1 < total && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        rank_results(&mut results);
        info!("Scored {} candidates", results.len());

        ScoringOutcome {
            processed_count: results.len(),
            processing_rate: self.processing_rate(),
            results,
        }
    }
}

/// Sorts by `match_score` descending. `sort_by` is stable, so equal scores keep
/// their relative input order.
pub fn rank_results(results: &mut [CandidateResult]) {
    results.sort_by(|a, b| b.match_score.cmp(&a.match_score));
}
