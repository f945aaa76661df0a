//! # Report Contracts
//!
//! Data contracts shared by the stage agents, the run store, and the final
//! report document. Everything the generation backend is asked to produce
//! derives `JsonSchema` so the expected shape can be spelled out in the
//! prompt and validated on decode.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Report schema version stamped into `Meta`.
pub const REPORT_SCHEMA_VERSION: &str = "0.1";

/// Final verdict on an idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Verdict {
    #[serde(rename = "PURSUE")]
    Pursue,
    #[serde(rename = "PIVOT")]
    Pivot,
    #[serde(rename = "KILL")]
    Kill,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pursue => "PURSUE",
            Verdict::Pivot => "PIVOT",
            Verdict::Kill => "KILL",
        }
    }
}

/// One question the interviewer wants answered before deep analysis.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Question {
    /// Unique identifier within the interview
    pub id: String,
    /// The question text
    pub text: String,
    /// Context or a suggested direction to help the user answer
    #[serde(default)]
    pub guidance: Option<String>,
}

/// The question/answer exchange attached to a run.
///
/// Exists with an empty answer map while the run is suspended; answers are
/// merged in by the caller and keyed by question id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Interview {
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
}

impl Interview {
    /// Whether at least one answer has been supplied.
    pub fn has_answers(&self) -> bool {
        !self.answers.is_empty()
    }
}

/// Report metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    /// Generation model label used for the analysis
    pub model: String,
    /// Schema version of the report document
    pub version: String,
}

/// Expanded form of the original idea, produced by the planner.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Idea {
    /// Short title for the idea
    pub title: String,
    /// One-sentence summary
    pub one_liner: String,
    /// Detailed summary of the idea
    pub expanded_summary: String,
    /// Key assumptions the idea rests on
    #[serde(default)]
    pub assumptions: Vec<String>,
}

/// Audience profile, split out of the market agent's payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Audience {
    #[serde(default)]
    pub primary_users: Vec<String>,
    #[serde(default)]
    pub jobs_to_be_done: Vec<String>,
    /// Free-form persona objects
    #[serde(default)]
    pub personas: Vec<serde_json::Value>,
}

/// Market analysis, split out of the market agent's payload.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Market {
    #[serde(default)]
    pub demand_signals: Vec<String>,
    #[serde(default)]
    pub competitors: Vec<String>,
    /// Market positioning statement
    pub positioning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Risks {
    #[serde(default)]
    pub top_risks: Vec<String>,
    /// Mitigations, index-paired with `top_risks`
    #[serde(default)]
    pub mitigations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Execution {
    #[serde(default)]
    pub mvp_scope: Vec<String>,
    #[serde(default)]
    pub two_week_plan: Vec<String>,
    #[serde(default)]
    pub two_month_plan: Vec<String>,
}

/// A single scored pillar with its justification.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScoreDetail {
    /// Score between 0 and 10
    pub score: f64,
    pub reasoning: String,
}

/// The four scoring pillars the judge may fill in.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Scores {
    pub market_demand: ScoreDetail,
    pub competitive_advantage: ScoreDetail,
    pub technical_feasibility: ScoreDetail,
    pub business_viability: ScoreDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Recommendation {
    pub verdict: Verdict,
    /// Confidence between 0 and 1
    pub confidence: f64,
    #[serde(default)]
    pub scores: Option<Scores>,
    pub rationale: String,
}

/// A source referenced by the analysis.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Source {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// Evaluation of one interview answer.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnswerEvaluation {
    pub question_id: String,
    pub question_text: String,
    pub answer_text: String,
    pub analysis: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
}

/// Evaluation of the whole interview, one entry per question.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InterviewEvaluation {
    #[serde(default)]
    pub evaluations: Vec<AnswerEvaluation>,
    pub summary: String,
}

/// The terminal artifact of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub meta: Meta,
    pub idea: Idea,
    pub audience: Audience,
    pub market: Market,
    pub risks: Risks,
    pub execution: Execution,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub interview_evaluation: Option<InterviewEvaluation>,
    #[serde(default)]
    pub sources: Vec<Source>,
}

/// Durable record of one completed stage, keyed by stage name within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageArtifact {
    /// Stage name, the upsert key
    pub stage: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Short summary of what the stage was given
    pub input_summary: String,
    /// Human-readable rendering of the output
    pub output_markdown: String,
    /// Full structured output payload
    pub output_json: serde_json::Value,
}
