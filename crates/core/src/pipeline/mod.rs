//! # Pipeline Orchestrator
//!
//! The state machine driving a run from start to completion or suspension:
//! STARTED -> RUNNING -> {WAITING_FOR_INPUT, COMPLETED, FAILED}, with
//! WAITING_FOR_INPUT -> RUNNING on resume. Stages execute strictly in
//! order; the only suspension point is the interview wait, and resumption
//! is a fresh invocation that re-derives state from the store.

pub mod report;

pub use report::assemble_report;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::agents::{
    ExecutionAgent, InterviewEvaluatorAgent, InterviewerAgent, JudgeAgent, MarketAgent,
    PlannerAgent, RiskAgent,
};
use crate::contracts::{Interview, Question, Report, StageArtifact};
use crate::error::{PipelineError, StoreError};
use crate::generation::GenerationPort;
use crate::models::ModelConfig;
use crate::store::{Event, EventKind, RunStatus, RunStore};

/// The pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Interviewer,
    Planner,
    Market,
    Risk,
    Execution,
    Judge,
    InterviewEvaluator,
}

impl Stage {
    /// Agent name used for artifact keys and event attribution.
    pub fn agent_name(&self) -> &'static str {
        match self {
            Self::Interviewer => InterviewerAgent::NAME,
            Self::Planner => PlannerAgent::NAME,
            Self::Market => MarketAgent::NAME,
            Self::Risk => RiskAgent::NAME,
            Self::Execution => ExecutionAgent::NAME,
            Self::Judge => JudgeAgent::NAME,
            Self::InterviewEvaluator => InterviewEvaluatorAgent::NAME,
        }
    }
}

/// How one orchestrator invocation ended.
///
/// `WaitingForInput` is a suspension, not a failure: the caller supplies
/// interview answers and re-invokes with the same run id and idea text.
/// `Failed` carries the recorded error text; store failures are the only
/// errors that escape as `Err` instead.
#[derive(Debug)]
pub enum PipelineOutcome {
    Completed(Box<Report>),
    WaitingForInput,
    Failed(String),
}

impl PipelineOutcome {
    pub fn into_report(self) -> Option<Report> {
        match self {
            Self::Completed(report) => Some(*report),
            _ => None,
        }
    }
}

/// Drives runs against an injected store and generation port.
pub struct Orchestrator {
    store: Arc<dyn RunStore>,
    port: Arc<dyn GenerationPort>,
    model_label: String,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn RunStore>, port: Arc<dyn GenerationPort>, config: &ModelConfig) -> Self {
        Self {
            store,
            port,
            model_label: config.model.clone(),
        }
    }

    /// Execute (or resume) the analysis pipeline for a run.
    ///
    /// Any stage failure is recorded as a `RUN_FAILED` event plus terminal
    /// `FAILED` status and returned as `PipelineOutcome::Failed`; only run
    /// store failures surface as `Err`.
    pub async fn run_analysis(
        &self,
        run_id: &str,
        idea_text: &str,
    ) -> Result<PipelineOutcome, StoreError> {
        match self.execute(run_id, idea_text).await {
            Ok(outcome) => Ok(outcome),
            Err(PipelineError::Agent(e)) => {
                let message = e.to_string();
                tracing::error!(run_id, error = %message, "run failed");
                self.store.append_event(
                    run_id,
                    Event::new(EventKind::RunFailed)
                        .with_status(RunStatus::Failed)
                        .with_error(&message),
                )?;
                self.store.update_run_status(run_id, RunStatus::Failed)?;
                Ok(PipelineOutcome::Failed(message))
            }
            Err(PipelineError::Store(e)) => Err(e),
        }
    }

    async fn execute(&self, run_id: &str, idea_text: &str) -> Result<PipelineOutcome, PipelineError> {
        tracing::info!(run_id, "starting analysis pipeline");
        self.store.append_event(
            run_id,
            Event::new(EventKind::RunStarted).with_status(RunStatus::Running),
        )?;
        self.store.update_run_status(run_id, RunStatus::Running)?;

        // Resume detection: an existing interview means the interviewer
        // already ran in a previous invocation.
        let mut interview = self.store.get_interview(run_id)?;

        if interview.is_none() {
            let stage = Stage::Interviewer;
            self.agent_started(run_id, stage)?;
            let drafts = InterviewerAgent::new(Arc::clone(&self.port))
                .run(idea_text)
                .await?;

            if !drafts.is_empty() {
                let questions: Vec<Question> = drafts
                    .into_iter()
                    .enumerate()
                    .map(|(i, draft)| Question {
                        id: (i + 1).to_string(),
                        text: draft.text,
                        guidance: draft.guidance,
                    })
                    .collect();
                tracing::info!(run_id, questions = questions.len(), "suspending for interview");
                self.store.save_interview(
                    run_id,
                    &Interview {
                        questions,
                        answers: BTreeMap::new(),
                    },
                )?;
                self.agent_finished(run_id, stage)?;
                self.store.append_event(
                    run_id,
                    Event::new(EventKind::WaitingForInput)
                        .with_status(RunStatus::WaitingForInput),
                )?;
                self.store
                    .update_run_status(run_id, RunStatus::WaitingForInput)?;
                return Ok(PipelineOutcome::WaitingForInput);
            }

            // No questions: proceed directly without interview context.
            self.agent_finished(run_id, stage)?;
        }

        // --- Planner ---
        let stage = Stage::Planner;
        self.agent_started(run_id, stage)?;
        let started_at = Utc::now();
        let planner_input = match interview.as_ref().filter(|i| i.has_answers()) {
            Some(interview) => format!("{idea_text}{}", qa_block(interview)),
            None => idea_text.to_string(),
        };
        let idea = PlannerAgent::new(Arc::clone(&self.port))
            .run(&planner_input)
            .await?;
        self.store.save_artifact(
            run_id,
            &artifact(
                stage,
                started_at,
                truncate(idea_text, 200),
                format!(
                    "**Title:** {}\n\n**Summary:** {}",
                    idea.title, idea.expanded_summary
                ),
                serde_json::to_value(&idea).unwrap_or(Value::Null),
            ),
        )?;
        self.agent_finished(run_id, stage)?;

        // --- Market ---
        let stage = Stage::Market;
        self.agent_started(run_id, stage)?;
        let started_at = Utc::now();
        let market_out = MarketAgent::new(Arc::clone(&self.port))
            .run(&idea.expanded_summary)
            .await?;
        self.store.save_artifact(
            run_id,
            &artifact(
                stage,
                started_at,
                "Expanded Idea Summary".to_string(),
                format!(
                    "**Positioning:** {}\n\n**Target Audience:** {}",
                    market_out.market.positioning,
                    market_out.audience.primary_users.join(", ")
                ),
                market_out.raw.clone(),
            ),
        )?;
        self.agent_finished(run_id, stage)?;

        // --- Risk ---
        let stage = Stage::Risk;
        self.agent_started(run_id, stage)?;
        let started_at = Utc::now();
        let risks = RiskAgent::new(Arc::clone(&self.port))
            .run(&idea.expanded_summary, &market_out.market.positioning)
            .await?;
        self.store.save_artifact(
            run_id,
            &artifact(
                stage,
                started_at,
                "Idea + Market Positioning".to_string(),
                format!("**Top Risks:**\n{}", bullet_list(&risks.top_risks)),
                serde_json::to_value(&risks).unwrap_or(Value::Null),
            ),
        )?;
        self.agent_finished(run_id, stage)?;

        // --- Execution ---
        let stage = Stage::Execution;
        self.agent_started(run_id, stage)?;
        let started_at = Utc::now();
        let execution = ExecutionAgent::new(Arc::clone(&self.port))
            .run(&idea.expanded_summary, &format!("{:?}", risks.top_risks))
            .await?;
        self.store.save_artifact(
            run_id,
            &artifact(
                stage,
                started_at,
                "Idea + Risks".to_string(),
                format!("**MVP Scope:**\n{}", bullet_list(&execution.mvp_scope)),
                serde_json::to_value(&execution).unwrap_or(Value::Null),
            ),
        )?;
        self.agent_finished(run_id, stage)?;

        // --- Judge ---
        let stage = Stage::Judge;
        self.agent_started(run_id, stage)?;
        let started_at = Utc::now();
        let digest = format!(
            "Idea: {}\nMarket Positioning: {}\nTop Risks: {:?}\nMVP Scope: {:?}",
            idea.expanded_summary,
            market_out.market.positioning,
            risks.top_risks,
            execution.mvp_scope
        );
        let recommendation = JudgeAgent::new(Arc::clone(&self.port)).run(&digest).await?;
        self.store.save_artifact(
            run_id,
            &artifact(
                stage,
                started_at,
                "All Agent Outputs".to_string(),
                format!(
                    "**Verdict:** {}\n\n**Confidence:** {}\n\n**Rationale:** {}",
                    recommendation.verdict.as_str(),
                    recommendation.confidence,
                    recommendation.rationale
                ),
                serde_json::to_value(&recommendation).unwrap_or(Value::Null),
            ),
        )?;
        self.agent_finished(run_id, stage)?;

        // --- Interview evaluator (only with answers present) ---
        let mut interview_evaluation = None;
        if let Some(interview) = interview.take().filter(|i| i.has_answers()) {
            let stage = Stage::InterviewEvaluator;
            self.agent_started(run_id, stage)?;
            let started_at = Utc::now();
            let evaluation = InterviewEvaluatorAgent::new(Arc::clone(&self.port))
                .run(&interview)
                .await?;
            self.store.save_artifact(
                run_id,
                &artifact(
                    stage,
                    started_at,
                    "Interview Questions & Answers".to_string(),
                    evaluation.summary.clone(),
                    serde_json::to_value(&evaluation).unwrap_or(Value::Null),
                ),
            )?;
            self.agent_finished(run_id, stage)?;
            interview_evaluation = Some(evaluation);
        }

        let report = assemble_report(
            run_id,
            &self.model_label,
            idea,
            market_out.audience,
            market_out.market,
            risks,
            execution,
            recommendation,
            interview_evaluation,
        );
        // The only path that marks a run complete.
        self.store.save_report(run_id, &report)?;
        self.store.append_event(
            run_id,
            Event::new(EventKind::RunCompleted).with_status(RunStatus::Completed),
        )?;
        tracing::info!(run_id, "analysis pipeline completed");

        Ok(PipelineOutcome::Completed(Box::new(report)))
    }

    fn agent_started(&self, run_id: &str, stage: Stage) -> Result<(), StoreError> {
        tracing::info!(run_id, agent = stage.agent_name(), "stage started");
        self.store.append_event(
            run_id,
            Event::new(EventKind::AgentStarted).with_agent(stage.agent_name()),
        )
    }

    fn agent_finished(&self, run_id: &str, stage: Stage) -> Result<(), StoreError> {
        tracing::info!(run_id, agent = stage.agent_name(), "stage finished");
        self.store.append_event(
            run_id,
            Event::new(EventKind::AgentFinished).with_agent(stage.agent_name()),
        )
    }
}

/// Format answered questions as the context block appended to the planner
/// input on resume.
fn qa_block(interview: &Interview) -> String {
    let mut block = String::from("\n\nAdditional Context from Interview:\n");
    for question in &interview.questions {
        if let Some(answer) = interview.answers.get(&question.id) {
            block.push_str(&format!("Q: {}\nA: {}\n", question.text, answer));
        }
    }
    block
}

fn artifact(
    stage: Stage,
    started_at: chrono::DateTime<Utc>,
    input_summary: String,
    output_markdown: String,
    output_json: Value,
) -> StageArtifact {
    StageArtifact {
        stage: stage.agent_name().to_string(),
        started_at,
        finished_at: Utc::now(),
        input_summary,
        output_markdown,
        output_json,
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::Verdict;
    use crate::store::MemoryRunStore;
    use crate::test_support::ScriptedPort;

    const IDEA: &str = "A platform for connecting remote workers with co-working spaces.";

    fn orchestrator(store: Arc<MemoryRunStore>, port: Arc<ScriptedPort>) -> Orchestrator {
        Orchestrator::new(store, port, &ModelConfig::default())
    }

    fn enqueue_no_questions(port: &ScriptedPort) {
        port.enqueue_text(InterviewerAgent::NAME, r#"{"questions": []}"#);
    }

    /// Queue one full pass of planner through judge.
    fn enqueue_analysis_stages(port: &ScriptedPort) {
        port.enqueue(
            PlannerAgent::NAME,
            serde_json::json!({
                "title": "DeskShare",
                "one_liner": "Airbnb for co-working desks",
                "expanded_summary": "Remote workers find and book desks by the day.",
                "assumptions": ["Remote work keeps growing"]
            }),
        );
        port.enqueue(
            MarketAgent::NAME,
            serde_json::json!({
                "audience": {
                    "primary_users": ["Remote workers"],
                    "jobs_to_be_done": ["Find a desk"],
                    "personas": []
                },
                "market": {
                    "demand_signals": ["Rising remote job postings"],
                    "competitors": ["WeWork"],
                    "positioning": "Flexible and affordable"
                }
            }),
        );
        port.enqueue(
            RiskAgent::NAME,
            serde_json::json!({
                "top_risks": ["Two-sided cold start"],
                "mitigations": ["Seed supply city by city"]
            }),
        );
        port.enqueue(
            ExecutionAgent::NAME,
            serde_json::json!({
                "mvp_scope": ["Search", "Booking"],
                "two_week_plan": ["Design flows"],
                "two_month_plan": ["Pilot city"]
            }),
        );
        port.enqueue(
            JudgeAgent::NAME,
            serde_json::json!({
                "verdict": "PURSUE",
                "confidence": 0.85,
                "rationale": "Strong demand, manageable risks"
            }),
        );
    }

    #[tokio::test]
    async fn completes_directly_when_interviewer_has_no_questions() {
        let store = Arc::new(MemoryRunStore::new());
        let port = Arc::new(ScriptedPort::new());
        enqueue_no_questions(&port);
        enqueue_analysis_stages(&port);

        let run_id = store.create_run(IDEA).unwrap();
        let outcome = orchestrator(Arc::clone(&store), Arc::clone(&port))
            .run_analysis(&run_id, IDEA)
            .await
            .unwrap();

        let report = outcome.into_report().expect("expected a completed report");
        assert!(report.interview_evaluation.is_none());
        assert!(matches!(
            report.recommendation.verdict,
            Verdict::Pursue | Verdict::Pivot | Verdict::Kill
        ));

        let view = store.get_run(&run_id).unwrap().unwrap();
        assert_eq!(view.run.status, RunStatus::Completed);
        assert!(view.report.is_some());
        assert_eq!(view.artifacts.len(), 5);
        assert_eq!(view.events.last().unwrap().kind, EventKind::RunCompleted);
    }

    #[tokio::test]
    async fn suspends_on_questions_and_resumes_with_answers() {
        let store = Arc::new(MemoryRunStore::new());
        let port = Arc::new(ScriptedPort::new());
        port.enqueue_text(
            InterviewerAgent::NAME,
            r#"{"questions": [
                {"text": "Who pays?", "guidance": "Pick a side of the market"},
                {"text": "Why now?"},
                {"text": "What is the wedge?"}
            ]}"#,
        );

        let run_id = store.create_run(IDEA).unwrap();
        let orchestrator = orchestrator(Arc::clone(&store), Arc::clone(&port));

        // First invocation: no report, suspended.
        let outcome = orchestrator.run_analysis(&run_id, IDEA).await.unwrap();
        assert!(matches!(outcome, PipelineOutcome::WaitingForInput));

        let view = store.get_run(&run_id).unwrap().unwrap();
        assert_eq!(view.run.status, RunStatus::WaitingForInput);
        assert!(view.report.is_none());
        assert_eq!(view.events.last().unwrap().kind, EventKind::WaitingForInput);
        let interview = view.interview.unwrap();
        assert_eq!(interview.questions.len(), 3);
        assert!(interview.answers.is_empty());

        // Caller supplies answers and re-invokes.
        let mut interview = store.get_interview(&run_id).unwrap().unwrap();
        for question in &interview.questions {
            interview
                .answers
                .insert(question.id.clone(), format!("answer {}", question.id));
        }
        store.save_interview(&run_id, &interview).unwrap();
        store.update_run_status(&run_id, RunStatus::Running).unwrap();

        enqueue_analysis_stages(&port);
        port.enqueue(
            InterviewEvaluatorAgent::NAME,
            serde_json::json!({
                "evaluations": [
                    {"question_id": "1", "question_text": "Who pays?", "answer_text": "answer 1",
                     "analysis": "ok", "suggestions": [], "concerns": []},
                    {"question_id": "2", "question_text": "Why now?", "answer_text": "answer 2",
                     "analysis": "ok", "suggestions": [], "concerns": []},
                    {"question_id": "3", "question_text": "What is the wedge?", "answer_text": "answer 3",
                     "analysis": "ok", "suggestions": [], "concerns": []}
                ],
                "summary": "Solid answers"
            }),
        );

        // No interviewer response is queued: re-entering the interview
        // branch would fail the run, so completion proves it was skipped.
        let outcome = orchestrator.run_analysis(&run_id, IDEA).await.unwrap();
        let report = outcome.into_report().expect("expected a completed report");

        let evaluation = report.interview_evaluation.expect("evaluation present");
        let ids: Vec<&str> = evaluation
            .evaluations
            .iter()
            .map(|e| e.question_id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);

        let view = store.get_run(&run_id).unwrap().unwrap();
        assert_eq!(view.run.status, RunStatus::Completed);
        assert_eq!(view.artifacts.len(), 6);
    }

    #[tokio::test]
    async fn planner_failure_records_run_failed_and_saves_nothing() {
        let store = Arc::new(MemoryRunStore::new());
        let port = Arc::new(ScriptedPort::new());
        enqueue_no_questions(&port);
        port.enqueue_error(
            PlannerAgent::NAME,
            crate::error::GenerationError::Backend("Planner failed".into()),
        );

        let run_id = store.create_run(IDEA).unwrap();
        let outcome = orchestrator(Arc::clone(&store), Arc::clone(&port))
            .run_analysis(&run_id, IDEA)
            .await
            .unwrap();

        match outcome {
            PipelineOutcome::Failed(message) => assert!(message.contains("Planner failed")),
            other => panic!("expected failure, got {other:?}"),
        }

        let view = store.get_run(&run_id).unwrap().unwrap();
        assert_eq!(view.run.status, RunStatus::Failed);
        assert!(view.report.is_none());
        assert!(view.artifacts.is_empty());
        let last = view.events.last().unwrap();
        assert_eq!(last.kind, EventKind::RunFailed);
        assert!(last.error.as_deref().unwrap_or_default().contains("Planner failed"));
    }

    #[tokio::test]
    async fn failure_mid_pipeline_keeps_only_completed_stage_artifacts() {
        let store = Arc::new(MemoryRunStore::new());
        let port = Arc::new(ScriptedPort::new());
        enqueue_no_questions(&port);
        port.enqueue(
            PlannerAgent::NAME,
            serde_json::json!({
                "title": "T", "one_liner": "O", "expanded_summary": "E", "assumptions": []
            }),
        );
        port.enqueue_error(
            MarketAgent::NAME,
            crate::error::GenerationError::Empty,
        );

        let run_id = store.create_run(IDEA).unwrap();
        let outcome = orchestrator(Arc::clone(&store), Arc::clone(&port))
            .run_analysis(&run_id, IDEA)
            .await
            .unwrap();
        assert!(matches!(outcome, PipelineOutcome::Failed(_)));

        let view = store.get_run(&run_id).unwrap().unwrap();
        assert_eq!(view.artifacts.len(), 1);
        assert_eq!(view.artifacts[0].stage, PlannerAgent::NAME);
    }

    #[tokio::test]
    async fn rerun_upserts_artifacts_instead_of_duplicating() {
        let store = Arc::new(MemoryRunStore::new());
        let port = Arc::new(ScriptedPort::new());
        let run_id = store.create_run(IDEA).unwrap();
        let orchestrator = orchestrator(Arc::clone(&store), Arc::clone(&port));

        enqueue_no_questions(&port);
        enqueue_analysis_stages(&port);
        orchestrator.run_analysis(&run_id, IDEA).await.unwrap();

        // Second full pass over the same run. The interview branch is
        // re-entered because no interview was stored the first time.
        enqueue_no_questions(&port);
        enqueue_analysis_stages(&port);
        orchestrator.run_analysis(&run_id, IDEA).await.unwrap();

        let view = store.get_run(&run_id).unwrap().unwrap();
        assert_eq!(view.artifacts.len(), 5);
        let planner_count = view
            .artifacts
            .iter()
            .filter(|a| a.stage == PlannerAgent::NAME)
            .count();
        assert_eq!(planner_count, 1);
    }

    #[tokio::test]
    async fn interviewer_plain_text_fallback_flows_into_suspension() {
        let store = Arc::new(MemoryRunStore::new());
        let port = Arc::new(ScriptedPort::new());
        port.enqueue_text(
            InterviewerAgent::NAME,
            "Thinking out loud.\nWho is the buyer?\nWhat does it cost?\n",
        );

        let run_id = store.create_run(IDEA).unwrap();
        let outcome = orchestrator(Arc::clone(&store), Arc::clone(&port))
            .run_analysis(&run_id, IDEA)
            .await
            .unwrap();
        assert!(matches!(outcome, PipelineOutcome::WaitingForInput));

        let interview = store.get_interview(&run_id).unwrap().unwrap();
        assert_eq!(interview.questions.len(), 2);
        assert!(interview.questions.iter().all(|q| q.guidance.is_none()));
        assert_eq!(interview.questions[0].id, "1");
        assert_eq!(interview.questions[1].id, "2");
    }
}
