//! # Report Assembly
//!
//! Pure composition of per-stage outputs into the final versioned report.
//! No side effects; shape mismatches upstream are caught before this point.

use chrono::Utc;

use crate::contracts::{
    Audience, Execution, Idea, InterviewEvaluation, Market, Meta, Recommendation, Report, Risks,
    REPORT_SCHEMA_VERSION,
};

#[allow(clippy::too_many_arguments)]
pub fn assemble_report(
    run_id: &str,
    model: &str,
    idea: Idea,
    audience: Audience,
    market: Market,
    risks: Risks,
    execution: Execution,
    recommendation: Recommendation,
    interview_evaluation: Option<InterviewEvaluation>,
) -> Report {
    Report {
        meta: Meta {
            run_id: run_id.to_string(),
            created_at: Utc::now(),
            model: model.to_string(),
            version: REPORT_SCHEMA_VERSION.to_string(),
        },
        idea,
        audience,
        market,
        risks,
        execution,
        recommendation,
        interview_evaluation,
        // No search capability feeds the pipeline, so no sources are gathered.
        sources: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::Verdict;

    #[test]
    fn stamps_meta_and_leaves_sources_empty() {
        let report = assemble_report(
            "run-1",
            "gpt-4o",
            Idea {
                title: "T".into(),
                one_liner: "O".into(),
                expanded_summary: "E".into(),
                assumptions: vec![],
            },
            Audience::default(),
            Market {
                demand_signals: vec![],
                competitors: vec![],
                positioning: "P".into(),
            },
            Risks {
                top_risks: vec![],
                mitigations: vec![],
            },
            Execution {
                mvp_scope: vec![],
                two_week_plan: vec![],
                two_month_plan: vec![],
            },
            Recommendation {
                verdict: Verdict::Kill,
                confidence: 0.2,
                scores: None,
                rationale: "R".into(),
            },
            None,
        );

        assert_eq!(report.meta.run_id, "run-1");
        assert_eq!(report.meta.model, "gpt-4o");
        assert_eq!(report.meta.version, REPORT_SCHEMA_VERSION);
        assert!(report.sources.is_empty());
        assert!(report.interview_evaluation.is_none());
    }
}
