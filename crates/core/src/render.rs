//! # Markdown Rendering
//!
//! Turns a [`Report`] into a shareable Markdown document. Rendering is a
//! pure function of the report; section order and formatting are stable so
//! exported files diff cleanly between runs.

use crate::contracts::{Report, Verdict};

fn verdict_emoji(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Pursue => "\u{1F7E2}",
        Verdict::Pivot => "\u{1F7E1}",
        Verdict::Kill => "\u{1F534}",
    }
}

/// Render the full report as Markdown.
pub fn render_markdown(report: &Report) -> String {
    let mut md: Vec<String> = Vec::new();

    md.push(format!("# {}", report.idea.title));
    md.push(format!("_{}_", report.idea.one_liner));
    md.push(String::new());

    md.push(format!(
        "## Verdict: {} {}",
        verdict_emoji(report.recommendation.verdict),
        report.recommendation.verdict.as_str()
    ));
    md.push(format!(
        "**Confidence:** {:.0}%",
        report.recommendation.confidence * 100.0
    ));
    md.push(format!("**Rationale:** {}", report.recommendation.rationale));
    md.push(String::new());

    if let Some(scores) = &report.recommendation.scores {
        md.push("### Scores".to_string());
        md.push("| Pillar | Score |".to_string());
        md.push("| :--- | ---: |".to_string());
        md.push(format!("| Market Demand | {:.1} |", scores.market_demand.score));
        md.push(format!(
            "| Competitive Advantage | {:.1} |",
            scores.competitive_advantage.score
        ));
        md.push(format!(
            "| Technical Feasibility | {:.1} |",
            scores.technical_feasibility.score
        ));
        md.push(format!(
            "| Business Viability | {:.1} |",
            scores.business_viability.score
        ));
        md.push(String::new());
    }

    md.push("## Executive Summary".to_string());
    md.push(report.idea.expanded_summary.clone());
    md.push(String::new());

    md.push("## Target Audience".to_string());
    md.push("**Primary Users:**".to_string());
    for user in &report.audience.primary_users {
        md.push(format!("- {user}"));
    }
    if !report.audience.jobs_to_be_done.is_empty() {
        md.push(String::new());
        md.push("**Jobs to be Done:**".to_string());
        for job in &report.audience.jobs_to_be_done {
            md.push(format!("- {job}"));
        }
    }
    md.push(String::new());

    md.push("## Market Analysis".to_string());
    md.push(format!("**Positioning:** {}", report.market.positioning));
    md.push(String::new());

    if !report.market.competitors.is_empty() {
        md.push("### Competitors".to_string());
        md.push("| Competitor |".to_string());
        md.push("| :--- |".to_string());
        for competitor in &report.market.competitors {
            md.push(format!("| {competitor} |"));
        }
        md.push(String::new());
    }

    if !report.market.demand_signals.is_empty() {
        md.push("**Demand Signals:**".to_string());
        for signal in &report.market.demand_signals {
            md.push(format!("- {signal}"));
        }
        md.push(String::new());
    }

    md.push("## Risks & Mitigations".to_string());
    if report.risks.top_risks.is_empty() {
        md.push("No major risks identified.".to_string());
        md.push(String::new());
    } else {
        for (i, risk) in report.risks.top_risks.iter().enumerate() {
            // Mitigations pair with risks by index; missing ones show as N/A.
            let mitigation = report
                .risks
                .mitigations
                .get(i)
                .map(String::as_str)
                .unwrap_or("N/A");
            md.push(format!("**Risk {}:** {risk}", i + 1));
            md.push(format!("> *Mitigation:* {mitigation}"));
            md.push(String::new());
        }
    }

    md.push("## Execution Plan".to_string());
    md.push("### MVP Scope".to_string());
    if report.execution.mvp_scope.is_empty() {
        md.push("No MVP scope defined.".to_string());
    } else {
        for item in &report.execution.mvp_scope {
            md.push(format!("- [ ] {item}"));
        }
    }
    md.push(String::new());

    md.push("### Immediate Next Steps (2 Weeks)".to_string());
    if report.execution.two_week_plan.is_empty() {
        md.push("No immediate steps defined.".to_string());
    } else {
        for item in &report.execution.two_week_plan {
            md.push(format!("1. {item}"));
        }
    }
    md.push(String::new());

    if let Some(evaluation) = &report.interview_evaluation {
        md.push("## Interview Feedback".to_string());
        md.push(evaluation.summary.clone());
        md.push(String::new());
        for answer in &evaluation.evaluations {
            md.push(format!("**Q:** {}", answer.question_text));
            md.push(format!("**A:** {}", answer.answer_text));
            md.push(format!("> {}", answer.analysis));
            for concern in &answer.concerns {
                md.push(format!("> \u{26A0} {concern}"));
            }
            md.push(String::new());
        }
    }

    if !report.sources.is_empty() {
        md.push("## Sources".to_string());
        for source in &report.sources {
            md.push(format!("- [{}]({})", source.title, source.url));
            if let Some(snippet) = &source.snippet {
                md.push(format!("  - *\"{snippet}\"*"));
            }
        }
        md.push(String::new());
    }

    md.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{
        AnswerEvaluation, Audience, Execution, Idea, InterviewEvaluation, Market, Meta,
        Recommendation, Risks, Source, REPORT_SCHEMA_VERSION,
    };
    use chrono::Utc;

    fn sample_report() -> Report {
        Report {
            meta: Meta {
                run_id: "run-1".into(),
                created_at: Utc::now(),
                model: "gpt-4o".into(),
                version: REPORT_SCHEMA_VERSION.into(),
            },
            idea: Idea {
                title: "DeskShare".into(),
                one_liner: "Airbnb for co-working desks".into(),
                expanded_summary: "Remote workers find and book desks by the day.".into(),
                assumptions: vec![],
            },
            audience: Audience {
                primary_users: vec!["Remote workers".into()],
                jobs_to_be_done: vec!["Find a desk".into()],
                personas: vec![],
            },
            market: Market {
                demand_signals: vec!["Rising remote job postings".into()],
                competitors: vec!["WeWork".into()],
                positioning: "Flexible and affordable".into(),
            },
            risks: Risks {
                top_risks: vec!["Cold start".into(), "Churn".into()],
                mitigations: vec!["Seed supply".into()],
            },
            execution: Execution {
                mvp_scope: vec!["Search".into()],
                two_week_plan: vec!["Design flows".into()],
                two_month_plan: vec![],
            },
            recommendation: Recommendation {
                verdict: Verdict::Pursue,
                confidence: 0.85,
                scores: None,
                rationale: "Strong demand".into(),
            },
            interview_evaluation: None,
            sources: vec![],
        }
    }

    #[test]
    fn renders_headline_verdict_and_sections() {
        let md = render_markdown(&sample_report());
        assert!(md.starts_with("# DeskShare\n_Airbnb for co-working desks_"));
        assert!(md.contains("## Verdict: \u{1F7E2} PURSUE"));
        assert!(md.contains("**Confidence:** 85%"));
        assert!(md.contains("## Executive Summary"));
        assert!(md.contains("| WeWork |"));
        assert!(md.contains("- [ ] Search"));
    }

    #[test]
    fn pairs_mitigations_by_index_with_na_fallback() {
        let md = render_markdown(&sample_report());
        assert!(md.contains("**Risk 1:** Cold start\n> *Mitigation:* Seed supply"));
        assert!(md.contains("**Risk 2:** Churn\n> *Mitigation:* N/A"));
    }

    #[test]
    fn omits_optional_sections_when_absent() {
        let mut report = sample_report();
        report.market.competitors.clear();
        report.risks.top_risks.clear();
        report.execution.mvp_scope.clear();
        let md = render_markdown(&report);
        assert!(!md.contains("### Competitors"));
        assert!(md.contains("No major risks identified."));
        assert!(md.contains("No MVP scope defined."));
        assert!(!md.contains("## Interview Feedback"));
        assert!(!md.contains("## Sources"));
    }

    #[test]
    fn renders_interview_feedback_and_sources_when_present() {
        let mut report = sample_report();
        report.interview_evaluation = Some(InterviewEvaluation {
            evaluations: vec![AnswerEvaluation {
                question_id: "1".into(),
                question_text: "Who pays?".into(),
                answer_text: "The renter".into(),
                analysis: "Clear".into(),
                suggestions: vec![],
                concerns: vec!["Price sensitivity".into()],
            }],
            summary: "Solid answers".into(),
        });
        report.sources = vec![Source {
            title: "Remote Work Report".into(),
            url: "https://example.com/report".into(),
            snippet: Some("42% of workers".into()),
        }];
        let md = render_markdown(&report);
        assert!(md.contains("## Interview Feedback\nSolid answers"));
        assert!(md.contains("**Q:** Who pays?"));
        assert!(md.contains("> \u{26A0} Price sensitivity"));
        assert!(md.contains("- [Remote Work Report](https://example.com/report)"));
        assert!(md.contains("  - *\"42% of workers\"*"));
    }
}
