//! # Interview Evaluator Agent
//!
//! Judges the quality of the user's interview answers. Only runs when an
//! interview with at least one answer exists.

use std::sync::Arc;

use crate::contracts::{Interview, InterviewEvaluation};
use crate::error::AgentError;
use crate::generation::{GenerationPort, OutputShape};

use super::{compose_prompt, decode_output};

const SYSTEM_PROMPT: &str = include_str!("prompts/evaluator.md");

pub struct InterviewEvaluatorAgent {
    port: Arc<dyn GenerationPort>,
}

impl InterviewEvaluatorAgent {
    pub const NAME: &'static str = "InterviewEvaluatorAgent";

    pub fn new(port: Arc<dyn GenerationPort>) -> Self {
        Self { port }
    }

    pub async fn run(&self, interview: &Interview) -> Result<InterviewEvaluation, AgentError> {
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(InterviewEvaluation))
            .map_err(|e| AgentError::Output(e.to_string()))?;
        let transcript = format_transcript(interview);
        let prompt = compose_prompt(
            SYSTEM_PROMPT,
            &schema,
            &format!("Evaluate this interview:\n{transcript}"),
        );
        let value = self
            .port
            .invoke(Self::NAME, &prompt, OutputShape::Json)
            .await?;
        decode_output(Self::NAME, value)
    }
}

fn format_transcript(interview: &Interview) -> String {
    let mut text = String::from("Questions and Answers:\n");
    for question in &interview.questions {
        let answer = interview
            .answers
            .get(&question.id)
            .map(String::as_str)
            .unwrap_or("No answer provided");
        text.push_str(&format!(
            "[{}] Q: {}\nA: {}\n\n",
            question.id, question.text, answer
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::Question;
    use crate::test_support::ScriptedPort;

    fn interview() -> Interview {
        let mut interview = Interview {
            questions: vec![
                Question {
                    id: "1".into(),
                    text: "Who pays?".into(),
                    guidance: None,
                },
                Question {
                    id: "2".into(),
                    text: "Why now?".into(),
                    guidance: None,
                },
            ],
            answers: Default::default(),
        };
        interview.answers.insert("1".into(), "The space owners".into());
        interview
    }

    #[test]
    fn transcript_marks_unanswered_questions() {
        let text = format_transcript(&interview());
        assert!(text.contains("A: The space owners"));
        assert!(text.contains("A: No answer provided"));
    }

    #[tokio::test]
    async fn decodes_evaluation() {
        let port = Arc::new(ScriptedPort::new());
        port.enqueue(
            InterviewEvaluatorAgent::NAME,
            serde_json::json!({
                "evaluations": [{
                    "question_id": "1",
                    "question_text": "Who pays?",
                    "answer_text": "The space owners",
                    "analysis": "Clear revenue side",
                    "suggestions": [],
                    "concerns": []
                }],
                "summary": "One answer, one gap"
            }),
        );

        let evaluation = InterviewEvaluatorAgent::new(port)
            .run(&interview())
            .await
            .unwrap();
        assert_eq!(evaluation.evaluations.len(), 1);
        assert_eq!(evaluation.summary, "One answer, one gap");
    }
}
