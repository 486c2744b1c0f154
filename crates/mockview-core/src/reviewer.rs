use mockview_schema::{lenient, truncate_chars, AnalysisResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::extract::extract;
use crate::gateway::Gateway;

const TOPICS_IN_PROMPT: usize = 5;
const QUESTION_IN_PROMPT: usize = 100;

/// Outcome of reviewing an interviewer draft before it is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewVerdict {
    #[serde(default = "approved_by_default", deserialize_with = "approval")]
    pub is_ok: bool,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub issues: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub fix_instruction: String,
}

fn approved_by_default() -> bool {
    true
}

/// Only an explicit `false` (or "false"/"no") rejects; any other shape approves.
fn approval<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => {
            let s = s.trim();
            !(s.eq_ignore_ascii_case("false") || s.eq_ignore_ascii_case("no"))
        }
        _ => approved_by_default(),
    })
}

impl ReviewVerdict {
    pub fn approve() -> Self {
        Self {
            is_ok: true,
            issues: Vec::new(),
            fix_instruction: String::new(),
        }
    }

    /// The instruction for a second draft, if the review asks for one.
    pub fn repair_instruction(&self) -> Option<&str> {
        let fix = self.fix_instruction.trim();
        (!self.is_ok && !fix.is_empty()).then_some(fix)
    }
}

/// Checks `draft` against the rules implied by the turn's flags.
/// Unreadable output approves the draft.
pub async fn review(
    gateway: &Gateway,
    draft: &str,
    analysis: &AnalysisResult,
    last_question: &str,
    topics_done: &[String],
    temperature: f32,
) -> ReviewVerdict {
    let flags = analysis
        .flags
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let start = topics_done.len().saturating_sub(TOPICS_IN_PROMPT);
    let topics = if topics_done.is_empty() {
        "none".to_string()
    } else {
        topics_done[start..].join(", ")
    };

    let prompt = format!(
        r#"Review the interviewer reply before it is sent to the candidate.

INTERVIEWER REPLY:
"{draft}"

CONTEXT:
- Flags on the candidate's last answer: [{flags}]
- Previous question: "{question}"
- Topics already discussed: {topics}

CHECK:
1. With "hallucination_detected" the interviewer MUST correct the false statement
2. With "candidate_question" the interviewer MUST answer the question
3. With "off_topic_attempt" the interviewer MUST return to the interview
4. The new question must NOT repeat a topic that was already discussed

Reply with JSON:
{{"is_ok": true/false, "issues": ["problem"], "fix_instruction": "how to fix it"}}"#,
        question = truncate_chars(last_question, QUESTION_IN_PROMPT),
    );

    let raw = gateway.generate(&prompt, temperature).await;
    extract::<ReviewVerdict>(&raw).unwrap_or_else(ReviewVerdict::approve)
}
