use mockview_schema::lenient;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::extract::extract;
use crate::gateway::Gateway;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactIssue {
    #[serde(default, deserialize_with = "lenient::text")]
    pub claim: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub problem: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub severity: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    #[serde(default, deserialize_with = "lenient::text")]
    pub wrong: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub correct: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckResult {
    #[serde(default = "accurate_by_default", deserialize_with = "accuracy")]
    pub is_accurate: bool,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub issues: Vec<FactIssue>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub corrections: Vec<Correction>,
}

impl FactCheckResult {
    pub fn accurate() -> Self {
        Self {
            is_accurate: true,
            issues: Vec::new(),
            corrections: Vec::new(),
        }
    }

    /// Text handed to the interviewer. Present only for an inaccurate claim with a correction.
    pub fn correction_text(&self) -> Option<String> {
        if self.is_accurate {
            return None;
        }
        let first = self.corrections.first()?;
        Some(format!(
            "Wrong: '{}'. Correct: '{}'",
            first.wrong, first.correct
        ))
    }
}

fn accurate_by_default() -> bool {
    true
}

fn accuracy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => !s.trim().eq_ignore_ascii_case("false"),
        _ => true,
    })
}

/// Verifies a suspicious claim. Unreadable output means "accurate, no issues".
pub async fn check_facts(
    gateway: &Gateway,
    claim: &str,
    context: &str,
    temperature: f32,
) -> FactCheckResult {
    let raw = gateway
        .generate(&fact_check_prompt(claim, context), temperature)
        .await;
    extract::<FactCheckResult>(&raw).unwrap_or_else(FactCheckResult::accurate)
}

fn fact_check_prompt(claim: &str, context: &str) -> String {
    let context = if context.is_empty() {
        "[no context]"
    } else {
        context
    };

    format!(
        r#"You are the FactChecker. You verify technical statements for accuracy.

STATEMENT TO CHECK:
"{claim}"

CONTEXT:
{context}

KNOWN FACTS:
- Python: current versions are 3.9 to 3.13. Python 4.0 does NOT exist and is not planned.
- Django: versions 4.x and 5.x
- JavaScript: ES2020, ES2021, ES2022, ES2023
- Basic constructs (for/while loops, functions, classes) are fundamental and are not going away
- The GIL in Python is a real concept
- OOP, REST and SQL are real and current technologies

COMMON MYTHS:
- "Python 4.0 is coming soon" is FALSE
- "Loops will be replaced by neural networks" is NONSENSE
- "SQL is obsolete" is FALSE
- "OOP is no longer needed" is FALSE

Check the statement and reply with JSON:
{{"is_accurate": true/false, "issues": [{{"claim": "what is wrong", "problem": "why", "severity": "critical/major/minor"}}], "corrections": [{{"wrong": "incorrect", "correct": "correct"}}]}}"#
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{gateway, Broken, Canned};

    #[tokio::test]
    async fn inaccurate_claim_yields_correction_text() {
        let provider = Canned::new(
            r#"```json
{"is_accurate": false,
 "issues": [{"claim": "Python 4.0", "problem": "does not exist", "severity": "critical"}],
 "corrections": [{"wrong": "Python 4.0 is out", "correct": "the latest major version is Python 3"}]}
```"#,
        );
        let gw = gateway(provider.clone());
        let result = check_facts(&gw, "Python 4.0 is out", "", 0.1).await;

        assert!(!result.is_accurate);
        assert_eq!(result.issues[0].severity, "critical");
        assert_eq!(
            result.correction_text().unwrap(),
            "Wrong: 'Python 4.0 is out'. Correct: 'the latest major version is Python 3'"
        );
        assert!(provider.last_prompt().starts_with("You are the FactChecker"));
    }

    #[tokio::test]
    async fn failures_default_to_accurate() {
        let gw = gateway(Arc::new(Broken));
        let result = check_facts(&gw, "claim", "ctx", 0.1).await;
        assert_eq!(result, FactCheckResult::accurate());
        assert!(result.correction_text().is_none());
    }

    #[test]
    fn missing_accuracy_field_means_accurate() {
        let parsed: FactCheckResult = serde_json::from_str(r#"{"issues": []}"#).unwrap();
        assert!(parsed.is_accurate);

        let parsed: FactCheckResult = serde_json::from_str(r#"{"is_accurate": "false"}"#).unwrap();
        assert!(!parsed.is_accurate);
        // No correction pair, nothing to inject.
        assert!(parsed.correction_text().is_none());
    }
}
