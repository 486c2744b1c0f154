use mockview_schema::{lenient, truncate_chars};
use serde::{Deserialize, Serialize};

use crate::extract::extract;
use crate::gateway::Gateway;

const CLAIM_MAX_CHARS: usize = 300;

/// A substantive statement the candidate made earlier in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub turn_id: u32,
    pub text: String,
}

/// A detected conflict between the latest message and an earlier claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContradictionFinding {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub found: bool,
    #[serde(default, deserialize_with = "lenient::text")]
    pub old_text: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub old_turn: u32,
    #[serde(default, deserialize_with = "lenient::text")]
    pub conflict: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub question: String,
}

/// Append-only memory of candidate claims, checked against each new message.
#[derive(Debug, Clone)]
pub struct ContradictionMemory {
    claims: Vec<Claim>,
    min_chars: usize,
    window: usize,
}

impl ContradictionMemory {
    pub fn new(min_chars: usize, window: usize) -> Self {
        Self {
            claims: Vec::new(),
            min_chars,
            window: window.max(1),
        }
    }

    /// Keeps `text` if it is longer than the minimum. Returns whether it was kept.
    pub fn remember(&mut self, turn_id: u32, text: &str) -> bool {
        if text.chars().count() <= self.min_chars {
            return false;
        }
        self.claims.push(Claim {
            turn_id,
            text: truncate_chars(text, CLAIM_MAX_CHARS),
        });
        true
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    fn recent(&self) -> &[Claim] {
        let start = self.claims.len().saturating_sub(self.window);
        &self.claims[start..]
    }

    /// Compares `message` with the most recent claims.
    ///
    /// Returns `None` without calling the gateway when fewer than two claims
    /// are stored. Unreadable output counts as "no contradiction".
    pub async fn check(
        &self,
        gateway: &Gateway,
        message: &str,
        turn_id: u32,
        temperature: f32,
    ) -> Option<ContradictionFinding> {
        if self.claims.len() < 2 {
            return None;
        }

        let prompt = self.prompt(message, turn_id);
        let raw = gateway.generate(&prompt, temperature).await;
        let finding = extract::<ContradictionFinding>(&raw)?;
        if !finding.found {
            return None;
        }
        tracing::info!(
            "contradiction between turn {} and turn {turn_id}",
            finding.old_turn
        );
        Some(finding)
    }

    fn prompt(&self, message: &str, turn_id: u32) -> String {
        let earlier = self
            .recent()
            .iter()
            .map(|c| format!("[Turn {}]: {}", c.turn_id, c.text))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"Check whether the new message contradicts what the candidate said earlier.

WHAT THE CANDIDATE SAID BEFORE:
{earlier}

NEW MESSAGE (turn {turn_id}):
"{message}"

A contradiction is:
- earlier "I know X", now "I don't know X"
- earlier "worked with Y for 3 years", now "just started learning Y"
- mutually exclusive facts about experience or knowledge

NOT a contradiction:
- clarifying details
- "I was wrong, actually..."
- talking about a different aspect of the topic

Reply with JSON:
{{"found": true/false, "old_text": "what was said", "old_turn": N, "conflict": "what conflicts", "question": "a soft clarifying question"}}"#
        )
    }
}
