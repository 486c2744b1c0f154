use std::collections::BTreeMap;

use mockview_schema::{lenient, truncate_chars, DepthScore};
use serde::Deserialize;

use crate::extract::extract;
use crate::gateway::Gateway;

const ANSWER_MAX_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
struct DepthRating {
    #[serde(deserialize_with = "lenient::number")]
    level: u32,
    #[serde(default, deserialize_with = "lenient::text")]
    reason: String,
}

/// Highest demonstrated depth per topic. Levels never go down within a session.
#[derive(Debug, Clone)]
pub struct DepthTracker {
    scores: BTreeMap<String, DepthScore>,
    min_answer_chars: usize,
}

impl DepthTracker {
    pub fn new(min_answer_chars: usize) -> Self {
        Self {
            scores: BTreeMap::new(),
            min_answer_chars,
        }
    }

    /// Rates `answer` for `topic` and returns the observed level, or 0 when
    /// nothing was rated (blank topic, short answer, unreadable output).
    pub async fn process(
        &mut self,
        gateway: &Gateway,
        topic: &str,
        answer: &str,
        temperature: f32,
    ) -> u8 {
        let topic = topic.trim();
        if topic.is_empty() || answer.chars().count() < self.min_answer_chars {
            return 0;
        }

        let prompt = depth_prompt(topic, &truncate_chars(answer, ANSWER_MAX_CHARS));
        let raw = gateway.generate(&prompt, temperature).await;
        let Some(rating) = extract::<DepthRating>(&raw) else {
            tracing::debug!("depth rating for {topic} unreadable, skipping");
            return 0;
        };
        if rating.level == 0 {
            return 0;
        }

        let level = rating.level.min(5) as u8;
        self.record(topic, level, rating.reason);
        level
    }

    /// Stores `level` only when it beats the stored one. Returns whether it did.
    pub fn record(&mut self, topic: &str, level: u8, evidence: impl Into<String>) -> bool {
        let key = topic.trim().to_lowercase();
        let previous = self.scores.get(&key).map_or(0, |s| s.level);
        if level <= previous {
            return false;
        }
        self.scores.insert(
            key,
            DepthScore {
                level,
                evidence: evidence.into(),
            },
        );
        true
    }

    pub fn level(&self, topic: &str) -> u8 {
        self.scores
            .get(&topic.trim().to_lowercase())
            .map_or(0, |s| s.level)
    }

    pub fn summary(&self) -> &BTreeMap<String, DepthScore> {
        &self.scores
    }
}

fn depth_prompt(topic: &str, answer: &str) -> String {
    format!(
        r#"Rate how deeply the candidate understands "{topic}" based on their answer.

ANSWER:
"{answer}"

LEVELS:
1 = has heard the name, does not understand the idea
2 = understands the basic concept
3 = can use it in practice
4 = understands nuances, trade-offs, when NOT to use it
5 = expert, can teach others, knows the edge cases

JSON:
{{"level": 1-5, "reason": "short explanation"}}"#
    )
}
