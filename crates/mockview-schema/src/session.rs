use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{AnswerQuality, Flag};

/// Who is being interviewed and for what.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub position: String,
    pub grade: String,
    #[serde(default)]
    pub experience: String,
}

impl Candidate {
    pub fn new(
        name: impl Into<String>,
        position: impl Into<String>,
        grade: impl Into<String>,
        experience: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            position: position.into(),
            grade: grade.into(),
            experience: experience.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Candidate,
    Interviewer,
}

impl Role {
    pub fn speaker(self) -> &'static str {
        match self {
            Self::Candidate => "Candidate",
            Self::Interviewer => "Interviewer",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// The pipeline stage that produced an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Observer,
    FactChecker,
    ContradictionDetector,
    DepthProber,
    DifficultyController,
    Interviewer,
    MetaReviewer,
    Evaluator,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Observer => "Observer",
            Self::FactChecker => "FactChecker",
            Self::ContradictionDetector => "ContradictionDetector",
            Self::DepthProber => "DepthProber",
            Self::DifficultyController => "DifficultyController",
            Self::Interviewer => "Interviewer",
            Self::MetaReviewer => "MetaReviewer",
            Self::Evaluator => "Evaluator",
        };
        f.write_str(name)
    }
}

/// One stage's free-text rationale for a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thought {
    pub stage: Stage,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl Thought {
    pub fn new(stage: Stage, text: impl Into<String>) -> Self {
        Self {
            stage,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRecord {
    pub topic: String,
    pub evidence: String,
    pub turn_id: u32,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapRecord {
    pub topic: String,
    pub question: String,
    pub candidate_answer: String,
    #[serde(default)]
    pub correct_answer: Option<String>,
    pub turn_id: u32,
    pub severity: String,
}

/// Highest depth level observed for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthScore {
    pub level: u8,
    pub evidence: String,
}

/// A finished candidate turn. Never modified after it is appended to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn_id: u32,
    pub candidate_message: String,
    /// The interviewer message the candidate was answering.
    pub interviewer_message: String,
    pub thoughts: Vec<Thought>,
    pub difficulty: u8,
    pub flags: Vec<Flag>,
    pub quality: AnswerQuality,
}

impl TurnRecord {
    /// One line per annotation: `[Stage]: first line`, capped at 550 characters.
    pub fn flattened_thoughts(&self) -> String {
        self.thoughts
            .iter()
            .map(|t| {
                let first = t.text.lines().next().unwrap_or_default();
                format!("[{}]: {}", t.stage, truncate_chars(first, 550))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Character-safe prefix of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattened_thoughts_keep_first_line_only() {
        let turn = TurnRecord {
            turn_id: 1,
            candidate_message: "hi".into(),
            interviewer_message: "hello".into(),
            thoughts: vec![
                Thought::new(Stage::Observer, "Quality: good\nsecond line"),
                Thought::new(Stage::Interviewer, "x".repeat(600)),
            ],
            difficulty: 2,
            flags: vec![],
            quality: AnswerQuality::Good,
        };
        let flat = turn.flattened_thoughts();
        let lines: Vec<&str> = flat.lines().collect();
        assert_eq!(lines[0], "[Observer]: Quality: good");
        assert_eq!(lines[1].len(), "[Interviewer]: ".len() + 550);
    }

    #[test]
    fn truncate_chars_respects_multibyte() {
        assert_eq!(truncate_chars("привет", 3), "при");
        assert_eq!(truncate_chars("ok", 10), "ok");
    }
}
