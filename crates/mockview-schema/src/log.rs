use serde::{Deserialize, Serialize};

use crate::feedback::FeedbackReport;
use crate::session::TurnRecord;

/// How the final feedback block of a session log is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackFormat {
    #[default]
    Text,
    Structured,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FinalFeedback {
    Structured(Box<FeedbackReport>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnLogEntry {
    pub turn_id: u32,
    pub agent_visible_message: String,
    pub user_message: String,
    pub internal_thoughts: String,
}

impl From<&TurnRecord> for TurnLogEntry {
    fn from(turn: &TurnRecord) -> Self {
        Self {
            turn_id: turn.turn_id,
            agent_visible_message: turn.interviewer_message.clone(),
            user_message: turn.candidate_message.clone(),
            internal_thoughts: turn.flattened_thoughts(),
        }
    }
}

/// The record handed to front ends and log writers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    pub participant_name: String,
    pub turns: Vec<TurnLogEntry>,
    pub final_feedback: FinalFeedback,
}

impl SessionLog {
    pub fn build(
        participant_name: &str,
        turns: &[TurnRecord],
        feedback: Option<&FeedbackReport>,
        format: FeedbackFormat,
    ) -> Self {
        let final_feedback = match (feedback, format) {
            (Some(report), FeedbackFormat::Structured) => {
                FinalFeedback::Structured(Box::new(report.clone()))
            }
            (Some(report), FeedbackFormat::Text) => FinalFeedback::Text(report.render_text()),
            (None, _) => FinalFeedback::Text(String::new()),
        };
        Self {
            participant_name: participant_name.to_string(),
            turns: turns.iter().map(TurnLogEntry::from).collect(),
            final_feedback,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnswerQuality, Stage, Thought};

    fn turn() -> TurnRecord {
        TurnRecord {
            turn_id: 1,
            candidate_message: "I use Postgres daily".into(),
            interviewer_message: "Tell me about yourself".into(),
            thoughts: vec![Thought::new(Stage::Observer, "Quality: good")],
            difficulty: 3,
            flags: vec![],
            quality: AnswerQuality::Good,
        }
    }

    #[test]
    fn turn_entry_pairs_answer_with_preceding_question() {
        let log = SessionLog::build("Ann", &[turn()], None, FeedbackFormat::Text);
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["participant_name"], "Ann");
        assert_eq!(json["turns"][0]["agent_visible_message"], "Tell me about yourself");
        assert_eq!(json["turns"][0]["user_message"], "I use Postgres daily");
        assert_eq!(json["turns"][0]["internal_thoughts"], "[Observer]: Quality: good");
        assert_eq!(json["final_feedback"], "");
    }
}
