use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::lenient::{self, normalize_label};

/// How good the latest answer was, as judged by the observer stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum AnswerQuality {
    Excellent,
    Good,
    #[default]
    Adequate,
    Poor,
    Wrong,
    OffTopic,
    Hallucination,
    Toxic,
    Refusal,
    /// A label outside the taxonomy. Treated like `adequate` by the difficulty controller.
    Unrecognized,
}

impl AnswerQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Adequate => "adequate",
            Self::Poor => "poor",
            Self::Wrong => "wrong",
            Self::OffTopic => "off_topic",
            Self::Hallucination => "hallucination",
            Self::Toxic => "toxic",
            Self::Refusal => "refusal",
            Self::Unrecognized => "unrecognized",
        }
    }

    pub fn is_strong(self) -> bool {
        matches!(self, Self::Excellent | Self::Good)
    }

    pub fn is_weak(self) -> bool {
        matches!(
            self,
            Self::Poor
                | Self::Wrong
                | Self::Refusal
                | Self::Toxic
                | Self::OffTopic
                | Self::Hallucination
        )
    }

    /// Labels under which a statement is not kept as a claim for later consistency checks.
    pub fn excludes_claim(self) -> bool {
        matches!(self, Self::OffTopic | Self::Toxic | Self::Refusal)
    }
}

impl From<String> for AnswerQuality {
    fn from(raw: String) -> Self {
        match normalize_label(&raw).as_str() {
            "excellent" => Self::Excellent,
            "good" => Self::Good,
            "adequate" => Self::Adequate,
            "poor" => Self::Poor,
            "wrong" => Self::Wrong,
            "off_topic" | "offtopic" => Self::OffTopic,
            "hallucination" => Self::Hallucination,
            "toxic" => Self::Toxic,
            "refusal" => Self::Refusal,
            _ => Self::Unrecognized,
        }
    }
}

impl fmt::Display for AnswerQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum ConfidenceLevel {
    High,
    #[default]
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl From<String> for ConfidenceLevel {
    fn from(raw: String) -> Self {
        match normalize_label(&raw).as_str() {
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum TopicRelevance {
    #[default]
    OnTopic,
    Partial,
    OffTopic,
}

impl TopicRelevance {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnTopic => "on_topic",
            Self::Partial => "partial",
            Self::OffTopic => "off_topic",
        }
    }
}

impl From<String> for TopicRelevance {
    fn from(raw: String) -> Self {
        match normalize_label(&raw).as_str() {
            "partial" => Self::Partial,
            "off_topic" | "offtopic" => Self::OffTopic,
            _ => Self::OnTopic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum FactualAccuracy {
    Accurate,
    Suspicious,
    Hallucination,
    #[default]
    NoTechnical,
}

impl FactualAccuracy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accurate => "accurate",
            Self::Suspicious => "suspicious",
            Self::Hallucination => "hallucination",
            Self::NoTechnical => "no_technical",
        }
    }

    /// Whether the answer should be passed to the fact checker.
    pub fn needs_fact_check(self) -> bool {
        matches!(self, Self::Suspicious | Self::Hallucination)
    }
}

impl From<String> for FactualAccuracy {
    fn from(raw: String) -> Self {
        match normalize_label(&raw).as_str() {
            "accurate" => Self::Accurate,
            "suspicious" => Self::Suspicious,
            "hallucination" => Self::Hallucination,
            _ => Self::NoTechnical,
        }
    }
}

/// Notable condition attached to a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Flag {
    HallucinationDetected,
    OffTopicAttempt,
    ToxicBehavior,
    RefusalToAnswer,
    CandidateQuestion,
    ShowsInterest,
    AdmitsIgnorance,
    AiCopypasteDetected,
    ContradictionDetected,
    Unknown,
}

impl Flag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HallucinationDetected => "hallucination_detected",
            Self::OffTopicAttempt => "off_topic_attempt",
            Self::ToxicBehavior => "toxic_behavior",
            Self::RefusalToAnswer => "refusal_to_answer",
            Self::CandidateQuestion => "candidate_question",
            Self::ShowsInterest => "shows_interest",
            Self::AdmitsIgnorance => "admits_ignorance",
            Self::AiCopypasteDetected => "ai_copypaste_detected",
            Self::ContradictionDetected => "contradiction_detected",
            Self::Unknown => "unknown",
        }
    }
}

impl From<String> for Flag {
    fn from(raw: String) -> Self {
        match normalize_label(&raw).as_str() {
            "hallucination_detected" => Self::HallucinationDetected,
            "off_topic_attempt" => Self::OffTopicAttempt,
            "toxic_behavior" | "toxic_behaviour" => Self::ToxicBehavior,
            "refusal_to_answer" => Self::RefusalToAnswer,
            "candidate_question" => Self::CandidateQuestion,
            "shows_interest" => Self::ShowsInterest,
            "admits_ignorance" => Self::AdmitsIgnorance,
            "ai_copypaste_detected" => Self::AiCopypasteDetected,
            "contradiction_detected" => Self::ContradictionDetected,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-turn classification of the latest candidate message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub answer_quality: AnswerQuality,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub confidence_level: ConfidenceLevel,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub topic_relevance: TopicRelevance,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub factual_accuracy: FactualAccuracy,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub detected_skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub detected_gaps: Vec<String>,
    #[serde(default, deserialize_with = "flag_set")]
    pub flags: Vec<Flag>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub instruction: String,
}

impl AnalysisResult {
    /// Used whenever the observer output cannot be read.
    pub fn neutral() -> Self {
        Self {
            answer_quality: AnswerQuality::Adequate,
            confidence_level: ConfidenceLevel::Medium,
            topic_relevance: TopicRelevance::OnTopic,
            factual_accuracy: FactualAccuracy::NoTechnical,
            detected_skills: Vec::new(),
            detected_gaps: Vec::new(),
            flags: Vec::new(),
            instruction: "continue".to_string(),
        }
    }

    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }

    /// Adds a flag unless the turn already carries it.
    pub fn add_flag(&mut self, flag: Flag) {
        if !self.has_flag(flag) {
            self.flags.push(flag);
        }
    }
}

fn flag_set<'de, D>(deserializer: D) -> Result<Vec<Flag>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = lenient::string_list(deserializer)?;
    let mut flags = Vec::with_capacity(raw.len());
    for flag in raw.into_iter().map(Flag::from) {
        if flag != Flag::Unknown && !flags.contains(&flag) {
            flags.push(flag);
        }
    }
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_parses_with_only_quality() {
        let a: AnalysisResult = serde_json::from_str(r#"{"answer_quality": "good"}"#).unwrap();
        assert_eq!(a.answer_quality, AnswerQuality::Good);
        assert_eq!(a.confidence_level, ConfidenceLevel::Medium);
        assert_eq!(a.factual_accuracy, FactualAccuracy::NoTechnical);
        assert!(a.flags.is_empty());
    }

    #[test]
    fn analysis_requires_quality() {
        let parsed = serde_json::from_str::<AnalysisResult>(r#"{"flags": []}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn unknown_flags_are_dropped_and_duplicates_collapsed() {
        let a: AnalysisResult = serde_json::from_str(
            r#"{"answer_quality": "poor",
                "flags": ["refusal_to_answer", "made_up_flag", "Refusal_To_Answer", "admits_ignorance"]}"#,
        )
        .unwrap();
        assert_eq!(a.flags, vec![Flag::RefusalToAnswer, Flag::AdmitsIgnorance]);
    }

    #[test]
    fn odd_labels_degrade_to_defaults() {
        let a: AnalysisResult = serde_json::from_str(
            r#"{"answer_quality": "Meh", "confidence_level": 3, "topic_relevance": "Off-Topic"}"#,
        )
        .unwrap();
        assert_eq!(a.answer_quality, AnswerQuality::Unrecognized);
        assert_eq!(a.confidence_level, ConfidenceLevel::Medium);
        assert_eq!(a.topic_relevance, TopicRelevance::OffTopic);
    }

    #[test]
    fn labels_serialize_snake_case() {
        let json = serde_json::to_value(AnalysisResult::neutral()).unwrap();
        assert_eq!(json["answer_quality"], "adequate");
        assert_eq!(json["factual_accuracy"], "no_technical");
        assert_eq!(serde_json::to_value(Flag::OffTopicAttempt).unwrap(), "off_topic_attempt");
    }

    #[test]
    fn quality_groups() {
        assert!(AnswerQuality::Good.is_strong());
        assert!(AnswerQuality::Hallucination.is_weak());
        assert!(!AnswerQuality::Adequate.is_weak());
        assert!(!AnswerQuality::Unrecognized.is_strong());
        assert!(AnswerQuality::Refusal.excludes_claim());
        assert!(!AnswerQuality::Poor.excludes_claim());
    }
}
