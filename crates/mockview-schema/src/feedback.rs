use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lenient::{self, normalize_label};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum HiringRecommendation {
    #[serde(rename = "Strong Hire")]
    StrongHire,
    #[serde(rename = "Hire")]
    Hire,
    #[default]
    #[serde(rename = "Maybe")]
    Maybe,
    #[serde(rename = "No Hire")]
    NoHire,
    #[serde(rename = "Strong No Hire")]
    StrongNoHire,
}

impl HiringRecommendation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrongHire => "Strong Hire",
            Self::Hire => "Hire",
            Self::Maybe => "Maybe",
            Self::NoHire => "No Hire",
            Self::StrongNoHire => "Strong No Hire",
        }
    }

    pub fn is_rejection(self) -> bool {
        matches!(self, Self::NoHire | Self::StrongNoHire)
    }
}

impl From<String> for HiringRecommendation {
    fn from(raw: String) -> Self {
        match normalize_label(&raw).as_str() {
            "strong_hire" => Self::StrongHire,
            "hire" => Self::Hire,
            "no_hire" => Self::NoHire,
            "strong_no_hire" => Self::StrongNoHire,
            _ => Self::Maybe,
        }
    }
}

impl fmt::Display for HiringRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(default, deserialize_with = "lenient::text")]
    pub evaluated_grade: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub hiring_recommendation: HiringRecommendation,
    #[serde(default, deserialize_with = "lenient::number")]
    pub confidence_score: u32,
    #[serde(default, deserialize_with = "lenient::text")]
    pub explanation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedSkill {
    #[serde(default, deserialize_with = "lenient::text")]
    pub topic: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub evidence: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub score: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGap {
    #[serde(default, deserialize_with = "lenient::text")]
    pub topic: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub question_asked: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub candidate_answer: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub correct_answer: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub severity: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalReview {
    #[serde(default, deserialize_with = "lenient::number")]
    pub overall_score: u32,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub confirmed_skills: Vec<ConfirmedSkill>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub knowledge_gaps: Vec<KnowledgeGap>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftSkillScore {
    #[serde(default, deserialize_with = "lenient::number")]
    pub score: u32,
    #[serde(default, deserialize_with = "lenient::text")]
    pub comment: String,
}

impl SoftSkillScore {
    pub fn new(score: u32) -> Self {
        Self {
            score,
            comment: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftSkillsReview {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub clarity: SoftSkillScore,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub honesty: SoftSkillScore,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub engagement: SoftSkillScore,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub professionalism: SoftSkillScore,
}

impl SoftSkillsReview {
    pub fn entries(&self) -> [(&'static str, &SoftSkillScore); 4] {
        [
            ("clarity", &self.clarity),
            ("honesty", &self.honesty),
            ("engagement", &self.engagement),
            ("professionalism", &self.professionalism),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadmapTopic {
    #[serde(default, deserialize_with = "lenient::text")]
    pub topic: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub why: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub priority: String,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roadmap {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub priority_topics: Vec<RoadmapTopic>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub recommended_actions: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub estimated_time: String,
}

/// Final verdict on a session. Produced once, when the session is sealed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackReport {
    pub decision: Decision,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub technical_review: TechnicalReview,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub soft_skills_review: SoftSkillsReview,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub roadmap: Roadmap,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub red_flags: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub green_flags: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub summary: String,
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
}

impl FeedbackReport {
    /// Plain-text rendering used by the formatted session log.
    pub fn render_text(&self) -> String {
        let mut lines = Vec::new();

        let dec = &self.decision;
        lines.push("VERDICT".to_string());
        lines.push(format!("Grade: {}", or_na(&dec.evaluated_grade)));
        lines.push(format!("Recommendation: {}", dec.hiring_recommendation));
        lines.push(format!("Confidence: {}%", dec.confidence_score));
        lines.push(format!("Explanation: {}", dec.explanation));
        lines.push(String::new());

        let tech = &self.technical_review;
        lines.push(format!("TECHNICAL SKILLS ({}/10)", tech.overall_score));
        for skill in tech.confirmed_skills.iter().take(8) {
            lines.push(format!("+ {} ({}/10)", skill.topic, skill.score));
        }
        if !tech.knowledge_gaps.is_empty() {
            lines.push("Gaps:".to_string());
            for gap in tech.knowledge_gaps.iter().take(8) {
                let severity = if gap.severity.is_empty() {
                    "medium"
                } else {
                    gap.severity.as_str()
                };
                lines.push(format!("- {} [{severity}]", gap.topic));
            }
        }
        lines.push(String::new());

        lines.push("SOFT SKILLS".to_string());
        for (name, entry) in self.soft_skills_review.entries() {
            lines.push(format!("{name}: {}/10", entry.score));
        }
        lines.push(String::new());

        if !self.roadmap.priority_topics.is_empty() {
            lines.push("ROADMAP".to_string());
            for topic in self.roadmap.priority_topics.iter().take(5) {
                lines.push(format!("* {}", topic.topic));
                for url in topic.resources.iter().take(2) {
                    lines.push(format!("    {url}"));
                }
            }
            lines.push(String::new());
        }

        push_section(&mut lines, "RED FLAGS", &self.red_flags);
        push_section(&mut lines, "GREEN FLAGS", &self.green_flags);

        if !self.summary.is_empty() {
            lines.push("SUMMARY".to_string());
            lines.push(self.summary.clone());
        }

        lines.join("\n")
    }
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}

fn push_section(lines: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    lines.push(title.to_string());
    for item in items {
        lines.push(format!("    {item}"));
    }
    lines.push(String::new());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_requires_decision_but_tolerates_missing_sections() {
        let report: FeedbackReport = serde_json::from_str(
            r#"{"decision": {"evaluated_grade": "Middle", "hiring_recommendation": "hire",
                "confidence_score": "80", "explanation": "solid"}}"#,
        )
        .unwrap();
        assert_eq!(report.decision.hiring_recommendation, HiringRecommendation::Hire);
        assert_eq!(report.decision.confidence_score, 80);
        assert!(report.technical_review.confirmed_skills.is_empty());

        assert!(serde_json::from_str::<FeedbackReport>(r#"{"summary": "x"}"#).is_err());
    }

    #[test]
    fn recommendation_accepts_spelling_variants() {
        assert_eq!(
            HiringRecommendation::from("Strong No Hire".to_string()),
            HiringRecommendation::StrongNoHire
        );
        assert_eq!(
            HiringRecommendation::from("no-hire".to_string()),
            HiringRecommendation::NoHire
        );
        assert_eq!(
            serde_json::to_value(HiringRecommendation::StrongHire).unwrap(),
            "Strong Hire"
        );
    }

    #[test]
    fn render_text_lists_sections() {
        let report = FeedbackReport {
            decision: Decision {
                evaluated_grade: "Junior".into(),
                hiring_recommendation: HiringRecommendation::Maybe,
                confidence_score: 50,
                explanation: "mixed".into(),
            },
            technical_review: TechnicalReview {
                overall_score: 5,
                confirmed_skills: vec![ConfirmedSkill {
                    topic: "SQL".into(),
                    evidence: String::new(),
                    score: 6,
                }],
                knowledge_gaps: vec![KnowledgeGap {
                    topic: "Docker".into(),
                    ..Default::default()
                }],
            },
            soft_skills_review: SoftSkillsReview::default(),
            roadmap: Roadmap {
                priority_topics: vec![RoadmapTopic {
                    topic: "Docker".into(),
                    why: String::new(),
                    priority: "high".into(),
                    resources: vec!["a".into(), "b".into(), "c".into()],
                }],
                ..Default::default()
            },
            red_flags: vec![],
            green_flags: vec!["curious".into()],
            summary: "ok".into(),
            generated_at: Utc::now(),
        };
        let text = report.render_text();
        assert!(text.contains("Recommendation: Maybe"));
        assert!(text.contains("+ SQL (6/10)"));
        assert!(text.contains("- Docker [medium]"));
        assert!(text.contains("GREEN FLAGS"));
        assert!(!text.contains("RED FLAGS"));
        assert!(!text.contains("    c"));
    }
}
