use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use mockview_schema::{
    truncate_chars, Candidate, FeedbackFormat, FeedbackReport, Flag, GapRecord, SessionLog,
    SkillRecord, TurnRecord,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::InterviewSettings;
use crate::context::ConversationContext;
use crate::contradiction::ContradictionMemory;
use crate::depth::DepthTracker;
use crate::difficulty::DifficultyController;

const EVIDENCE_MAX_CHARS: usize = 100;
const UNRATED_SKILL_SCORE: u8 = 5;
const DEFAULT_GAP_SEVERITY: &str = "medium";

/// Counts returned alongside the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub turns: usize,
    pub skills_found: usize,
    pub gaps_found: usize,
    /// Distinct flags raised during the session.
    pub flags: Vec<Flag>,
}

/// All mutable state of one interview. Owned by whoever drives the pipeline;
/// never shared between two running turns.
#[derive(Debug, Clone)]
pub struct InterviewSession {
    pub(crate) id: Uuid,
    pub(crate) candidate: Candidate,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) context: ConversationContext,
    pub(crate) turns: Vec<TurnRecord>,
    pub(crate) difficulty: DifficultyController,
    pub(crate) skills: Vec<SkillRecord>,
    pub(crate) gaps: Vec<GapRecord>,
    pub(crate) flags: Vec<Flag>,
    pub(crate) claims: ContradictionMemory,
    pub(crate) depth: DepthTracker,
    pub(crate) last_question: String,
    pub(crate) finished: bool,
    pub(crate) feedback: Option<FeedbackReport>,
}

impl InterviewSession {
    pub fn new(candidate: Candidate, settings: &InterviewSettings) -> Self {
        let difficulty = DifficultyController::for_grade(&candidate.grade);
        Self {
            id: Uuid::new_v4(),
            candidate,
            started_at: Utc::now(),
            context: ConversationContext::new(),
            turns: Vec::new(),
            difficulty,
            skills: Vec::new(),
            gaps: Vec::new(),
            flags: Vec::new(),
            claims: ContradictionMemory::new(settings.claim_min_chars, settings.claim_window),
            depth: DepthTracker::new(settings.depth_min_answer_chars),
            last_question: String::new(),
            finished: false,
            feedback: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    pub fn turns(&self) -> &[TurnRecord] {
        &self.turns
    }

    /// Id the next candidate message will get. Turn 0 is the greeting.
    pub fn next_turn_id(&self) -> u32 {
        self.turns.len() as u32 + 1
    }

    pub fn difficulty(&self) -> &DifficultyController {
        &self.difficulty
    }

    pub fn skills(&self) -> &[SkillRecord] {
        &self.skills
    }

    pub fn gaps(&self) -> &[GapRecord] {
        &self.gaps
    }

    /// Every flag raised so far, repeats included.
    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    pub fn flag_count(&self, flag: Flag) -> usize {
        self.flags.iter().filter(|f| **f == flag).count()
    }

    pub fn distinct_flags(&self) -> Vec<Flag> {
        let distinct: BTreeSet<Flag> = self.flags.iter().copied().collect();
        distinct.into_iter().collect()
    }

    pub fn claims(&self) -> &ContradictionMemory {
        &self.claims
    }

    pub fn depth(&self) -> &DepthTracker {
        &self.depth
    }

    pub fn last_question(&self) -> &str {
        &self.last_question
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn feedback(&self) -> Option<&FeedbackReport> {
        self.feedback.as_ref()
    }

    /// Adds a skill unless the topic (case-insensitive) is already in the ledger.
    /// The score is twice the topic's depth level, or 5 when it was never rated.
    pub fn record_skill(&mut self, topic: &str, evidence: &str, turn_id: u32) -> bool {
        let topic = topic.trim();
        if topic.is_empty() || contains_topic(self.skills.iter().map(|s| s.topic.as_str()), topic) {
            return false;
        }
        self.skills.push(SkillRecord {
            topic: topic.to_string(),
            evidence: truncate_chars(evidence, EVIDENCE_MAX_CHARS),
            turn_id,
            score: skill_score(self.depth.level(topic)),
        });
        true
    }

    /// Adds a gap unless the topic (case-insensitive) is already in the ledger.
    pub fn record_gap(&mut self, topic: &str, question: &str, answer: &str, turn_id: u32) -> bool {
        let topic = topic.trim();
        if topic.is_empty() || contains_topic(self.gaps.iter().map(|g| g.topic.as_str()), topic) {
            return false;
        }
        self.gaps.push(GapRecord {
            topic: topic.to_string(),
            question: truncate_chars(question, EVIDENCE_MAX_CHARS),
            candidate_answer: truncate_chars(answer, EVIDENCE_MAX_CHARS),
            correct_answer: None,
            turn_id,
            severity: DEFAULT_GAP_SEVERITY.to_string(),
        });
        true
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            turns: self.turns.len(),
            skills_found: self.skills.len(),
            gaps_found: self.gaps.len(),
            flags: self.distinct_flags(),
        }
    }

    pub fn to_log(&self, format: FeedbackFormat) -> SessionLog {
        SessionLog::build(
            &self.candidate.name,
            &self.turns,
            self.feedback.as_ref(),
            format,
        )
    }
}

fn skill_score(depth_level: u8) -> u8 {
    if depth_level == 0 {
        UNRATED_SKILL_SCORE
    } else {
        (depth_level * 2).min(10)
    }
}

fn contains_topic<'a>(mut existing: impl Iterator<Item = &'a str>, topic: &str) -> bool {
    let key = topic.to_lowercase();
    existing.any(|t| t.trim().to_lowercase() == key)
}
