use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::Utc;
use mockview_schema::{
    Candidate, ConfirmedSkill, Decision, DepthScore, FeedbackReport, Flag, GapRecord,
    HiringRecommendation, KnowledgeGap, Roadmap, RoadmapTopic, SkillRecord, SoftSkillScore,
    SoftSkillsReview, TechnicalReview,
};

use crate::extract::extract;
use crate::gateway::Gateway;
use crate::resources::ResourceLookup;

const ROADMAP_FROM_GAPS: usize = 5;

/// Session state the final report is built from.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInput<'a> {
    pub candidate: &'a Candidate,
    pub history: &'a str,
    pub skills: &'a [SkillRecord],
    pub gaps: &'a [GapRecord],
    /// Every flag raised during the session, repeats included.
    pub flags: &'a [Flag],
    pub turn_count: usize,
    pub depth: &'a BTreeMap<String, DepthScore>,
}

impl EvaluationInput<'_> {
    pub fn count(&self, flag: Flag) -> usize {
        self.flags.iter().filter(|f| **f == flag).count()
    }

    pub fn has(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }

    fn many_refusals(&self) -> bool {
        self.count(Flag::RefusalToAnswer) as f64 > self.turn_count as f64 * 0.4
    }

    fn many_hallucinations(&self) -> bool {
        self.count(Flag::HallucinationDetected) > 2
    }
}

/// Produces the final report. Always returns one: unreadable model output
/// falls back to [`fallback_report`].
pub async fn evaluate(
    gateway: &Gateway,
    input: &EvaluationInput<'_>,
    resources: &dyn ResourceLookup,
    temperature: f32,
) -> FeedbackReport {
    let raw = gateway.generate(&evaluator_prompt(input), temperature).await;
    match extract::<FeedbackReport>(&raw) {
        Some(report) => finalize_report(report, input, resources),
        None => {
            tracing::warn!("evaluator output unreadable, building rule-based report");
            fallback_report(input, resources)
        }
    }
}

/// Cleans up a model-written report: one entry per topic, resources on every
/// roadmap topic, scores in range, a rejection after toxic behaviour.
pub fn finalize_report(
    mut report: FeedbackReport,
    input: &EvaluationInput<'_>,
    resources: &dyn ResourceLookup,
) -> FeedbackReport {
    let tech = &mut report.technical_review;
    tech.confirmed_skills = dedup_by_topic(std::mem::take(&mut tech.confirmed_skills), |s| {
        s.topic.as_str()
    });
    tech.knowledge_gaps =
        dedup_by_topic(std::mem::take(&mut tech.knowledge_gaps), |g| g.topic.as_str());
    tech.overall_score = tech.overall_score.min(10);
    for skill in &mut tech.confirmed_skills {
        skill.score = skill.score.min(10);
    }

    let soft = &mut report.soft_skills_review;
    for entry in [
        &mut soft.clarity,
        &mut soft.honesty,
        &mut soft.engagement,
        &mut soft.professionalism,
    ] {
        entry.score = entry.score.min(10);
    }

    for topic in &mut report.roadmap.priority_topics {
        topic.resources = resources.resources(&topic.topic);
    }

    let decision = &mut report.decision;
    decision.confidence_score = decision.confidence_score.min(100);
    if input.has(Flag::ToxicBehavior) && !decision.hiring_recommendation.is_rejection() {
        tracing::warn!(
            "toxic behaviour recorded, downgrading {} to No Hire",
            decision.hiring_recommendation
        );
        decision.hiring_recommendation = HiringRecommendation::NoHire;
    }

    report.generated_at = Utc::now();
    report
}

fn dedup_by_topic<T>(items: Vec<T>, topic: impl Fn(&T) -> &str) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let key = topic(item).trim().to_lowercase();
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}

fn grade_below(grade: &str) -> &'static str {
    if grade.trim().eq_ignore_ascii_case("junior") {
        "Below Junior"
    } else {
        "Junior"
    }
}

/// Deterministic report from flag counts and ledger sizes.
pub fn fallback_report(input: &EvaluationInput<'_>, resources: &dyn ResourceLookup) -> FeedbackReport {
    let toxic = input.has(Flag::ToxicBehavior);
    let many_refusals = input.many_refusals();
    let many_hallucinations = input.many_hallucinations();
    let skills = input.skills.len();
    let gaps = input.gaps.len();

    let (grade, recommendation, confidence, explanation) = if toxic {
        (
            "Below Junior".to_string(),
            HiringRecommendation::StrongNoHire,
            95,
            "The candidate showed toxic behaviour",
        )
    } else if many_refusals {
        (
            "Below Junior".to_string(),
            HiringRecommendation::NoHire,
            80,
            "The candidate could not answer most of the questions",
        )
    } else if gaps > skills * 2 {
        (
            grade_below(&input.candidate.grade).to_string(),
            HiringRecommendation::NoHire,
            70,
            "Too many knowledge gaps",
        )
    } else if skills > gaps {
        (
            input.candidate.grade.clone(),
            HiringRecommendation::Hire,
            65,
            "The candidate showed good results",
        )
    } else {
        (
            "Junior".to_string(),
            HiringRecommendation::Maybe,
            50,
            "The results are mixed",
        )
    };

    let mut honesty: u32 = 7;
    if input.has(Flag::AdmitsIgnorance) {
        honesty = 8;
    }
    if many_hallucinations {
        honesty = 4;
    }

    let mut engagement: u32 = 5;
    if input.has(Flag::ShowsInterest) {
        engagement += 2;
    }
    if input.has(Flag::CandidateQuestion) {
        engagement += 1;
    }

    let mut red_flags = Vec::new();
    if toxic {
        red_flags.push("Toxic behaviour during the interview".to_string());
    }
    if many_hallucinations {
        red_flags.push("Confidently stated false information".to_string());
    }
    if many_refusals {
        red_flags.push("Declined to answer many questions".to_string());
    }

    let mut green_flags = Vec::new();
    if input.has(Flag::ShowsInterest) {
        green_flags.push("Showed interest in the position".to_string());
    }
    if input.has(Flag::CandidateQuestion) {
        green_flags.push("Asked questions about the role".to_string());
    }
    if input.has(Flag::AdmitsIgnorance) {
        green_flags.push("Honestly admitted what they did not know".to_string());
    }
    if skills >= 3 {
        green_flags.push("Demonstrated technical knowledge".to_string());
    }

    let overall = (5 + skills as i64 - gaps as i64).clamp(1, 10) as u32;

    FeedbackReport {
        decision: Decision {
            evaluated_grade: grade,
            hiring_recommendation: recommendation,
            confidence_score: confidence,
            explanation: explanation.to_string(),
        },
        technical_review: TechnicalReview {
            overall_score: overall,
            confirmed_skills: input
                .skills
                .iter()
                .map(|s| ConfirmedSkill {
                    topic: s.topic.clone(),
                    evidence: s.evidence.clone(),
                    score: u32::from(s.score),
                })
                .collect(),
            knowledge_gaps: input
                .gaps
                .iter()
                .map(|g| KnowledgeGap {
                    topic: g.topic.clone(),
                    question_asked: g.question.clone(),
                    candidate_answer: g.candidate_answer.clone(),
                    correct_answer: g.correct_answer.clone().unwrap_or_default(),
                    severity: g.severity.clone(),
                })
                .collect(),
        },
        soft_skills_review: SoftSkillsReview {
            clarity: SoftSkillScore::new(5),
            honesty: SoftSkillScore::new(honesty),
            engagement: SoftSkillScore::new(engagement.min(10)),
            professionalism: SoftSkillScore::new(if toxic { 1 } else { 7 }),
        },
        roadmap: Roadmap {
            priority_topics: input
                .gaps
                .iter()
                .take(ROADMAP_FROM_GAPS)
                .map(|g| RoadmapTopic {
                    topic: g.topic.clone(),
                    why: "Knowledge gap found during the interview".to_string(),
                    priority: "high".to_string(),
                    resources: resources.resources(&g.topic),
                })
                .collect(),
            recommended_actions: vec![
                "Study the official documentation for the topics with gaps".to_string(),
                "Practise on LeetCode or HackerRank".to_string(),
                "Build a pet project for your portfolio".to_string(),
            ],
            estimated_time: "3-6 months".to_string(),
        },
        red_flags,
        green_flags,
        summary: format!(
            "{}: recommendation {recommendation}. {explanation}",
            input.candidate.name
        ),
        generated_at: Utc::now(),
    }
}

fn evaluator_prompt(input: &EvaluationInput<'_>) -> String {
    let c = input.candidate;
    let distinct: BTreeSet<&str> = input.flags.iter().map(|f| f.as_str()).collect();
    let all_flags = if distinct.is_empty() {
        "none".to_string()
    } else {
        distinct.into_iter().collect::<Vec<_>>().join(", ")
    };
    let skills = serde_json::to_string(input.skills).unwrap_or_default();
    let gaps = serde_json::to_string(input.gaps).unwrap_or_default();
    let depth = if input.depth.is_empty() {
        String::new()
    } else {
        format!(
            "\nKNOWLEDGE DEPTH BY TOPIC:\n{}\n",
            serde_json::to_string(input.depth).unwrap_or_default()
        )
    };

    format!(
        r#"You are the Evaluator. You write the final report of a technical interview.

CANDIDATE:
Name: {name}
Position: {position}
Claimed grade: {grade}
Experience: {experience}

INTERVIEW STATISTICS:
Dialogue turns: {turns}
Toxic behaviour: {toxic}
Refusals to answer: {refusals}
Hallucinations (false facts): {hallucinations}
Off-topic attempts: {off_topic}
All flags: {all_flags}

INTERVIEW HISTORY:
{history}

DETECTED SKILLS:
{skills}

DETECTED GAPS:
{gaps}
{depth}
GRADING:
evaluated_grade: Junior | Middle | Senior | Below Junior
hiring_recommendation: Strong Hire | Hire | Maybe | No Hire | Strong No Hire

IMPORTANT:
- Toxic behaviour means No Hire or Strong No Hire, always
- Repeated hallucinations lower the honesty score
- An honest "I don't know" adds to honesty but not to knowledge
- Questions about the company add to engagement

Reply with JSON:
{{
  "decision": {{"evaluated_grade": "...", "hiring_recommendation": "...", "confidence_score": 0-100, "explanation": "..."}},
  "technical_review": {{
    "overall_score": 1-10,
    "confirmed_skills": [{{"topic": "...", "evidence": "...", "score": 1-10}}],
    "knowledge_gaps": [{{"topic": "...", "question_asked": "...", "candidate_answer": "...", "correct_answer": "...", "severity": "high/medium/low"}}]
  }},
  "soft_skills_review": {{
    "clarity": {{"score": 1-10, "comment": "..."}},
    "honesty": {{"score": 1-10, "comment": "..."}},
    "engagement": {{"score": 1-10, "comment": "..."}},
    "professionalism": {{"score": 1-10, "comment": "..."}}
  }},
  "roadmap": {{
    "priority_topics": [{{"topic": "...", "why": "...", "priority": "high/medium/low"}}],
    "recommended_actions": ["..."],
    "estimated_time": "X months"
  }},
  "red_flags": ["..."],
  "green_flags": ["..."],
  "summary": "2-3 sentence summary"
}}"#,
        name = c.name,
        position = c.position,
        grade = c.grade,
        experience = c.experience,
        turns = input.turn_count,
        toxic = input.count(Flag::ToxicBehavior),
        refusals = input.count(Flag::RefusalToAnswer),
        hallucinations = input.count(Flag::HallucinationDetected),
        off_topic = input.count(Flag::OffTopicAttempt),
        history = input.history,
    )
}
