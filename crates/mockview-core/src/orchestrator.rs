use std::sync::Arc;

use anyhow::Result;
use mockview_provider::create_provider;
use mockview_schema::{
    truncate_chars, AnalysisResult, AnswerQuality, Candidate, FeedbackReport, Flag, Role, Stage,
    Thought, TurnRecord,
};
use serde::{Deserialize, Serialize};

use crate::config::{InterviewSettings, MockviewConfig, StageTemperatures};
use crate::error::InterviewError;
use crate::evaluator::{self, EvaluationInput};
use crate::fact_check;
use crate::gateway::Gateway;
use crate::interviewer::{self, ResponseContext};
use crate::observer;
use crate::resources::{KeywordResources, ResourceLookup};
use crate::reviewer;
use crate::session::{InterviewSession, SessionStats};
use crate::stop_intent;

const CONFLICT_IN_NOTE: usize = 80;
const NOTABLE_DEPTH: u8 = 3;

/// What the front end shows after one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnReply {
    pub turn_id: u32,
    pub message: String,
    pub thoughts: Vec<Thought>,
    pub difficulty: u8,
    pub flags: Vec<Flag>,
    /// Absent for the greeting.
    pub quality: Option<AnswerQuality>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishedInterview {
    pub feedback: FeedbackReport,
    pub stats: SessionStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnOutcome {
    Reply(TurnReply),
    Finished(FinishedInterview),
}

impl TurnOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }
}

/// Runs candidate messages through the stage sequence. Holds no session state,
/// so one pipeline serves any number of sessions.
#[derive(Clone)]
pub struct InterviewPipeline {
    gateway: Arc<Gateway>,
    settings: InterviewSettings,
    temperatures: StageTemperatures,
    resources: Arc<dyn ResourceLookup>,
}

impl InterviewPipeline {
    pub fn new(
        gateway: Gateway,
        settings: InterviewSettings,
        temperatures: StageTemperatures,
    ) -> Self {
        Self {
            gateway: Arc::new(gateway),
            settings,
            temperatures,
            resources: Arc::new(KeywordResources),
        }
    }

    pub fn from_config(config: &MockviewConfig) -> Result<Self> {
        let provider = create_provider(&config.provider.connection)?;
        let gateway = Gateway::new(provider, config.provider.model.clone())
            .with_retry(config.retry.policy())
            .with_max_tokens(config.provider.max_tokens);
        Ok(Self::new(
            gateway,
            config.interview.clone(),
            config.temperatures,
        ))
    }

    pub fn with_resources(mut self, resources: Arc<dyn ResourceLookup>) -> Self {
        self.resources = resources;
        self
    }

    pub fn settings(&self) -> &InterviewSettings {
        &self.settings
    }

    pub fn start_session(&self, candidate: Candidate) -> InterviewSession {
        let session = InterviewSession::new(candidate, &self.settings);
        tracing::info!(
            "session {} started: {} / {} / {}, difficulty {}",
            session.id,
            session.candidate.name,
            session.candidate.position,
            session.candidate.grade,
            session.difficulty.level()
        );
        session
    }

    /// Opening message. Becomes the question the first answer is paired with,
    /// but is not recorded as a turn.
    pub async fn greet(&self, session: &mut InterviewSession) -> Result<TurnReply, InterviewError> {
        if session.finished {
            return Err(InterviewError::SessionFinished(session.id));
        }

        let greeting =
            interviewer::greet(&self.gateway, &session.candidate, self.temperatures.greeting).await;
        session.context.add_message(Role::Interviewer, greeting.clone());
        session.last_question = greeting.clone();

        let level = session.difficulty.level();
        Ok(TurnReply {
            turn_id: 0,
            message: greeting,
            thoughts: vec![
                Thought::new(
                    Stage::Observer,
                    "Interview started. Waiting for the candidate to introduce themselves.",
                ),
                Thought::new(
                    Stage::Interviewer,
                    format!("Greeting the candidate. Difficulty: {level}/5"),
                ),
            ],
            difficulty: level,
            flags: Vec::new(),
            quality: None,
        })
    }

    /// Processes one candidate message. A stop request seals the session and
    /// returns the final report instead of a reply.
    pub async fn process_message(
        &self,
        session: &mut InterviewSession,
        message: &str,
    ) -> Result<TurnOutcome, InterviewError> {
        if session.finished {
            return Err(InterviewError::SessionFinished(session.id));
        }
        let gw = self.gateway.as_ref();
        let t = &self.temperatures;

        if stop_intent::is_stop_intent(gw, message, self.settings.stop_check_max_chars, t.stop_intent)
            .await
        {
            tracing::info!("session {}: candidate asked to finish", session.id);
            return Ok(TurnOutcome::Finished(self.finish(session).await));
        }

        let turn_id = session.next_turn_id();
        let previous_question = session.last_question.clone();
        let mut thoughts = Vec::new();

        session.context.add_message(Role::Candidate, message);
        let history = session.context.history();

        let mut analysis =
            observer::observe(gw, &session.candidate, &history, message, t.observer).await;
        thoughts.push(Thought::new(Stage::Observer, observer_note(&analysis)));

        let mut contradiction_question = None;
        if turn_id >= self.settings.contradiction_start_turn {
            if let Some(finding) = session
                .claims
                .check(gw, message, turn_id, t.contradiction)
                .await
            {
                thoughts.push(Thought::new(
                    Stage::ContradictionDetector,
                    format!(
                        "Conflicts with turn {}: {}",
                        finding.old_turn,
                        truncate_chars(&finding.conflict, CONFLICT_IN_NOTE)
                    ),
                ));
                analysis.add_flag(Flag::ContradictionDetected);
                contradiction_question =
                    Some(finding.question).filter(|q| !q.trim().is_empty());
            }
        }

        if !analysis.answer_quality.excludes_claim() {
            session.claims.remember(turn_id, message);
        }

        for skill in &analysis.detected_skills {
            let level = session.depth.process(gw, skill, message, t.depth).await;
            if level >= NOTABLE_DEPTH {
                thoughts.push(Thought::new(
                    Stage::DepthProber,
                    format!("{skill}: level {level}/5"),
                ));
            }
        }

        for skill in &analysis.detected_skills {
            session.record_skill(skill, message, turn_id);
            session.context.add_topic(skill);
        }
        for gap in &analysis.detected_gaps {
            session.record_gap(gap, &previous_question, message, turn_id);
        }

        let mut fact_correction = None;
        if analysis.factual_accuracy.needs_fact_check()
            || analysis.has_flag(Flag::HallucinationDetected)
        {
            let result = fact_check::check_facts(gw, message, &history, t.fact_checker).await;
            if let Some(text) = result.correction_text() {
                thoughts.push(Thought::new(Stage::FactChecker, format!("Error: {text}")));
                fact_correction = Some(text);
            }
        }

        let old_level = session.difficulty.level();
        let level = session.difficulty.update(analysis.answer_quality);
        if level != old_level {
            let direction = if level > old_level { "raised" } else { "lowered" };
            thoughts.push(Thought::new(
                Stage::DifficultyController,
                format!("Difficulty {direction}: {old_level} -> {level}"),
            ));
        }

        let topics_done = session.context.topics().to_vec();
        let ctx = ResponseContext {
            candidate: &session.candidate,
            history: &history,
            analysis: &analysis,
            difficulty: level,
            topics_done: &topics_done,
            fact_correction: fact_correction.as_deref(),
            contradiction_question: contradiction_question.as_deref(),
            review_fix: None,
        };
        let mut reply = interviewer::respond(gw, &ctx, t.interviewer).await;
        thoughts.push(Thought::new(
            Stage::Interviewer,
            format!("Difficulty: {level}/5, mode: {}", ctx.mode().as_str()),
        ));

        if self.settings.smart_mode {
            let verdict = reviewer::review(
                gw,
                &reply,
                &analysis,
                &previous_question,
                &topics_done,
                t.meta_reviewer,
            )
            .await;
            if verdict.is_ok {
                thoughts.push(Thought::new(Stage::MetaReviewer, "Checked"));
            } else {
                thoughts.push(Thought::new(
                    Stage::MetaReviewer,
                    format!("Issues: [{}]", verdict.issues.join("; ")),
                ));
                // One repair at most; the second draft is used as is.
                if let Some(fix) = verdict.repair_instruction() {
                    let revised = ResponseContext {
                        review_fix: Some(fix),
                        ..ctx
                    };
                    reply = interviewer::respond(gw, &revised, t.interviewer).await;
                    thoughts.push(Thought::new(Stage::Interviewer, "Revised after review"));
                }
            }
        }

        session.context.add_message(Role::Interviewer, reply.clone());
        session.last_question = reply.clone();
        session.flags.extend(analysis.flags.iter().copied());
        session.turns.push(TurnRecord {
            turn_id,
            candidate_message: message.to_string(),
            interviewer_message: previous_question,
            thoughts: thoughts.clone(),
            difficulty: level,
            flags: analysis.flags.clone(),
            quality: analysis.answer_quality,
        });
        tracing::info!(
            "session {} turn {turn_id}: quality={} difficulty={level} flags={}",
            session.id,
            analysis.answer_quality,
            analysis.flags.len()
        );

        Ok(TurnOutcome::Reply(TurnReply {
            turn_id,
            message: reply,
            thoughts,
            difficulty: level,
            flags: analysis.flags,
            quality: Some(analysis.answer_quality),
        }))
    }

    /// Seals the session with a final report. Calling it again returns the
    /// same report without another evaluation.
    pub async fn finish(&self, session: &mut InterviewSession) -> FinishedInterview {
        if let Some(report) = &session.feedback {
            return FinishedInterview {
                feedback: report.clone(),
                stats: session.stats(),
            };
        }

        session.finished = true;
        let history = session.context.history();
        let input = EvaluationInput {
            candidate: &session.candidate,
            history: &history,
            skills: &session.skills,
            gaps: &session.gaps,
            flags: &session.flags,
            turn_count: session.turns.len(),
            depth: session.depth.summary(),
        };
        let report = evaluator::evaluate(
            &self.gateway,
            &input,
            self.resources.as_ref(),
            self.temperatures.evaluator,
        )
        .await;

        tracing::info!(
            "session {} finished after {} turns: {} ({})",
            session.id,
            session.turns.len(),
            report.decision.hiring_recommendation,
            report.decision.evaluated_grade
        );
        session.feedback = Some(report.clone());
        FinishedInterview {
            feedback: report,
            stats: session.stats(),
        }
    }
}

fn observer_note(analysis: &AnalysisResult) -> String {
    let flags = analysis
        .flags
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Quality: {}, Confidence: {}, Flags: [{flags}], Instruction: {}",
        analysis.answer_quality,
        analysis.confidence_level.as_str(),
        analysis.instruction
    )
}
