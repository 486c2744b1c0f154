use mockview_schema::{AnalysisResult, AnswerQuality, Candidate, Flag};

use crate::gateway::Gateway;

const TOPICS_IN_PROMPT: usize = 7;

/// Behaviour the interviewer adopts for one reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewMode {
    Toxicity,
    OffTopic,
    HallucinationCorrection,
    AnswerQuestion,
    Simplify,
    ClarifyContradiction,
    Default,
}

impl InterviewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Toxicity => "toxicity",
            Self::OffTopic => "off_topic",
            Self::HallucinationCorrection => "hallucination_correction",
            Self::AnswerQuestion => "answer_question",
            Self::Simplify => "simplify",
            Self::ClarifyContradiction => "clarify_contradiction",
            Self::Default => "default",
        }
    }

    fn instructions(self, ctx: &ResponseContext<'_>) -> String {
        match self {
            Self::Toxicity => "MODE - TOXICITY:
The candidate was rude. Stay professional.
Gently point out that this behaviour is not appropriate in an interview.
Offer to continue constructively."
                .to_string(),
            Self::OffTopic => "MODE - BACK TO TOPIC:
The candidate is trying to change the subject (weather, personal matters and so on).
Do NOT follow the off-topic conversation.
Politely but firmly return to technical questions, then ask one right away."
                .to_string(),
            Self::HallucinationCorrection => {
                let facts = ctx
                    .fact_correction
                    .map(|c| format!("Correct information: {c}\n"))
                    .unwrap_or_default();
                format!(
                    "MODE - CORRECTING AN ERROR:
The candidate stated something FALSE.
You MUST correct it and say clearly that it does not match reality.
Do NOT call it \"interesting information\".
{facts}Be polite but point at the mistake directly and give the right facts.
After the correction, continue the interview."
                )
            }
            Self::AnswerQuestion => "MODE - ANSWERING A QUESTION:
The candidate asked a question back, which is a good sign.
You are a PRACTICE interviewer and do not represent a specific company.
Say so honestly, but still give a USEFUL general answer, then continue the interview."
                .to_string(),
            Self::Simplify => "MODE - SIMPLIFY AND HELP:
The candidate is struggling or declined to answer.
If they ASK FOR AN EXPLANATION, give a SHORT one (two sentences at most) and
follow it with a SIMPLE check question on the same topic.
If they just say they don't know, simplify the question or switch to an easier topic.
This is an interview, not a lesson."
                .to_string(),
            Self::ClarifyContradiction => format!(
                "MODE - CONTRADICTION:
The candidate said something that conflicts with their earlier words.
Gently ask them to clarify without accusing them.
Clarifying question: {}",
                ctx.contradiction_question.unwrap_or_default()
            ),
            Self::Default => String::new(),
        }
    }
}

/// Facts the mode decision is made on.
#[derive(Debug, Clone, Copy)]
pub struct ModeInputs<'a> {
    pub flags: &'a [Flag],
    pub quality: AnswerQuality,
    pub has_contradiction: bool,
}

impl ModeInputs<'_> {
    fn has(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }
}

type ModeRule = fn(&ModeInputs<'_>) -> bool;

fn is_toxic(i: &ModeInputs<'_>) -> bool {
    i.has(Flag::ToxicBehavior)
}

fn is_off_topic(i: &ModeInputs<'_>) -> bool {
    i.has(Flag::OffTopicAttempt)
}

fn is_hallucination(i: &ModeInputs<'_>) -> bool {
    i.has(Flag::HallucinationDetected)
}

fn is_question(i: &ModeInputs<'_>) -> bool {
    i.has(Flag::CandidateQuestion)
}

fn is_struggling(i: &ModeInputs<'_>) -> bool {
    i.has(Flag::RefusalToAnswer)
        || matches!(
            i.quality,
            AnswerQuality::Poor | AnswerQuality::Wrong | AnswerQuality::Refusal
        )
}

fn is_contradiction(i: &ModeInputs<'_>) -> bool {
    i.has_contradiction
}

/// Evaluated top to bottom. The first matching row wins.
pub const MODE_TABLE: &[(InterviewMode, ModeRule)] = &[
    (InterviewMode::Toxicity, is_toxic),
    (InterviewMode::OffTopic, is_off_topic),
    (InterviewMode::HallucinationCorrection, is_hallucination),
    (InterviewMode::AnswerQuestion, is_question),
    (InterviewMode::Simplify, is_struggling),
    (InterviewMode::ClarifyContradiction, is_contradiction),
];

pub fn select_mode(inputs: &ModeInputs<'_>) -> InterviewMode {
    MODE_TABLE
        .iter()
        .find(|(_, rule)| rule(inputs))
        .map_or(InterviewMode::Default, |(mode, _)| *mode)
}

/// Everything the interviewer conditions its next reply on.
#[derive(Debug, Clone, Copy)]
pub struct ResponseContext<'a> {
    pub candidate: &'a Candidate,
    pub history: &'a str,
    pub analysis: &'a AnalysisResult,
    pub difficulty: u8,
    pub topics_done: &'a [String],
    pub fact_correction: Option<&'a str>,
    pub contradiction_question: Option<&'a str>,
    /// Repair instruction from the reviewer, present only on a second draft.
    pub review_fix: Option<&'a str>,
}

impl ResponseContext<'_> {
    pub fn mode(&self) -> InterviewMode {
        select_mode(&ModeInputs {
            flags: &self.analysis.flags,
            quality: self.analysis.answer_quality,
            has_contradiction: self.contradiction_question.is_some_and(|q| !q.is_empty()),
        })
    }
}

/// Writes the next interviewer utterance. Never returns an empty string.
pub async fn respond(gateway: &Gateway, ctx: &ResponseContext<'_>, temperature: f32) -> String {
    let mode = ctx.mode();
    tracing::debug!("interviewer mode: {}", mode.as_str());

    let raw = gateway.generate(&interviewer_prompt(ctx, mode), temperature).await;
    let reply = strip_quotes(raw.trim());
    if reply.is_empty() {
        tracing::warn!("interviewer produced no text, using {} fallback", mode.as_str());
        return fallback_reply(ctx, mode);
    }
    reply.to_string()
}

/// Opening message for turn 0.
pub async fn greet(gateway: &Gateway, candidate: &Candidate, temperature: f32) -> String {
    let prompt = format!(
        "Greet the candidate as a technical practice interviewer helping people prepare for job interviews.
The candidate {name} is applying for a {position} position at {grade} level.
Introduce yourself, explain that this is a practice interview, and ask the candidate to tell you
about themselves and their experience. Be friendly and professional.
Write only the greeting text:",
        name = candidate.name,
        position = candidate.position,
        grade = candidate.grade,
    );

    let raw = gateway.generate(&prompt, temperature).await;
    let greeting = strip_quotes(raw.trim());
    if greeting.is_empty() {
        return format!(
            "Hi, {}! I'm your practice interviewer today. Tell me about yourself and your experience.",
            candidate.name
        );
    }
    greeting.to_string()
}

fn strip_quotes(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        text[1..text.len() - 1].trim()
    } else {
        text
    }
}

fn interviewer_prompt(ctx: &ResponseContext<'_>, mode: InterviewMode) -> String {
    let c = ctx.candidate;
    let a = ctx.analysis;
    let start = ctx.topics_done.len().saturating_sub(TOPICS_IN_PROMPT);
    let topics = if ctx.topics_done.is_empty() {
        "none yet".to_string()
    } else {
        ctx.topics_done[start..].join(", ")
    };

    let mut history = if ctx.history.is_empty() {
        "[start of interview]".to_string()
    } else {
        ctx.history.to_string()
    };
    if let Some(fix) = ctx.review_fix {
        history.push_str(&format!("\n\n[IMPORTANT: {fix}]"));
    }

    format!(
        r#"You are a technical practice interviewer. Your job is to run a high-quality interview.

CANDIDATE:
Name: {name}
Position: {position}
Target grade: {grade}
Experience: {experience}

CURRENT STATE:
Question difficulty: {difficulty}/5
Topics already discussed: {topics}

DIALOGUE HISTORY:
{history}

ANALYSIS OF THE LAST ANSWER:
Quality: {quality}
Confidence: {confidence}
Relevance: {relevance}
Instruction: {instruction}

{mode_text}

RULES:
1. Match the difficulty level:
   1: "What is a variable?"  2: "How does a for loop work?"  3: "List vs tuple?"
   4: "How does the GIL work?"  5: "How would you design..."
2. Do NOT repeat topics that were already discussed.
3. Be human: use the candidate's name, praise good answers, encourage when they struggle.
4. If the candidate asked a question, answer it first.
5. Reply in the language the candidate uses.

Write ONLY your reply as the interviewer (no explanations, no JSON):"#,
        name = c.name,
        position = c.position,
        grade = c.grade,
        experience = c.experience,
        difficulty = ctx.difficulty,
        quality = a.answer_quality,
        confidence = a.confidence_level.as_str(),
        relevance = a.topic_relevance.as_str(),
        instruction = a.instruction,
        mode_text = mode.instructions(ctx),
    )
}

fn fallback_reply(ctx: &ResponseContext<'_>, mode: InterviewMode) -> String {
    let name = &ctx.candidate.name;
    match mode {
        InterviewMode::Toxicity => format!(
            "{name}, let's keep our conversation respectful and professional. \
             Let's continue: tell me about a project you are proud of."
        ),
        InterviewMode::OffTopic => format!(
            "That's interesting, {name}, but let's get back to the interview. \
             Which technologies do you use most in your daily work?"
        ),
        InterviewMode::HallucinationCorrection => {
            let facts = ctx
                .fact_correction
                .unwrap_or("That statement does not match the facts.");
            format!(
                "{name}, I have to correct you here: that is not accurate. {facts} \
                 Let's move on to the next question."
            )
        }
        InterviewMode::AnswerQuestion => format!(
            "Good question, {name}! As a practice interviewer I don't represent a specific company, \
             but teams hiring for this role usually expect solid fundamentals. Let's continue: \
             how do you usually test your code?"
        ),
        InterviewMode::Simplify => format!(
            "No problem, {name}. Let's try something simpler: \
             describe a recent task you worked on, step by step."
        ),
        InterviewMode::ClarifyContradiction => format!(
            "{name}, I want to make sure I understood you correctly. {}",
            ctx.contradiction_question.unwrap_or_default()
        ),
        InterviewMode::Default => format!(
            "Good, {name}. Let's continue. Tell me more about your experience as a {}.",
            ctx.candidate.position
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{gateway, Broken, Canned};

    fn inputs(flags: &[Flag], quality: AnswerQuality, contradiction: bool) -> InterviewMode {
        select_mode(&ModeInputs {
            flags,
            quality,
            has_contradiction: contradiction,
        })
    }

    #[test]
    fn mode_priority_follows_table_order() {
        use AnswerQuality::*;
        use Flag::*;

        let everything = [
            CandidateQuestion,
            HallucinationDetected,
            OffTopicAttempt,
            ToxicBehavior,
            RefusalToAnswer,
        ];
        assert_eq!(inputs(&everything, Poor, true), InterviewMode::Toxicity);
        assert_eq!(inputs(&everything[..3], Poor, true), InterviewMode::OffTopic);
        assert_eq!(
            inputs(&everything[..2], Poor, true),
            InterviewMode::HallucinationCorrection
        );
        assert_eq!(inputs(&everything[..1], Poor, true), InterviewMode::AnswerQuestion);
        assert_eq!(inputs(&[RefusalToAnswer], Good, true), InterviewMode::Simplify);
        assert_eq!(inputs(&[], Wrong, true), InterviewMode::Simplify);
        assert_eq!(inputs(&[], Adequate, true), InterviewMode::ClarifyContradiction);
        assert_eq!(inputs(&[ShowsInterest], Good, false), InterviewMode::Default);
    }

    fn candidate() -> Candidate {
        Candidate::new("Alex", "Backend Developer", "Junior", "")
    }

    #[tokio::test]
    async fn reply_is_unquoted_and_prompt_carries_context() {
        let provider = Canned::new("\"Nice, Alex. What is a JOIN?\"");
        let gw = gateway(provider.clone());
        let cand = candidate();
        let analysis = AnalysisResult::neutral();
        let topics: Vec<String> = (1..=9).map(|i| format!("topic{i}")).collect();
        let ctx = ResponseContext {
            candidate: &cand,
            history: "Candidate: hi",
            analysis: &analysis,
            difficulty: 3,
            topics_done: &topics,
            fact_correction: None,
            contradiction_question: None,
            review_fix: Some("ask about SQL instead"),
        };

        let reply = respond(&gw, &ctx, 0.7).await;
        assert_eq!(reply, "Nice, Alex. What is a JOIN?");

        let prompt = provider.last_prompt();
        assert!(prompt.starts_with("You are a technical practice interviewer"));
        assert!(prompt.contains("Question difficulty: 3/5"));
        assert!(prompt.contains("topic3, topic4"));
        assert!(!prompt.contains("topic2,"));
        assert!(prompt.contains("[IMPORTANT: ask about SQL instead]"));
        assert_eq!(provider.last_temperature(), Some(0.7));
    }

    #[tokio::test]
    async fn correction_fallback_includes_the_facts() {
        let gw = gateway(Arc::new(Broken));
        let cand = candidate();
        let mut analysis = AnalysisResult::neutral();
        analysis.add_flag(Flag::HallucinationDetected);
        let ctx = ResponseContext {
            candidate: &cand,
            history: "",
            analysis: &analysis,
            difficulty: 2,
            topics_done: &[],
            fact_correction: Some("Wrong: 'Python 4.0'. Correct: 'Python 3.13'"),
            contradiction_question: None,
            review_fix: None,
        };

        let reply = respond(&gw, &ctx, 0.7).await;
        assert!(reply.contains("not accurate"));
        assert!(reply.contains("Correct: 'Python 3.13'"));
    }

    #[tokio::test]
    async fn every_mode_has_a_non_empty_fallback() {
        let gw = gateway(Canned::new("   "));
        let cand = candidate();
        let cases: [(&[Flag], AnswerQuality, Option<&str>); 7] = [
            (&[Flag::ToxicBehavior], AnswerQuality::Toxic, None),
            (&[Flag::OffTopicAttempt], AnswerQuality::OffTopic, None),
            (&[Flag::HallucinationDetected], AnswerQuality::Hallucination, None),
            (&[Flag::CandidateQuestion], AnswerQuality::Adequate, None),
            (&[], AnswerQuality::Poor, None),
            (&[], AnswerQuality::Good, Some("Did you use Django or not?")),
            (&[], AnswerQuality::Good, None),
        ];
        for (flags, quality, question) in cases {
            let mut analysis = AnalysisResult::neutral();
            analysis.flags = flags.to_vec();
            analysis.answer_quality = quality;
            let ctx = ResponseContext {
                candidate: &cand,
                history: "",
                analysis: &analysis,
                difficulty: 2,
                topics_done: &[],
                fact_correction: None,
                contradiction_question: question,
                review_fix: None,
            };
            let reply = respond(&gw, &ctx, 0.7).await;
            assert!(reply.contains("Alex"), "{reply}");
            if let Some(q) = question {
                assert!(reply.contains(q));
            }
        }
    }

    #[tokio::test]
    async fn greeting_falls_back_to_template() {
        let gw = gateway(Arc::new(Broken));
        let greeting = greet(&gw, &candidate(), 0.7).await;
        assert!(greeting.starts_with("Hi, Alex!"));

        let provider = Canned::new("Hello Alex, welcome!");
        let gw = gateway(provider.clone());
        assert_eq!(greet(&gw, &candidate(), 0.7).await, "Hello Alex, welcome!");
        assert!(provider.last_prompt().starts_with("Greet the candidate"));
    }
}
