use mockview_schema::{AnalysisResult, Candidate};

use crate::extract::extract;
use crate::gateway::Gateway;

/// Classifies the latest candidate message. Falls back to [`AnalysisResult::neutral`].
pub async fn observe(
    gateway: &Gateway,
    candidate: &Candidate,
    history: &str,
    message: &str,
    temperature: f32,
) -> AnalysisResult {
    let prompt = observer_prompt(candidate, history, message);
    let raw = gateway.generate(&prompt, temperature).await;

    match extract::<AnalysisResult>(&raw) {
        Some(analysis) => analysis,
        None => {
            tracing::warn!("observer output unreadable, using neutral analysis");
            AnalysisResult::neutral()
        }
    }
}

fn observer_prompt(candidate: &Candidate, history: &str, message: &str) -> String {
    let history = if history.is_empty() {
        "[start of interview]"
    } else {
        history
    };

    format!(
        r#"You are the Observer. You analyse a candidate's answers during a technical interview.

CANDIDATE:
Name: {name}
Position: {position}
Grade: {grade}
Experience: {experience}

DIALOGUE HISTORY:
{history}

LATEST CANDIDATE MESSAGE:
"{message}"

FIRST CHECK FOR AI COPY-PASTE. If the message contains any of these phrases, even with correct code:
- "as an AI" / "как языковая модель"
- "as a language model"
- "I hope this helps" / "надеюсь, это поможет"
- a trailing "Note:" after a technical answer

Classify the answer:

1. answer_quality: excellent | good | adequate | poor | wrong | off_topic | hallucination | toxic | refusal
2. confidence_level: high | medium | low
3. topic_relevance: on_topic | partial | off_topic
4. factual_accuracy: accurate | suspicious | hallucination | no_technical
5. flags (may be empty): hallucination_detected, off_topic_attempt, toxic_behavior,
   refusal_to_answer, candidate_question, shows_interest, admits_ignorance, ai_copypaste_detected
6. detected_skills: list of topics the candidate demonstrated
7. detected_gaps: list of topics the candidate does not know
8. instruction: what the interviewer should do next

EXAMPLES:
"ORM is Object-Relational Mapping, it lets you work with the DB through objects"
=> answer_quality=good, confidence_level=high, factual_accuracy=accurate, flags=[], detected_skills=["ORM", "databases"]

"In Python 4.0 loops will be replaced by neural networks"
=> answer_quality=hallucination, factual_accuracy=hallucination, flags=["hallucination_detected"], instruction="correct the false statement"

"what's the weather today?"
=> answer_quality=off_topic, topic_relevance=off_topic, flags=["off_topic_attempt"], instruction="bring the candidate back to the interview"

"what tasks will I get during probation?"
=> answer_quality=adequate, flags=["candidate_question", "shows_interest"], instruction="answer as a practice interviewer, then continue"

Reply ONLY with valid JSON, no markdown:
{{"answer_quality": "...", "confidence_level": "...", "topic_relevance": "...", "factual_accuracy": "...", "detected_skills": [], "detected_gaps": [], "flags": [], "instruction": "..."}}"#,
        name = candidate.name,
        position = candidate.position,
        grade = candidate.grade,
        experience = candidate.experience,
    )
}
