use crate::gateway::Gateway;

/// Phrases that end the interview outright, in either language.
pub const STOP_PHRASES: &[&str] = &[
    "стоп",
    "stop",
    "хватит",
    "закончим",
    "завершить",
    "завершай",
    "фидбэк",
    "feedback",
    "достаточно",
    "конец",
    "давай фидбэк",
    "стоп игра",
    "стоп интервью",
    "заверши интервью",
];

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether any stop phrase appears in `message` as a run of whole words.
pub fn matches_stop_keyword(message: &str) -> bool {
    let tokens = words(message);
    STOP_PHRASES.iter().any(|phrase| {
        let phrase = words(phrase);
        !phrase.is_empty() && tokens.windows(phrase.len()).any(|w| w == phrase.as_slice())
    })
}

/// Short statements without a question mark are ambiguous enough to ask the model.
pub fn needs_classifier(message: &str, max_chars: usize) -> bool {
    message.chars().count() < max_chars && !message.contains('?')
}

/// Decides whether the candidate wants to end the interview.
///
/// Keyword hits and question-shaped or long messages are settled locally.
/// Only short statements go to the classifier, which is told to answer NO
/// whenever in doubt. An empty or failed classification counts as NO.
pub async fn is_stop_intent(
    gateway: &Gateway,
    message: &str,
    max_chars: usize,
    temperature: f32,
) -> bool {
    if matches_stop_keyword(message) {
        tracing::info!("stop keyword detected");
        return true;
    }
    if !needs_classifier(message, max_chars) {
        return false;
    }

    let answer = gateway.generate(&classifier_prompt(message), temperature).await;
    answer.trim().to_uppercase().starts_with("YES")
}

fn classifier_prompt(message: &str) -> String {
    format!(
        r#"Decide whether the user EXPLICITLY wants to end the interview and get feedback.

Message: "{message}"

END (YES) only when the person directly asks to finish:
- "that's it, enough"
- "let's wrap up"
- "I'm tired, give me feedback"
- "bye, finish it"

NOT END (NO) for any answer to an interview question:
- "I know everything" is an ANSWER
- "I don't know" is an ANSWER
- "what's the weather" is off-topic, but NOT an end
- any technical answer or attempt to answer
- bragging, rudeness, nonsense are NOT an end

IMPORTANT: if there is ANY doubt, answer NO.

Answer ONLY: YES or NO"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{gateway, Canned};

    #[test]
    fn keywords_match_whole_words_only() {
        assert!(matches_stop_keyword("стоп"));
        assert!(matches_stop_keyword("Стоп игра!"));
        assert!(matches_stop_keyword("ok, давай фидбэк"));
        assert!(matches_stop_keyword("Please STOP."));
        assert!(!matches_stop_keyword("не знаю"));
        assert!(!matches_stop_keyword("I use a stopwatch"));
        assert!(!matches_stop_keyword("nonstop deployments"));
    }

    #[test]
    fn classifier_is_only_for_short_statements() {
        assert!(needs_classifier("не знаю", 100));
        assert!(!needs_classifier("what is a GIL?", 100));
        assert!(!needs_classifier(&"a".repeat(100), 100));
    }

    #[tokio::test]
    async fn keyword_short_circuits_the_gateway() {
        let provider = Canned::new("NO");
        let gw = gateway(provider.clone());
        assert!(is_stop_intent(&gw, "стоп", 100, 0.1).await);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn question_never_reaches_the_classifier() {
        let provider = Canned::new("YES");
        let gw = gateway(provider.clone());
        assert!(!is_stop_intent(&gw, "can we talk about Docker?", 100, 0.1).await);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn classifier_answer_is_respected() {
        let provider = Canned::new("NO");
        let gw = gateway(provider.clone());
        assert!(!is_stop_intent(&gw, "не знаю", 100, 0.1).await);
        assert_eq!(provider.calls(), 1);
        assert_eq!(provider.last_temperature(), Some(0.1));

        let gw = gateway(Canned::new(" yes, they want to leave"));
        assert!(is_stop_intent(&gw, "ну всё, устал", 100, 0.1).await);

        let gw = gateway(Canned::new(""));
        assert!(!is_stop_intent(&gw, "ну всё, устал", 100, 0.1).await);
    }
}
