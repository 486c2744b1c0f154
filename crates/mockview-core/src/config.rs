use std::{fs, path::Path, time::Duration};

use anyhow::{anyhow, Context, Result};
use mockview_provider::{ProviderConfig, ProviderType};
use mockview_schema::FeedbackFormat;
use serde::{Deserialize, Serialize};

use crate::gateway::RetryPolicy;

pub const CONFIG_FILE: &str = "mockview.yaml";

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSection {
    #[serde(flatten)]
    pub connection: ProviderConfig,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub step_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 2000,
            step_delay_ms: 2000,
        }
    }
}

impl RetrySection {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            step_delay: Duration::from_millis(self.step_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewSettings {
    /// Runs the reviewer over every interviewer draft.
    pub smart_mode: bool,
    pub feedback_format: FeedbackFormat,
    /// Statements of this many characters or fewer are not kept as claims.
    pub claim_min_chars: usize,
    pub claim_window: usize,
    pub contradiction_start_turn: u32,
    pub depth_min_answer_chars: usize,
    pub stop_check_max_chars: usize,
}

impl Default for InterviewSettings {
    fn default() -> Self {
        Self {
            smart_mode: false,
            feedback_format: FeedbackFormat::Text,
            claim_min_chars: 20,
            claim_window: 5,
            contradiction_start_turn: 3,
            depth_min_answer_chars: 10,
            stop_check_max_chars: 100,
        }
    }
}

/// Sampling temperature per stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageTemperatures {
    pub observer: f32,
    pub fact_checker: f32,
    pub contradiction: f32,
    pub depth: f32,
    pub interviewer: f32,
    pub meta_reviewer: f32,
    pub evaluator: f32,
    pub stop_intent: f32,
    pub greeting: f32,
}

impl Default for StageTemperatures {
    fn default() -> Self {
        Self {
            observer: 0.2,
            fact_checker: 0.1,
            contradiction: 0.15,
            depth: 0.1,
            interviewer: 0.7,
            meta_reviewer: 0.1,
            evaluator: 0.3,
            stop_intent: 0.1,
            greeting: 0.7,
        }
    }
}

impl StageTemperatures {
    pub fn entries(&self) -> [(&'static str, f32); 9] {
        [
            ("observer", self.observer),
            ("fact_checker", self.fact_checker),
            ("contradiction", self.contradiction),
            ("depth", self.depth),
            ("interviewer", self.interviewer),
            ("meta_reviewer", self.meta_reviewer),
            ("evaluator", self.evaluator),
            ("stop_intent", self.stop_intent),
            ("greeting", self.greeting),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockviewConfig {
    pub provider: ProviderSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub interview: InterviewSettings,
    #[serde(default)]
    pub temperatures: StageTemperatures,
}

/// Expands `${VAR}` placeholders in the value of config key `field`. Unset
/// variables expand to nothing; an unclosed `${` is kept as written.
pub fn resolve_env_var(field: &str, raw: &str) -> String {
    let mut output = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some((head, tail)) = rest.split_once("${") {
        output.push_str(head);
        let Some((key, after)) = tail.split_once('}') else {
            output.push_str("${");
            output.push_str(tail);
            return output;
        };
        match std::env::var(key) {
            Ok(value) => output.push_str(&value),
            Err(_) => tracing::warn!("{field}: environment variable {key} is not set"),
        }
        rest = after;
    }

    output.push_str(rest);
    output
}

/// Reads `<root>/mockview.yaml`, resolves `${VAR}` placeholders, and validates.
pub fn load_config(root: &Path) -> Result<MockviewConfig> {
    let config = read_config(&root.join(CONFIG_FILE))?;
    validate_config(&config)?;
    Ok(config)
}

/// Parses and resolves one config file without validating it.
pub fn read_config(path: &Path) -> Result<MockviewConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read mockview config {}", path.display()))?;
    let mut config: MockviewConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("invalid mockview config {}", path.display()))?;
    resolve_provider_env(&mut config.provider);
    Ok(config)
}

pub fn validate_config(config: &MockviewConfig) -> Result<()> {
    let provider = &config.provider;
    if provider.connection.provider_type == ProviderType::Gemini
        && provider
            .connection
            .api_key
            .as_deref()
            .is_none_or(|k| k.trim().is_empty())
    {
        return Err(anyhow!("provider.api_key is required for gemini"));
    }
    if provider.model.trim().is_empty() {
        return Err(anyhow!("provider.model must not be empty"));
    }
    if provider.max_tokens == 0 {
        return Err(anyhow!("provider.max_tokens must be positive"));
    }

    if config.retry.max_attempts == 0 {
        return Err(anyhow!("retry.max_attempts must be at least 1"));
    }

    let interview = &config.interview;
    for (name, value) in [
        ("claim_min_chars", interview.claim_min_chars),
        ("claim_window", interview.claim_window),
        ("depth_min_answer_chars", interview.depth_min_answer_chars),
        ("stop_check_max_chars", interview.stop_check_max_chars),
        (
            "contradiction_start_turn",
            interview.contradiction_start_turn as usize,
        ),
    ] {
        if value == 0 {
            return Err(anyhow!("interview.{name} must be positive"));
        }
    }

    for (stage, value) in config.temperatures.entries() {
        if !(0.0..=2.0).contains(&value) {
            return Err(anyhow!(
                "temperatures.{stage} out of range [0, 2]: {value}"
            ));
        }
    }

    Ok(())
}

fn resolve_provider_env(provider: &mut ProviderSection) {
    provider.model = resolve_env_var("provider.model", &provider.model);
    let connection = &mut provider.connection;
    for (field, value) in [
        ("provider.api_key", &mut connection.api_key),
        ("provider.base_url", &mut connection.base_url),
        ("provider.proxy", &mut connection.proxy),
    ] {
        if let Some(value) = value {
            *value = resolve_env_var(field, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn fixture_config_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config")
    }

    fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn workspace_fixture_parses() {
        let mut config = read_config(&fixture_config_root().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.provider.connection.provider_type, ProviderType::Gemini);
        assert_eq!(config.provider.model, "gemini-2.0-flash");
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.interview.claim_min_chars, 20);
        assert_eq!(config.temperatures, StageTemperatures::default());

        config.provider.connection.api_key = Some("from-test".into());
        validate_config(&config).unwrap();
    }

    #[test]
    fn minimal_stub_config_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_config(&dir, "provider:\n  type: stub\n");
        let config = load_config(dir.path()).unwrap();

        assert_eq!(config.provider.connection.provider_type, ProviderType::Stub);
        assert_eq!(config.provider.max_tokens, 4096);
        assert_eq!(config.provider.connection.timeout_secs, 60);
        assert!(!config.interview.smart_mode);
        assert_eq!(config.interview.feedback_format, FeedbackFormat::Text);
        assert_eq!(config.retry.policy(), RetryPolicy::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            &dir,
            r#"
provider:
  type: stub
  model: gemini-exp
interview:
  smart_mode: true
  feedback_format: structured
temperatures:
  interviewer: 0.9
retry:
  base_delay_ms: 500
"#,
        );
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.provider.model, "gemini-exp");
        assert!(config.interview.smart_mode);
        assert_eq!(config.interview.feedback_format, FeedbackFormat::Structured);
        assert_eq!(config.interview.claim_window, 5);
        assert_eq!(config.temperatures.interviewer, 0.9);
        assert_eq!(config.temperatures.observer, 0.2);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.policy().base_delay, Duration::from_millis(500));
    }

    #[test]
    fn gemini_without_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            &dir,
            "provider:\n  type: gemini\n  api_key: \"${MOCKVIEW_NONEXISTENT_KEY_XYZ}\"\n",
        );
        let err = load_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains("api_key is required"));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_config(&dir, "provider:\n  type: stub\ntemperatures:\n  evaluator: 3.5\n");
        let err = load_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains("temperatures.evaluator"));

        write_config(&dir, "provider:\n  type: stub\nretry:\n  max_attempts: 0\n");
        let err = load_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains("max_attempts"));

        write_config(&dir, "provider:\n  type: stub\ninterview:\n  claim_window: 0\n");
        let err = load_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains("claim_window"));
    }

    #[test]
    fn zero_answer_gates_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for key in ["claim_min_chars", "depth_min_answer_chars"] {
            write_config(
                &dir,
                &format!("provider:\n  type: stub\ninterview:\n  {key}: 0\n"),
            );
            let err = load_config(dir.path()).unwrap_err();
            assert_eq!(err.to_string(), format!("interview.{key} must be positive"));
        }
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(err.to_string().starts_with("cannot read mockview config"));
        assert!(err.to_string().contains(CONFIG_FILE));
    }

    #[test]
    fn placeholders_expand_inside_longer_values() {
        let path = std::env::var("PATH").unwrap();
        assert_eq!(
            resolve_env_var("provider.base_url", "${PATH}/v1beta"),
            format!("{path}/v1beta")
        );
        assert_eq!(
            resolve_env_var("provider.api_key", "key-${MOCKVIEW_UNSET_KEY_XYZ}-end"),
            "key--end"
        );
    }

    #[test]
    fn values_without_placeholders_pass_through() {
        assert_eq!(resolve_env_var("provider.model", "gemini-2.0-flash"), "gemini-2.0-flash");
        assert_eq!(resolve_env_var("provider.proxy", "http://${HOST"), "http://${HOST");
        assert_eq!(resolve_env_var("provider.model", ""), "");
    }

    #[test]
    fn malformed_yaml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        write_config(&dir, "provider: [unterminated\n");
        let err = load_config(dir.path()).unwrap_err();
        assert!(err.to_string().starts_with("invalid mockview config"));
    }
}
