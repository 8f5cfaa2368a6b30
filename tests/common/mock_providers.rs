/*!
 * Mock provider helpers for tests
 *
 * Builds on `MockProvider` so no test ever reaches a real API. Translation
 * prompts are recognised by their source section; everything else is
 * treated as an evaluation request.
 */

use llm_translate::providers::{ChatRequest, MockProvider};

pub const LOW_MQM: &str = r#"{"errors": [{"type": "accuracy/mistranslation", "severity": "major", "span": "Bonjur", "suggestion": "Bonjour"}], "summary": "typo"}"#;
pub const HIGH_MQM: &str = r#"{"errors": [], "summary": "good"}"#;

/// Source text of a translation prompt, if the request is one
pub fn source_text(request: &ChatRequest) -> Option<String> {
    let text = request.last_user_text()?;
    let (_, rest) = text.split_once("## Source Text:\n")?;
    let source = rest.split("\n\nProvide ONLY").next().unwrap_or(rest);
    Some(source.to_string())
}

/// Uppercases translation sources; evaluations get a perfect MQM score
pub fn uppercase_translator() -> MockProvider {
    MockProvider::responder(|request| match source_text(request) {
        Some(source) => source.to_uppercase(),
        None => HIGH_MQM.to_string(),
    })
}

/// Translates the k8s sample sentence into Korean, applying the glossary
pub fn korean_translator() -> MockProvider {
    MockProvider::responder(|request| match source_text(request) {
        Some(source) if source.contains("Kubernetes cluster") => {
            source.replace("Set up a Kubernetes cluster.", "Kubernetes 클러스터를 설정합니다.")
        }
        Some(source) => source,
        None => HIGH_MQM.to_string(),
    })
}
