/*!
 * Tests for the per-chunk translation agent
 */

use std::sync::Arc;

use llm_translate::providers::MockProvider;
use llm_translate::translation::analysis::ContentDomain;
use llm_translate::translation::glossary::{load_glossary, resolve_glossary};
use llm_translate::translation::{AgentOptions, QualityMode, TranslationAgent, TranslationRequest};

use crate::common::mock_providers::{korean_translator, HIGH_MQM};
use crate::common::{create_k8s_glossary, create_temp_dir};

const ANALYSIS: &str = r#"{"keyTerms": [{"term": "pod", "context": "k8s unit", "suggestedTranslation": "파드", "fromGlossary": false}],
"preserveExact": ["kubectl"], "domain": "technical", "registerRecommendation": "formal"}"#;

fn agent(provider: &MockProvider, options: AgentOptions) -> TranslationAgent {
    TranslationAgent::new(Arc::new(provider.clone()), options)
}

#[tokio::test]
async fn test_translate_qualityMode_shouldAnalyzeBeforeTranslating() {
    let provider = MockProvider::responder(|request| {
        let text = request.last_user_text().unwrap_or_default();
        if text.starts_with("Analyze this") {
            ANALYSIS.to_string()
        } else if text.contains("Evaluate this translation using MQM") {
            HIGH_MQM.to_string()
        } else {
            "파드를 삭제합니다.".to_string()
        }
    });
    let options = AgentOptions {
        mode: Some(QualityMode::Quality),
        ..Default::default()
    };

    let result = agent(&provider, options)
        .translate(&TranslationRequest::new("Delete the pod.", "en", "ko"))
        .await
        .unwrap();

    // analysis, translation, evaluation
    assert_eq!(provider.request_count(), 3);
    let analysis = result.metadata.analysis.unwrap();
    assert_eq!(analysis.domain, ContentDomain::Technical);
    assert_eq!(analysis.preserve_exact, vec!["kubectl".to_string()]);
    assert_eq!(result.metadata.quality_score, 100.0);
    assert!(result.metadata.threshold_met);

    let translation_prompt = provider.requests()[1].last_user_text().unwrap();
    assert!(translation_prompt.contains("## Pre-Translation Analysis:"));
    assert!(translation_prompt.contains("\"pod\" → 파드"));
}

#[tokio::test]
async fn test_translate_simpleEvaluationLow_shouldReflectThenImprove() {
    let provider = MockProvider::scripted([
        "Bonjur le monde",
        r#"{"score": 50, "issues": ["typo"]}"#,
        "1. Fix the typo in Bonjur",
        "Bonjour le monde",
        r#"{"score": 90}"#,
    ]);
    let options = AgentOptions {
        use_mqm: Some(false),
        quality_threshold: Some(80.0),
        max_iterations: Some(3),
        ..Default::default()
    };

    let result = agent(&provider, options)
        .translate(&TranslationRequest::new("Hello world", "en", "fr"))
        .await
        .unwrap();

    assert_eq!(result.content, "Bonjour le monde");
    assert_eq!(result.metadata.iterations, 2);
    assert_eq!(result.metadata.quality_score, 90.0);
    assert!(result.metadata.tokens_used.total() > 0);

    let prompts: Vec<String> = provider
        .requests()
        .iter()
        .map(|r| r.last_user_text().unwrap_or_default())
        .collect();
    assert!(prompts[2].starts_with("Review this translation"));
    assert!(prompts[3].starts_with("Improve this translation"));
    assert!(prompts[3].contains("Fix the typo in Bonjur"));
}

#[tokio::test]
async fn test_translate_withGlossary_shouldReportCompliance() {
    let dir = create_temp_dir().unwrap();
    let glossary = load_glossary(&create_k8s_glossary(dir.path()).unwrap()).unwrap();
    let provider = korean_translator();
    let options = AgentOptions {
        mode: Some(QualityMode::Fast),
        ..Default::default()
    };
    let request = TranslationRequest::new("Set up a Kubernetes cluster.", "en", "ko")
        .with_glossary(Arc::new(resolve_glossary(&glossary, "ko")));

    let result = agent(&provider, options).translate(&request).await.unwrap();

    assert_eq!(result.content, "Kubernetes 클러스터를 설정합니다.");
    let compliance = result.glossary_compliance.unwrap();
    assert!(compliance.is_compliant());
    assert_eq!(compliance.applied.len(), 2);

    let prompt = provider.requests()[0].last_user_text().unwrap();
    assert!(prompt.contains("클러스터"));
}

#[tokio::test]
async fn test_translate_explicitModel_shouldBeSentAndReported() {
    let provider = MockProvider::scripted(["Hallo"]).with_model("mock-default");
    let options = AgentOptions {
        mode: Some(QualityMode::Fast),
        model: Some("mock-large".to_string()),
        ..Default::default()
    };

    let result = agent(&provider, options)
        .translate(&TranslationRequest::new("Hello", "en", "de"))
        .await
        .unwrap();

    assert_eq!(provider.requests()[0].model.as_deref(), Some("mock-large"));
    assert_eq!(result.metadata.model, "mock-large");
}
