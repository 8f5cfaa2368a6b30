/*!
 * End-to-end document translation through the engine with mock providers
 */

use std::sync::Arc;

use llm_translate::errors::TranslationError;
use llm_translate::providers::MockProvider;
use llm_translate::translation::invalidation::default_policies;
use llm_translate::translation::{CacheManager, DocumentFormat, TranslateOptions, TranslationCache, TranslationEngine};

use crate::common::mock_providers::{korean_translator, uppercase_translator, LOW_MQM};
use crate::common::{create_k8s_glossary, create_temp_dir, create_test_file, fast_config, init_test_logging, K8S_GLOSSARY};

const SAMPLE: &str = "Set up a Kubernetes cluster.";

fn engine(provider: MockProvider) -> TranslationEngine {
    TranslationEngine::new(fast_config(), Arc::new(provider))
}

#[tokio::test]
async fn test_translateContent_glossaryFollowed_shouldReportCompliance() {
    let dir = create_temp_dir().unwrap();
    let options = TranslateOptions {
        glossary_path: Some(create_k8s_glossary(dir.path()).unwrap()),
        strict_glossary: true,
        ..TranslateOptions::new("en", "ko")
    };

    let result = engine(korean_translator()).translate_content(SAMPLE, &options).await.unwrap();

    assert_eq!(result.content, "Kubernetes 클러스터를 설정합니다.");
    let compliance = result.glossary_compliance.unwrap();
    assert_eq!(compliance.applied, vec!["Kubernetes", "cluster"]);
    assert!(compliance.missed.is_empty());
    assert_eq!(result.metadata.format, DocumentFormat::Text);
}

#[tokio::test]
async fn test_translateContent_strictGlossaryIgnored_shouldFailWithMissedTerms() {
    let dir = create_temp_dir().unwrap();
    let options = TranslateOptions {
        glossary_path: Some(create_k8s_glossary(dir.path()).unwrap()),
        strict_glossary: true,
        ..TranslateOptions::new("en", "ko")
    };

    let err = engine(uppercase_translator()).translate_content(SAMPLE, &options).await.unwrap_err();

    match err {
        TranslationError::GlossaryComplianceFailed { missed, total, .. } => {
            assert_eq!(missed, vec!["Kubernetes", "cluster"]);
            assert_eq!(total, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_translateContent_lenientGlossaryIgnored_shouldStillSucceed() {
    let dir = create_temp_dir().unwrap();
    let options = TranslateOptions {
        glossary_path: Some(create_k8s_glossary(dir.path()).unwrap()),
        ..TranslateOptions::new("en", "ko")
    };

    let result = engine(uppercase_translator()).translate_content(SAMPLE, &options).await.unwrap();

    assert_eq!(result.content, "SET UP A KUBERNETES CLUSTER.");
    assert!(!result.glossary_compliance.unwrap().is_compliant());
}

#[tokio::test]
async fn test_translateContent_strictQualityNeverMet_shouldFail() {
    init_test_logging();
    let provider = MockProvider::responder(|request| {
        let text = request.last_user_text().unwrap_or_default();
        if text.contains("Evaluate this translation using MQM") {
            LOW_MQM.to_string()
        } else {
            "Bonjur.".to_string()
        }
    });
    let options = TranslateOptions {
        quality_threshold: Some(99.0),
        max_iterations: Some(2),
        strict_quality: true,
        ..TranslateOptions::new("en", "fr")
    };

    let err = TranslationEngine::new(Default::default(), Arc::new(provider))
        .translate_content("Hello.", &options)
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), 4);
    match err {
        TranslationError::QualityThresholdNotMet { score, threshold, iterations, .. } => {
            assert_eq!(score, 95.0);
            assert_eq!(threshold, 99.0);
            assert_eq!(iterations, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_translateContent_html_shouldKeepSkipElements() {
    let html = "<html><body><h1>Guide</h1>\n<p>Press <kbd>Ctrl</kbd> to copy.</p>\n<script>let a = 1;</script></body></html>";
    let options = TranslateOptions {
        format: Some(DocumentFormat::Html),
        ..TranslateOptions::new("en", "de")
    };

    let result = engine(uppercase_translator()).translate_content(html, &options).await.unwrap();

    assert!(result.content.contains("PRESS <kbd>Ctrl</kbd> TO COPY."));
    assert!(result.content.contains("<script>let a = 1;</script>"));
    assert!(result.content.contains("GUIDE"));
}

#[tokio::test]
async fn test_translateFile_markdownExtension_shouldUseMarkdownFormat() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(
        dir.path(),
        "guide.md",
        "# Install\n\nRun the command below.\n\n```bash\nkubectl apply -f app.yaml\n```\n",
    )
    .unwrap();

    let result = engine(uppercase_translator())
        .translate_file(&path, &TranslateOptions::new("en", "ja"))
        .await
        .unwrap();

    assert_eq!(result.metadata.format, DocumentFormat::Markdown);
    assert!(result.content.contains("RUN THE COMMAND BELOW."));
    assert!(result.content.contains("```bash\nkubectl apply -f app.yaml\n```"));
}

#[tokio::test]
async fn test_translateContent_glossaryEdited_shouldInvalidateCache() {
    init_test_logging();
    let work = create_temp_dir().unwrap();
    let cache_dir = create_temp_dir().unwrap();
    let glossary_path = create_k8s_glossary(work.path()).unwrap();
    let cache = Arc::new(CacheManager::new(cache_dir.path()).with_policies(default_policies()));
    let engine = engine(korean_translator()).with_cache(cache.clone());
    let options = TranslateOptions {
        glossary_path: Some(glossary_path.clone()),
        ..TranslateOptions::new("en", "ko")
    };

    let first = engine.translate_content(SAMPLE, &options).await.unwrap();
    let second = engine.translate_content(SAMPLE, &options).await.unwrap();
    assert_eq!(first.metadata.cache.hits, 0);
    assert_eq!(second.metadata.cache.hits, 1);
    assert_eq!(cache.stats().entries, 1);

    std::fs::write(&glossary_path, K8S_GLOSSARY.replace("클러스터", "클러스터 그룹")).unwrap();
    let third = engine.translate_content(SAMPLE, &options).await.unwrap();

    assert_eq!(third.metadata.cache.hits, 0);
    // The old entry went with the glossary change
    assert_eq!(cache.stats().entries, 1);
}

#[tokio::test]
async fn test_translateContent_secondTargetLanguage_shouldKeepFirstLanguageCache() {
    init_test_logging();
    let work = create_temp_dir().unwrap();
    let cache_dir = create_temp_dir().unwrap();
    let cache = Arc::new(CacheManager::new(cache_dir.path()).with_policies(default_policies()));
    let engine = engine(korean_translator()).with_cache(cache.clone());
    let glossary_path = create_k8s_glossary(work.path()).unwrap();
    let options = |target: &str| TranslateOptions {
        glossary_path: Some(glossary_path.clone()),
        ..TranslateOptions::new("en", target)
    };

    engine.translate_content(SAMPLE, &options("ko")).await.unwrap();
    engine.translate_content(SAMPLE, &options("ja")).await.unwrap();
    assert_eq!(cache.stats().entries, 2);

    let rerun = engine.translate_content(SAMPLE, &options("ko")).await.unwrap();
    assert_eq!(rerun.metadata.cache.hits, 1);
}
