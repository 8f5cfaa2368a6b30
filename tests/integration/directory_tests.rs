/*!
 * Directory translation tests
 */

use std::sync::Arc;

use parking_lot::Mutex;

use llm_translate::file_utils::FileManager;
use llm_translate::translation::{BatchTranslator, TranslateOptions, TranslationEngine};

use crate::common::mock_providers::{korean_translator, uppercase_translator};
use crate::common::{create_k8s_glossary, create_temp_dir, create_test_file, fast_config, init_test_logging};

fn docs_tree(root: &std::path::Path) {
    create_test_file(root, "index.md", "# Welcome\n\nSet up a Kubernetes cluster.\n").unwrap();
    create_test_file(root, "guide/install.md", "Install the tools.").unwrap();
    create_test_file(root, "guide/faq.html", "<p>Questions?</p>").unwrap();
    create_test_file(root, "notes/readme.txt", "Plain notes.").unwrap();
    create_test_file(root, "node_modules/pkg/README.md", "Vendored.").unwrap();
    create_test_file(root, "assets/logo.svg", "<svg/>").unwrap();
}

fn batch(provider: llm_translate::providers::MockProvider) -> BatchTranslator {
    let mut config = fast_config();
    config.ignore = vec!["**/node_modules/**".to_string()];
    BatchTranslator::new(Arc::new(TranslationEngine::new(config, Arc::new(provider))))
}

#[test]
fn test_discover_shouldListSupportedDocumentsSorted() {
    let input = create_temp_dir().unwrap();
    docs_tree(input.path());

    let found = batch(uppercase_translator()).discover(input.path()).unwrap();

    let relative: Vec<String> = found
        .iter()
        .map(|p| p.strip_prefix(input.path()).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(
        relative,
        vec!["guide/faq.html", "guide/install.md", "index.md", "notes/readme.txt"]
    );
}

#[tokio::test]
async fn test_translateDirectory_shouldWriteEveryFormat() {
    let input = create_temp_dir().unwrap();
    let output = create_temp_dir().unwrap();
    docs_tree(input.path());

    let summary = batch(uppercase_translator())
        .with_concurrency(3)
        .translate_directory(input.path(), output.path(), &TranslateOptions::new("en", "fr"), |_| {})
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 0);
    assert!(summary.tokens_used.total() > 0);
    assert_eq!(
        FileManager::read_to_string(output.path().join("guide/install.md")).unwrap(),
        "INSTALL THE TOOLS."
    );
    assert_eq!(
        FileManager::read_to_string(output.path().join("guide/faq.html")).unwrap(),
        "<P>QUESTIONS?</P>"
    );
    assert!(!output.path().join("node_modules").exists());
    assert!(!output.path().join("assets").exists());
}

#[test]
fn test_translateDirectory_progress_shouldCountEveryFile() {
    init_test_logging();
    let input = create_temp_dir().unwrap();
    let output = create_temp_dir().unwrap();
    docs_tree(input.path());
    let seen = Mutex::new(Vec::new());
    let translator = batch(uppercase_translator()).with_concurrency(2);

    tokio_test::block_on(translator.translate_directory(
        input.path(),
        output.path(),
        &TranslateOptions::new("en", "fr"),
        |progress| {
            assert_eq!(progress.total, 4);
            seen.lock().push(progress.completed);
        },
    ))
    .unwrap();

    let mut seen = seen.into_inner();
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_translateDirectory_summaryJson_shouldUseCamelCase() {
    let input = create_temp_dir().unwrap();
    let output = create_temp_dir().unwrap();
    let glossary_dir = create_temp_dir().unwrap();
    create_test_file(input.path(), "index.md", "Set up a Kubernetes cluster.").unwrap();
    let options = TranslateOptions {
        glossary_path: Some(create_k8s_glossary(glossary_dir.path()).unwrap()),
        strict_glossary: true,
        ..TranslateOptions::new("en", "ko")
    };

    let summary = batch(korean_translator())
        .translate_directory(input.path(), output.path(), &options, |_| {})
        .await
        .unwrap();
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["succeeded"], 1);
    assert!(json["tokensUsed"]["inputTokens"].as_u64().unwrap() > 0);
    assert_eq!(json["files"][0]["success"], true);
    assert!(json["files"][0].get("error").is_none());
    assert_eq!(
        FileManager::read_to_string(output.path().join("index.md")).unwrap(),
        "Kubernetes 클러스터를 설정합니다."
    );
}
