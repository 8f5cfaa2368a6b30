/*!
 * Tests for project configuration loading and merging
 */

use llm_translate::app_config::{CachePolicyPreset, Config, ConfigOverrides, LogLevel, ProviderKind};
use llm_translate::errors::TranslationError;
use llm_translate::translation::QualityMode;

use crate::common::{create_temp_dir, create_test_file};

const FULL_CONFIG: &str = r#"{
  "version": "1.0",
  "project": {"name": "Docs", "purpose": "Kubernetes operator guide"},
  "languages": {"source": "en", "targets": ["ko", "ja"], "styles": {"ko": "formal, 합니다체"}},
  "provider": {"default": "openai", "model": "gpt-4o-mini", "apiKeys": {"openai": "sk-test"}},
  "quality": {"threshold": 80, "maxIterations": 3, "mode": "quality", "strict": true},
  "chunking": {"maxTokens": 2048, "overlapTokens": 100},
  "glossary": {"path": "./glossary.json", "strict": true},
  "paths": {"output": "./i18n/{lang}", "cache": ".cache"},
  "cache": {"policy": "strict", "qualityFloor": 90},
  "concurrency": {"chunks": 2, "files": 4},
  "ignore": ["**/drafts/**"],
  "logLevel": "debug"
}"#;

#[test]
fn test_fromFile_fullConfig_shouldParseEverySection() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), ".translaterc.json", FULL_CONFIG).unwrap();

    let config = Config::from_file(&path).unwrap();

    assert_eq!(config.project.as_ref().unwrap().purpose, "Kubernetes operator guide");
    assert_eq!(config.languages.targets, vec!["ko".to_string(), "ja".to_string()]);
    assert_eq!(config.style_for("ko"), Some("formal, 합니다체"));
    assert_eq!(config.style_for("ja"), None);
    assert_eq!(config.provider.default, ProviderKind::OpenAI);
    assert_eq!(config.provider.api_keys.get(&ProviderKind::OpenAI).map(String::as_str), Some("sk-test"));
    assert_eq!(config.quality.mode, Some(QualityMode::Quality));
    assert!(config.quality.strict);
    assert_eq!(config.chunking.max_tokens, 2048);
    assert!(config.glossary.as_ref().unwrap().strict);
    assert_eq!(config.cache.policy, CachePolicyPreset::Strict);
    assert_eq!(config.cache.quality_floor, 90.0);
    assert_eq!(config.concurrency.files, 4);
    assert_eq!(config.ignore, vec!["**/drafts/**".to_string()]);
    assert_eq!(config.log_level, LogLevel::Debug);
}

#[test]
fn test_findConfigFile_nestedDirectory_shouldWalkUp() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), ".translaterc", "{}").unwrap();
    let nested = dir.path().join("docs/guide/advanced");
    std::fs::create_dir_all(&nested).unwrap();

    assert_eq!(Config::find_config_file(&nested), Some(path));
    // An empty object yields the defaults
    assert_eq!(Config::load(None, &nested).unwrap(), Config::default());
}

#[test]
fn test_fromFile_malformedJson_shouldBeConfigInvalid() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "broken.json", r#"{"quality": {"threshold": }"#).unwrap();

    let err = Config::from_file(&path).unwrap_err();

    assert!(matches!(err, TranslationError::ConfigInvalid { .. }));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_defaultProject_shouldSurviveSaveAndLoad() {
    let dir = create_temp_dir().unwrap();
    let json = serde_json::to_string_pretty(&Config::default_project()).unwrap();
    let path = create_test_file(dir.path(), ".translaterc.json", &json).unwrap();

    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded, Config::default_project());
    assert_eq!(loaded.languages.targets, vec!["ko".to_string()]);
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_merge_glossaryOverride_shouldKeepConfiguredStrictness() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), ".translaterc.json", FULL_CONFIG).unwrap();
    let overrides = ConfigOverrides {
        glossary: Some("other.json".to_string()),
        model: Some("gpt-4o".to_string()),
        ..Default::default()
    };

    let merged = Config::from_file(&path).unwrap().merge(&overrides);

    let glossary = merged.glossary.unwrap();
    assert_eq!(glossary.path, "other.json");
    assert!(glossary.strict);
    assert_eq!(merged.provider.model.as_deref(), Some("gpt-4o"));
    assert_eq!(merged.languages.targets.len(), 2);
}

#[test]
fn test_merge_invalidChunkSize_shouldFailValidation() {
    let overrides = ConfigOverrides {
        chunk_size: Some(50),
        ..Default::default()
    };

    let err = Config::default().merge(&overrides).validate().unwrap_err();

    match err {
        TranslationError::ConfigInvalid { errors, .. } => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].starts_with("chunking.maxTokens"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_cachePolicyPreset_fromStr_shouldRejectUnknown() {
    assert_eq!("MINIMAL".parse::<CachePolicyPreset>().unwrap(), CachePolicyPreset::Minimal);
    assert!("aggressive".parse::<CachePolicyPreset>().is_err());
}
