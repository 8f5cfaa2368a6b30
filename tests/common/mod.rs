/*!
 * Common test utilities for the llm-translate test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use llm_translate::app_config::Config;
use llm_translate::translation::modes::QualityMode;

// Re-export the mock providers module
pub mod mock_providers;

/// Route library logs through the test harness; repeat calls are no-ops
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content, including parent directories
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Kubernetes glossary with a case-sensitive keep-as-is term
pub const K8S_GLOSSARY: &str = r#"{
  "metadata": {"name": "k8s", "sourceLang": "en", "targetLangs": ["ko", "ja"], "version": "1.0"},
  "terms": [
    {"source": "Kubernetes", "targets": {"ko": "Kubernetes", "ja": "Kubernetes"}, "caseSensitive": true},
    {"source": "cluster", "targets": {"ko": "클러스터", "ja": "クラスター"}},
    {"source": "kubectl", "targets": {}, "doNotTranslate": true}
  ]
}"#;

pub fn create_k8s_glossary(dir: &Path) -> Result<PathBuf> {
    create_test_file(dir, "glossary.json", K8S_GLOSSARY)
}

/// Config that translates in one pass with no evaluation
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.quality.mode = Some(QualityMode::Fast);
    config
}
