/*!
 * Tests for glossary loading, resolution and compliance
 */

use llm_translate::errors::TranslationError;
use llm_translate::translation::glossary::{
    check_compliance, load_glossary, resolve_glossary, save_glossary, validate_glossary, GlossaryLookup, GlossaryTerm,
};

use crate::common::{create_k8s_glossary, create_temp_dir, create_test_file};

#[test]
fn test_compliance_glossaryApplied_shouldListAppliedTerms() {
    let dir = create_temp_dir().unwrap();
    let glossary = load_glossary(&create_k8s_glossary(dir.path()).unwrap()).unwrap();
    let resolved = resolve_glossary(&glossary, "ko");

    let result = check_compliance("Set up a Kubernetes cluster.", "Kubernetes 클러스터를 설정합니다.", &resolved);

    assert_eq!(result.applied, vec!["Kubernetes", "cluster"]);
    assert!(result.missed.is_empty());
    assert_eq!(result.score, 100.0);
}

#[test]
fn test_compliance_glossaryIgnored_shouldListMissedTerms() {
    let dir = create_temp_dir().unwrap();
    let glossary = load_glossary(&create_k8s_glossary(dir.path()).unwrap()).unwrap();
    let resolved = resolve_glossary(&glossary, "ko");

    let result = check_compliance("Set up a Kubernetes cluster.", "쿠버네티스 그룹을 설정합니다.", &resolved);

    assert_eq!(result.missed, vec!["Kubernetes", "cluster"]);
    assert!(result.applied.is_empty());
    assert!(!result.is_compliant());
}

#[test]
fn test_resolve_doNotTranslate_shouldKeepSourceForEveryLanguage() {
    let dir = create_temp_dir().unwrap();
    let glossary = load_glossary(&create_k8s_glossary(dir.path()).unwrap()).unwrap();

    for lang in ["ko", "ja", "de"] {
        let resolved = resolve_glossary(&glossary, lang);
        let term = resolved.terms.iter().find(|t| t.source == "kubectl").unwrap();
        assert_eq!(term.target, "kubectl");
        assert!(term.do_not_translate);
    }
}

#[test]
fn test_resolve_missingTarget_shouldDropTerm() {
    let dir = create_temp_dir().unwrap();
    let glossary = load_glossary(&create_k8s_glossary(dir.path()).unwrap()).unwrap();

    let resolved = resolve_glossary(&glossary, "de");

    let sources: Vec<&str> = resolved.terms.iter().map(|t| t.source.as_str()).collect();
    assert_eq!(sources, vec!["kubectl"]);
}

#[test]
fn test_lookup_formatForPrompt_shouldFlagCaseAndKeepAsIs() {
    let dir = create_temp_dir().unwrap();
    let glossary = load_glossary(&create_k8s_glossary(dir.path()).unwrap()).unwrap();
    let resolved = resolve_glossary(&glossary, "ko");

    let text = GlossaryLookup::new(&resolved).format_for_prompt();

    assert!(text.contains("\"cluster\" → \"클러스터\""));
    assert!(text.contains("case-sensitive"));
    assert!(text.contains("\"kubectl\" → [DO NOT TRANSLATE, keep as-is]"));
}

#[test]
fn test_loadGlossary_missingFile_shouldBeGlossaryNotFound() {
    let dir = create_temp_dir().unwrap();
    let err = load_glossary(&dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, TranslationError::GlossaryNotFound { .. }));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_loadGlossary_malformedJson_shouldBeGlossaryInvalid() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "bad.json", "{ not json").unwrap();

    let err = load_glossary(&path).unwrap_err();
    assert!(matches!(err, TranslationError::GlossaryInvalid { .. }));
    assert_eq!(err.exit_code(), 6);
}

#[test]
fn test_addTermAndSave_shouldRoundTripThroughFile() {
    let dir = create_temp_dir().unwrap();
    let path = create_k8s_glossary(dir.path()).unwrap();
    let mut glossary = load_glossary(&path).unwrap();

    let mut term = GlossaryTerm {
        source: "pod".to_string(),
        ..GlossaryTerm::default()
    };
    term.targets.insert("ko".to_string(), "파드".to_string());
    glossary.add_term(term.clone()).unwrap();
    assert!(glossary.add_term(GlossaryTerm { source: "POD".to_string(), ..term }).is_err());
    save_glossary(&glossary, &path).unwrap();

    let reloaded = load_glossary(&path).unwrap();
    assert_eq!(reloaded.terms.len(), 4);
    assert!(validate_glossary(&reloaded).is_empty());
}
