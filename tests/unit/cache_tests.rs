/*!
 * Tests for the translation cache and its invalidation policies
 */

use llm_translate::translation::cache::{generate_cache_key, hash_content, CacheKey, CacheManager, TranslationCache};
use llm_translate::translation::invalidation::{
    CompositeMode, CompositePolicy, GlossaryChangeMode, GlossaryChangePolicy, InvalidationContext,
    InvalidationPolicy, ProviderChangePolicy, QualityThresholdPolicy,
};

use crate::common::create_temp_dir;

fn key<'a>(content: &'a str, glossary: Option<&'a str>, model: &'a str) -> CacheKey<'a> {
    CacheKey {
        content,
        source_lang: "en",
        target_lang: "ko",
        glossary,
        provider: "claude",
        model,
    }
}

fn context(glossary: Option<&str>, model: &str) -> InvalidationContext {
    InvalidationContext {
        glossary_hash: glossary.map(hash_content),
        target_lang: Some("ko".to_string()),
        provider: Some("claude".to_string()),
        model: Some(model.to_string()),
        ..InvalidationContext::default()
    }
}

#[test]
fn test_cacheKey_eachField_shouldChangeKey() {
    let base = key("Hello", Some("g"), "m1");
    let variants = [
        key("Hello!", Some("g"), "m1"),
        key("Hello", None, "m1"),
        key("Hello", Some("g2"), "m1"),
        key("Hello", Some("g"), "m2"),
        CacheKey { source_lang: "fr", ..base },
        CacheKey { target_lang: "ja", ..base },
        CacheKey { provider: "openai", ..base },
    ];

    assert_eq!(generate_cache_key(&base), generate_cache_key(&key("Hello", Some("g"), "m1")));
    for variant in &variants {
        assert_ne!(generate_cache_key(&base), generate_cache_key(variant));
    }
}

#[test]
fn test_qualityThresholdPolicy_shouldDropOnlyLowScoredEntry() {
    let dir = create_temp_dir().unwrap();
    let cache = CacheManager::new(dir.path()).with_policies(vec![Box::new(QualityThresholdPolicy::new(80.0))]);
    cache.set(&key("low", None, "m1"), "낮음", 70.0);
    cache.set(&key("high", None, "m1"), "높음", 90.0);

    let removed = cache.apply_policies(&context(None, "m1"));

    assert_eq!(removed, 1);
    assert_eq!(cache.stats().entries, 1);
    assert!(cache.get(&key("high", None, "m1")).is_some());
    assert!(cache.get(&key("low", None, "m1")).is_none());
}

#[test]
fn test_glossaryChangeMatching_shouldDropOnlyOldGlossaryEntries() {
    let dir = create_temp_dir().unwrap();
    let policies = || -> Vec<Box<dyn InvalidationPolicy>> {
        vec![Box::new(GlossaryChangePolicy::new(GlossaryChangeMode::Matching))]
    };

    {
        let cache = CacheManager::new(dir.path()).with_policies(policies());
        assert_eq!(cache.apply_policies(&context(Some("v1"), "m1")), 0);
        cache.set(&key("with glossary", Some("v1"), "m1"), "용어집", 90.0);
        cache.set(&key("without glossary", None, "m1"), "없음", 90.0);
    }

    // A new process sees the persisted hash and notices the change
    let cache = CacheManager::new(dir.path()).with_policies(policies());
    let removed = cache.apply_policies(&context(Some("v2"), "m1"));

    assert_eq!(removed, 1);
    assert!(cache.get(&key("without glossary", None, "m1")).is_some());
}

#[test]
fn test_glossaryChangeAll_firstRunForNewLanguage_shouldKeepOtherLanguages() {
    let dir = create_temp_dir().unwrap();
    let cache = CacheManager::new(dir.path()).with_policies(vec![Box::new(GlossaryChangePolicy::new(GlossaryChangeMode::All))]);

    assert_eq!(cache.apply_policies(&context(Some("v1"), "m1")), 0);
    cache.set(&key("Hello", Some("v1"), "m1"), "안녕하세요", 90.0);

    let japanese = InvalidationContext {
        target_lang: Some("ja".to_string()),
        ..context(Some("v1-ja"), "m1")
    };
    assert_eq!(cache.apply_policies(&japanese), 0);
    assert_eq!(cache.apply_policies(&context(Some("v1"), "m1")), 0);
    assert!(cache.get(&key("Hello", Some("v1"), "m1")).is_some());

    // A real edit for a language already seen still clears
    assert_eq!(cache.apply_policies(&context(Some("v2"), "m1")), 1);
}

#[test]
fn test_providerChangePolicy_newModel_shouldDropOtherModels() {
    let dir = create_temp_dir().unwrap();
    let cache = CacheManager::new(dir.path()).with_policies(vec![Box::new(ProviderChangePolicy::new(true))]);
    cache.set(&key("a", None, "m1"), "A", 90.0);
    cache.set(&key("b", None, "m2"), "B", 90.0);

    let removed = cache.apply_policies(&context(None, "m2"));

    assert_eq!(removed, 1);
    assert!(cache.get(&key("b", None, "m2")).is_some());
}

#[test]
fn test_compositeAll_shouldRequireEveryPolicyToMatch() {
    let dir = create_temp_dir().unwrap();
    let composite = CompositePolicy::new(
        vec![
            Box::new(QualityThresholdPolicy::new(80.0)),
            Box::new(ProviderChangePolicy::new(true)),
        ],
        CompositeMode::All,
    );
    let cache = CacheManager::new(dir.path()).with_policies(vec![Box::new(composite)]);
    cache.set(&key("low old", None, "m1"), "1", 50.0);
    cache.set(&key("low current", None, "m2"), "2", 50.0);
    cache.set(&key("high old", None, "m1"), "3", 95.0);

    let removed = cache.apply_policies(&context(None, "m2"));

    assert_eq!(removed, 1);
    assert_eq!(cache.stats().entries, 2);
}

#[test]
fn test_compositeAny_glossaryWipe_shouldClearEverything() {
    let dir = create_temp_dir().unwrap();
    let composite = CompositePolicy::new(
        vec![
            Box::new(QualityThresholdPolicy::new(10.0)),
            Box::new(GlossaryChangePolicy::new(GlossaryChangeMode::All)),
        ],
        CompositeMode::Any,
    );
    let cache = CacheManager::new(dir.path()).with_policies(vec![Box::new(composite)]);
    cache.apply_policies(&context(Some("v1"), "m1"));
    cache.set(&key("a", Some("v1"), "m1"), "A", 90.0);
    cache.set(&key("b", None, "m1"), "B", 90.0);

    let removed = cache.apply_policies(&context(Some("v2"), "m1"));

    assert_eq!(removed, 2);
    assert_eq!(cache.stats().entries, 0);
}
