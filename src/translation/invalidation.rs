/*!
 * Cache invalidation policies.
 *
 * A policy inspects the current run (glossary hash, provider, model, time)
 * and answers with one of three outcomes: leave the cache alone, wipe it,
 * or drop the entries a predicate selects. Policies are trait objects
 * identified by a stable name so they can be removed at runtime.
 */

use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::app_config::CachePolicyPreset;
use super::cache::CacheEntry;

/// Predicate over `(entry, key)`; true means "invalidate"
pub type EntryFilter = Box<dyn Fn(&CacheEntry, &str) -> bool + Send + Sync>;

/// What a policy sees when it is checked
#[derive(Debug, Clone)]
pub struct InvalidationContext {
    pub glossary_hash: Option<String>,
    /// Filled in by the cache manager from its stored metadata
    pub previous_glossary_hash: Option<String>,
    pub target_lang: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub current_time: DateTime<Utc>,
}

impl Default for InvalidationContext {
    fn default() -> Self {
        Self {
            glossary_hash: None,
            previous_glossary_hash: None,
            target_lang: None,
            provider: None,
            model: None,
            current_time: Utc::now(),
        }
    }
}

pub enum InvalidationResult {
    Skip,
    InvalidateAll { reason: String },
    InvalidateMatching { reason: String, filter: EntryFilter },
}

impl InvalidationResult {
    pub fn should_invalidate(&self) -> bool {
        !matches!(self, Self::Skip)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Skip => None,
            Self::InvalidateAll { reason } | Self::InvalidateMatching { reason, .. } => Some(reason),
        }
    }
}

impl fmt::Debug for InvalidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "Skip"),
            Self::InvalidateAll { reason } => write!(f, "InvalidateAll({})", reason),
            Self::InvalidateMatching { reason, .. } => write!(f, "InvalidateMatching({})", reason),
        }
    }
}

/// A rule deciding which cache entries are stale
pub trait InvalidationPolicy: Send + Sync + fmt::Debug {
    /// Stable identifier used for removal
    fn name(&self) -> &str;

    fn check(&self, context: &InvalidationContext) -> InvalidationResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlossaryChangeMode {
    /// Wipe the whole cache
    All,
    /// Drop only entries made with the previous glossary
    Matching,
}

#[derive(Debug, Clone)]
pub struct GlossaryChangePolicy {
    mode: GlossaryChangeMode,
}

impl GlossaryChangePolicy {
    pub fn new(mode: GlossaryChangeMode) -> Self {
        Self { mode }
    }
}

impl Default for GlossaryChangePolicy {
    fn default() -> Self {
        Self::new(GlossaryChangeMode::All)
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

impl InvalidationPolicy for GlossaryChangePolicy {
    fn name(&self) -> &str {
        "GlossaryChangePolicy"
    }

    fn check(&self, context: &InvalidationContext) -> InvalidationResult {
        let (Some(current), Some(previous)) = (&context.glossary_hash, &context.previous_glossary_hash) else {
            return InvalidationResult::Skip;
        };
        if current == previous {
            return InvalidationResult::Skip;
        }

        match self.mode {
            GlossaryChangeMode::All => InvalidationResult::InvalidateAll {
                reason: format!("Glossary changed ({} → {})", short_hash(previous), short_hash(current)),
            },
            GlossaryChangeMode::Matching => {
                let previous = previous.clone();
                InvalidationResult::InvalidateMatching {
                    reason: "Glossary changed, invalidating matching entries".to_string(),
                    filter: Box::new(move |entry, _| entry.glossary_hash == previous),
                }
            }
        }
    }
}

/// Drops entries older than a fixed age
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    ttl: Duration,
}

impl TtlPolicy {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn hours(hours: i64) -> Self {
        Self::new(Duration::hours(hours))
    }

    pub fn days(days: i64) -> Self {
        Self::new(Duration::days(days))
    }
}

impl InvalidationPolicy for TtlPolicy {
    fn name(&self) -> &str {
        "TTLPolicy"
    }

    fn check(&self, context: &InvalidationContext) -> InvalidationResult {
        let now = context.current_time;
        let ttl = self.ttl;
        InvalidationResult::InvalidateMatching {
            reason: format!("TTL check ({}ms)", ttl.num_milliseconds()),
            // Entries with an unreadable timestamp are kept
            filter: Box::new(move |entry, _| {
                entry.created_at_time().is_some_and(|created| now - created > ttl)
            }),
        }
    }
}

/// Drops entries produced by a different provider (and optionally model)
#[derive(Debug, Clone)]
pub struct ProviderChangePolicy {
    check_model: bool,
}

impl ProviderChangePolicy {
    pub fn new(check_model: bool) -> Self {
        Self { check_model }
    }
}

impl Default for ProviderChangePolicy {
    fn default() -> Self {
        Self::new(true)
    }
}

impl InvalidationPolicy for ProviderChangePolicy {
    fn name(&self) -> &str {
        "ProviderChangePolicy"
    }

    fn check(&self, context: &InvalidationContext) -> InvalidationResult {
        let Some(provider) = context.provider.clone() else {
            return InvalidationResult::Skip;
        };
        let model = if self.check_model { context.model.clone() } else { None };

        InvalidationResult::InvalidateMatching {
            reason: "Provider/model mismatch check".to_string(),
            filter: Box::new(move |entry, _| {
                entry.provider != provider || model.as_ref().is_some_and(|m| &entry.model != m)
            }),
        }
    }
}

/// Drops entries scored below a floor
#[derive(Debug, Clone)]
pub struct QualityThresholdPolicy {
    threshold: f64,
}

impl QualityThresholdPolicy {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl InvalidationPolicy for QualityThresholdPolicy {
    fn name(&self) -> &str {
        "QualityThresholdPolicy"
    }

    fn check(&self, _context: &InvalidationContext) -> InvalidationResult {
        let threshold = self.threshold;
        InvalidationResult::InvalidateMatching {
            reason: format!("Quality below threshold ({})", threshold),
            filter: Box::new(move |entry, _| entry.quality_score < threshold),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeMode {
    Any,
    All,
}

/// Combines several policies into one
#[derive(Debug)]
pub struct CompositePolicy {
    policies: Vec<Box<dyn InvalidationPolicy>>,
    mode: CompositeMode,
}

impl CompositePolicy {
    pub fn new(policies: Vec<Box<dyn InvalidationPolicy>>, mode: CompositeMode) -> Self {
        Self { policies, mode }
    }
}

impl InvalidationPolicy for CompositePolicy {
    fn name(&self) -> &str {
        "CompositePolicy"
    }

    fn check(&self, context: &InvalidationContext) -> InvalidationResult {
        let mut names = Vec::new();
        let mut filters: Vec<EntryFilter> = Vec::new();

        for policy in &self.policies {
            match policy.check(context) {
                InvalidationResult::Skip => {}
                InvalidationResult::InvalidateAll { reason } => {
                    return InvalidationResult::InvalidateAll {
                        reason: format!("{}: {}", policy.name(), reason),
                    };
                }
                InvalidationResult::InvalidateMatching { filter, .. } => {
                    names.push(policy.name().to_string());
                    filters.push(filter);
                }
            }
        }

        if filters.is_empty() {
            return InvalidationResult::Skip;
        }

        let reasons = names.join(", ");
        match self.mode {
            CompositeMode::Any => InvalidationResult::InvalidateMatching {
                reason: format!("Composite (any): {}", reasons),
                filter: Box::new(move |entry, key| filters.iter().any(|f| f(entry, key))),
            },
            CompositeMode::All => InvalidationResult::InvalidateMatching {
                reason: format!("Composite (all): {}", reasons),
                filter: Box::new(move |entry, key| filters.iter().all(|f| f(entry, key))),
            },
        }
    }
}

/// Glossary change wipes everything; entries expire after 30 days
pub fn default_policies() -> Vec<Box<dyn InvalidationPolicy>> {
    vec![
        Box::new(GlossaryChangePolicy::new(GlossaryChangeMode::All)),
        Box::new(TtlPolicy::days(30)),
    ]
}

pub fn strict_policies(quality_threshold: f64) -> Vec<Box<dyn InvalidationPolicy>> {
    vec![
        Box::new(GlossaryChangePolicy::new(GlossaryChangeMode::All)),
        Box::new(ProviderChangePolicy::new(true)),
        Box::new(QualityThresholdPolicy::new(quality_threshold)),
        Box::new(TtlPolicy::days(7)),
    ]
}

pub fn minimal_policies() -> Vec<Box<dyn InvalidationPolicy>> {
    vec![Box::new(GlossaryChangePolicy::new(GlossaryChangeMode::Matching))]
}

pub fn policies_for_preset(preset: CachePolicyPreset, quality_floor: f64) -> Vec<Box<dyn InvalidationPolicy>> {
    match preset {
        CachePolicyPreset::Default => default_policies(),
        CachePolicyPreset::Strict => strict_policies(quality_floor),
        CachePolicyPreset::Minimal => minimal_policies(),
        CachePolicyPreset::None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(glossary_hash: &str, provider: &str, model: &str, score: f64, created_at: &str) -> CacheEntry {
        CacheEntry {
            source_hash: "abc".to_string(),
            source_lang: "en".to_string(),
            target_lang: "ko".to_string(),
            glossary_hash: glossary_hash.to_string(),
            translation: "번역".to_string(),
            quality_score: score,
            created_at: created_at.to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
        }
    }

    fn matches(result: &InvalidationResult, entry: &CacheEntry) -> bool {
        match result {
            InvalidationResult::InvalidateMatching { filter, .. } => filter(entry, "key"),
            _ => panic!("expected matching result, got {:?}", result),
        }
    }

    #[test]
    fn test_glossaryChange_sameOrMissingHash_shouldSkip() {
        let policy = GlossaryChangePolicy::default();
        let mut context = InvalidationContext {
            glossary_hash: Some("aaaa1111".to_string()),
            ..Default::default()
        };
        assert!(!policy.check(&context).should_invalidate());

        context.previous_glossary_hash = Some("aaaa1111".to_string());
        assert!(!policy.check(&context).should_invalidate());
    }

    #[test]
    fn test_glossaryChange_allMode_shouldInvalidateEverything() {
        let policy = GlossaryChangePolicy::new(GlossaryChangeMode::All);
        let context = InvalidationContext {
            glossary_hash: Some("bbbbbbbb22222222".to_string()),
            previous_glossary_hash: Some("aaaaaaaa11111111".to_string()),
            ..Default::default()
        };
        let result = policy.check(&context);
        assert!(matches!(result, InvalidationResult::InvalidateAll { .. }));
        assert_eq!(result.reason(), Some("Glossary changed (aaaaaaaa → bbbbbbbb)"));
    }

    #[test]
    fn test_glossaryChange_matchingMode_shouldSelectOldHashOnly() {
        let policy = GlossaryChangePolicy::new(GlossaryChangeMode::Matching);
        let context = InvalidationContext {
            glossary_hash: Some("new".to_string()),
            previous_glossary_hash: Some("old".to_string()),
            ..Default::default()
        };
        let result = policy.check(&context);
        assert!(matches(&result, &entry("old", "claude", "m", 90.0, "")));
        assert!(!matches(&result, &entry("new", "claude", "m", 90.0, "")));
    }

    #[test]
    fn test_ttl_shouldSelectEntriesOlderThanTtl() {
        let now = Utc::now();
        let context = InvalidationContext { current_time: now, ..Default::default() };
        let result = TtlPolicy::days(30).check(&context);

        let old = (now - Duration::days(31)).to_rfc3339();
        let fresh = (now - Duration::days(1)).to_rfc3339();
        assert!(matches(&result, &entry("", "claude", "m", 90.0, &old)));
        assert!(!matches(&result, &entry("", "claude", "m", 90.0, &fresh)));
        assert!(!matches(&result, &entry("", "claude", "m", 90.0, "not a date")));
    }

    #[test]
    fn test_providerChange_shouldSelectOtherProviderOrModel() {
        let context = InvalidationContext {
            provider: Some("claude".to_string()),
            model: Some("haiku".to_string()),
            ..Default::default()
        };

        let strict = ProviderChangePolicy::new(true).check(&context);
        assert!(matches(&strict, &entry("", "openai", "haiku", 90.0, "")));
        assert!(matches(&strict, &entry("", "claude", "sonnet", 90.0, "")));
        assert!(!matches(&strict, &entry("", "claude", "haiku", 90.0, "")));

        let lenient = ProviderChangePolicy::new(false).check(&context);
        assert!(!matches(&lenient, &entry("", "claude", "sonnet", 90.0, "")));

        let no_provider = ProviderChangePolicy::default().check(&InvalidationContext::default());
        assert!(!no_provider.should_invalidate());
    }

    #[test]
    fn test_qualityThreshold_shouldSelectLowScores() {
        let result = QualityThresholdPolicy::new(80.0).check(&InvalidationContext::default());
        assert!(matches(&result, &entry("", "claude", "m", 70.0, "")));
        assert!(!matches(&result, &entry("", "claude", "m", 90.0, "")));
    }

    #[test]
    fn test_composite_allScopeChild_shouldShortCircuit() {
        let composite = CompositePolicy::new(
            vec![
                Box::new(QualityThresholdPolicy::new(80.0)),
                Box::new(GlossaryChangePolicy::new(GlossaryChangeMode::All)),
            ],
            CompositeMode::Any,
        );
        let context = InvalidationContext {
            glossary_hash: Some("new".to_string()),
            previous_glossary_hash: Some("old".to_string()),
            ..Default::default()
        };
        let result = composite.check(&context);
        assert!(matches!(result, InvalidationResult::InvalidateAll { .. }));
        assert!(result.reason().unwrap().starts_with("GlossaryChangePolicy:"));
    }

    #[test]
    fn test_composite_anyVersusAll_shouldCombineFilters() {
        let context = InvalidationContext {
            provider: Some("claude".to_string()),
            ..Default::default()
        };
        let build = |mode| {
            CompositePolicy::new(
                vec![
                    Box::new(QualityThresholdPolicy::new(80.0)),
                    Box::new(ProviderChangePolicy::new(false)),
                ],
                mode,
            )
        };
        let low_same_provider = entry("", "claude", "m", 50.0, "");
        let low_other_provider = entry("", "openai", "m", 50.0, "");

        let any = build(CompositeMode::Any).check(&context);
        assert!(matches(&any, &low_same_provider));

        let all = build(CompositeMode::All).check(&context);
        assert!(!matches(&all, &low_same_provider));
        assert!(matches(&all, &low_other_provider));
    }

    #[test]
    fn test_presets_shouldHaveDocumentedPolicies() {
        let names = |p: Vec<Box<dyn InvalidationPolicy>>| p.iter().map(|p| p.name().to_string()).collect::<Vec<_>>();
        assert_eq!(names(default_policies()), vec!["GlossaryChangePolicy", "TTLPolicy"]);
        assert_eq!(
            names(strict_policies(85.0)),
            vec!["GlossaryChangePolicy", "ProviderChangePolicy", "QualityThresholdPolicy", "TTLPolicy"]
        );
        assert_eq!(names(minimal_policies()), vec!["GlossaryChangePolicy"]);
        assert!(policies_for_preset(CachePolicyPreset::None, 85.0).is_empty());
    }
}
