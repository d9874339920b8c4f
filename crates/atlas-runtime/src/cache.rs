//! Per-source detection cache.
//!
//! Source type and chapter detection run once per source text. Sessions for
//! different summary types over the same source share the cached
//! [`SourceAnalysis`] read-only.

use moka::future::Cache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use atlas_core::{analyze_source, SectionStrategy, SourceAnalysis};

use crate::config::CacheConfig;

/// Cache key: the source text plus the chapter fallback the analysis used.
///
/// The text hash is computed once and feeds `Hash`. Equality compares the
/// text itself, so two sources that collide on the hash stay distinct.
#[derive(Clone, Debug)]
pub struct SourceKey {
    source_hash: u64,
    source: Arc<str>,
    fallback: SectionStrategy,
}

impl SourceKey {
    pub fn new(source_text: &str, fallback: SectionStrategy) -> Self {
        let mut hasher = DefaultHasher::new();
        source_text.hash(&mut hasher);
        Self {
            source_hash: hasher.finish(),
            source: Arc::from(source_text),
            fallback,
        }
    }
}

impl PartialEq for SourceKey {
    fn eq(&self, other: &Self) -> bool {
        self.source_hash == other.source_hash
            && self.fallback == other.fallback
            && self.source == other.source
    }
}

impl Eq for SourceKey {}

impl Hash for SourceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source_hash.hash(state);
        self.fallback.hash(state);
    }
}

pub struct AnalysisCache {
    cache: Cache<SourceKey, Arc<SourceAnalysis>>,
}

impl AnalysisCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl)
    }

    /// Cached analysis for a source, running detection on a miss.
    pub async fn get_or_analyze(
        &self,
        source_text: &str,
        fallback: SectionStrategy,
    ) -> Arc<SourceAnalysis> {
        let key = SourceKey::new(source_text, fallback);
        self.cache
            .get_with(key, async {
                let analysis = analyze_source(source_text, fallback);
                tracing::info!(
                    source_type = %analysis.source_type.detected_type,
                    chapters = analysis.chapters.chapters.len(),
                    words = analysis.source_word_count,
                    "Source analyzed"
                );
                for note in analysis.ambiguities() {
                    note.log();
                }
                Arc::new(analysis)
            })
            .await
    }

    pub async fn get(&self, source_text: &str, fallback: SectionStrategy) -> Option<Arc<SourceAnalysis>> {
        self.cache.get(&SourceKey::new(source_text, fallback)).await
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "Chapter 1: Cue\nThe author argues that cues start habits.\nChapter 2: Reward\nRewards close the loop.";

    #[tokio::test]
    async fn test_miss_then_shared_hit() {
        let cache = AnalysisCache::default();
        assert!(cache.get(SOURCE, SectionStrategy::MergeAdjacent).await.is_none());

        let first = cache.get_or_analyze(SOURCE, SectionStrategy::MergeAdjacent).await;
        let second = cache.get_or_analyze(SOURCE, SectionStrategy::MergeAdjacent).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.chapters.chapters.len(), 2);
    }

    #[tokio::test]
    async fn test_fallback_is_part_of_key() {
        let cache = AnalysisCache::default();
        let merged = cache.get_or_analyze(SOURCE, SectionStrategy::MergeAdjacent).await;
        let monolith = cache.get_or_analyze(SOURCE, SectionStrategy::TreatAsMonolith).await;

        assert!(!Arc::ptr_eq(&merged, &monolith));
        assert!(cache.get(SOURCE, SectionStrategy::TreatAsMonolith).await.is_some());
    }

    #[test]
    fn test_keys_with_equal_hash_compare_text() {
        let key = SourceKey::new(SOURCE, SectionStrategy::MergeAdjacent);
        let colliding = SourceKey {
            source: Arc::from("A different source entirely."),
            ..key.clone()
        };

        assert_eq!(key, SourceKey::new(SOURCE, SectionStrategy::MergeAdjacent));
        assert_ne!(key, colliding);
    }
}
