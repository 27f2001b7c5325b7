use crate::config::{ChunkingConfig, OverlapConfig};
use crate::error::Result;
use crate::strategy::{SplitContext, SplitRequest, SplitStrategy, StrategyName};
use crate::types::CodeChunk;
use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Bounded in-process cache of strategy results, keyed by content hash.
///
/// Shared across concurrent `split()` calls. Reads take the read lock and
/// never reorder entries; writes are last-writer-wins.
pub struct ChunkCache {
    entries: RwLock<LruCache<String, Arc<Vec<CodeChunk>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Hit/miss counters of a [`ChunkCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl ChunkCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<Vec<CodeChunk>>> {
        let found = self
            .entries
            .read()
            .ok()
            .and_then(|entries| entries.peek(key).cloned());
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn put(&self, key: String, chunks: Arc<Vec<CodeChunk>>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.put(key, chunks);
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.read().map_or(0, |entries| entries.len()),
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

impl Default for ChunkCache {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for ChunkCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkCache")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Options that change a strategy's output for the same content
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyOptions<'a> {
    language: &'a str,
    file_path: Option<&'a str>,
    has_ast: bool,
    overlap: Option<&'a OverlapConfig>,
    chunking: &'a ChunkingConfig,
    strategy: &'a serde_json::Value,
}

/// Hex SHA-256 of `content`
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Outermost decorator: serves repeated requests from a [`ChunkCache`]
pub struct CacheDecorator {
    inner: Box<dyn SplitStrategy>,
    cache: Arc<ChunkCache>,
    overlap: Option<OverlapConfig>,
    chunking: ChunkingConfig,
    /// Options of the wrapped strategy, captured once
    strategy_options: serde_json::Value,
}

impl CacheDecorator {
    pub(crate) fn new(
        inner: Box<dyn SplitStrategy>,
        cache: Arc<ChunkCache>,
        overlap: Option<OverlapConfig>,
        chunking: ChunkingConfig,
    ) -> Self {
        let strategy_options = inner.options();
        Self {
            inner,
            cache,
            overlap,
            chunking,
            strategy_options,
        }
    }

    fn key(&self, request: &SplitRequest<'_>) -> String {
        let options = KeyOptions {
            language: request.language,
            file_path: request.file_path,
            has_ast: request.successful_parse().is_some(),
            overlap: self.overlap.as_ref(),
            chunking: &self.chunking,
            strategy: &self.strategy_options,
        };
        // Serializing plain structs into a String cannot fail.
        let options = serde_json::to_string(&options).unwrap_or_default();
        format!(
            "{}:{}:{}",
            content_hash(request.content),
            self.inner.name(),
            options
        )
    }
}

impl SplitStrategy for CacheDecorator {
    fn name(&self) -> StrategyName {
        self.inner.name()
    }

    fn priority(&self) -> u32 {
        self.inner.priority()
    }

    fn supported_languages(&self) -> &[String] {
        self.inner.supported_languages()
    }

    fn options(&self) -> serde_json::Value {
        self.inner.options()
    }

    fn can_handle(&self, context: &SplitContext<'_>) -> bool {
        self.inner.can_handle(context)
    }

    fn split(&self, request: &SplitRequest<'_>) -> Result<Vec<CodeChunk>> {
        let key = self.key(request);
        if let Some(hit) = self.cache.get(&key) {
            log::debug!("Cache hit for {} ({} chunks)", self.name(), hit.len());
            return Ok(hit.as_ref().clone());
        }

        let chunks = self.inner.split(request)?;
        if !chunks.is_empty() {
            self.cache.put(key, Arc::new(chunks.clone()));
        }
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingConfig;
    use crate::strategy;
    use std::sync::atomic::AtomicUsize;

    /// Counts how often the wrapped strategy actually runs
    struct Counting {
        inner: Box<dyn SplitStrategy>,
        calls: Arc<AtomicUsize>,
    }

    impl SplitStrategy for Counting {
        fn name(&self) -> StrategyName {
            self.inner.name()
        }
        fn priority(&self) -> u32 {
            self.inner.priority()
        }
        fn supported_languages(&self) -> &[String] {
            self.inner.supported_languages()
        }
        fn options(&self) -> serde_json::Value {
            self.inner.options()
        }
        fn can_handle(&self, context: &SplitContext<'_>) -> bool {
            self.inner.can_handle(context)
        }
        fn split(&self, request: &SplitRequest<'_>) -> Result<Vec<CodeChunk>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.split(request)
        }
    }

    fn cached(cache: Arc<ChunkCache>, calls: Arc<AtomicUsize>) -> CacheDecorator {
        let config = ProcessingConfig::default();
        let inner = Counting {
            inner: strategy::build(StrategyName::LineBased, &config),
            calls,
        };
        CacheDecorator::new(Box::new(inner), cache, None, config.chunking)
    }

    #[test]
    fn test_second_call_is_served_from_cache() {
        let cache = Arc::new(ChunkCache::new(8));
        let calls = Arc::new(AtomicUsize::new(0));
        let decorator = cached(cache.clone(), calls.clone());
        let request = SplitRequest::new("a\nb\nc", "text");

        let first = decorator.split(&request).unwrap();
        let second = decorator.split(&request).unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn test_key_depends_on_language_and_content() {
        let cache = Arc::new(ChunkCache::new(8));
        let calls = Arc::new(AtomicUsize::new(0));
        let decorator = cached(cache, calls.clone());

        decorator.split(&SplitRequest::new("a\nb", "text")).unwrap();
        decorator.split(&SplitRequest::new("a\nb", "python")).unwrap();
        decorator.split(&SplitRequest::new("a\nc", "text")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_shared_cache_separates_strategy_options() {
        let cache = Arc::new(ChunkCache::new(8));
        let content = (1..=20).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let request = SplitRequest::new(&content, "text");

        let with_window = |lines: usize| {
            let mut config = ProcessingConfig::default();
            config.line.max_lines_per_chunk = lines;
            CacheDecorator::new(
                strategy::build(StrategyName::LineBased, &config),
                cache.clone(),
                None,
                config.chunking,
            )
        };

        let small = with_window(2).split(&request).unwrap();
        let big = with_window(50).split(&request).unwrap();
        assert_eq!(small.len(), 10);
        assert_eq!(big.len(), 1);
        assert_eq!(cache.stats().entries, 2);
    }

    #[test]
    fn test_parameter_overrides_change_the_key() {
        let cache = Arc::new(ChunkCache::new(8));
        let content = "a {\n  b\n}\nc {\n  d\n}";
        let request = SplitRequest::new(content, "text");

        let with_min = |min: u64| {
            let mut config = ProcessingConfig::default();
            for row in &mut config.strategies {
                if row.name == StrategyName::BracketBalanced {
                    row.parameters
                        .insert("minChunkSize".to_string(), serde_json::json!(min));
                }
            }
            CacheDecorator::new(
                strategy::build(StrategyName::BracketBalanced, &config),
                cache.clone(),
                None,
                config.chunking,
            )
        };

        assert_eq!(with_min(1).split(&request).unwrap().len(), 2);
        assert_eq!(with_min(1000).split(&request).unwrap().len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = ChunkCache::new(1);
        cache.put("a".to_string(), Arc::new(Vec::new()));
        cache.put("b".to_string(), Arc::new(Vec::new()));
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());

        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_content_hash_is_hex_sha256() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
