//! Memoized invocation backed by the file-per-key result store.
//!
//! The effective key is either the caller-supplied `cache_id` override or
//! derived from (caller file, callable identity, encoded arguments). Entries
//! are never invalidated here; clearing a cache directory is the caller's
//! business.

use crate::callable::{Args, CallSite};
use crate::compose::{AttachmentSpec, AttachmentState, Operation};
use crate::encoding::keygen;
use crate::error::RuntimeResult;
use crate::store::ResultStore;
use crate::values::Value;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

/// Reserved call-time keyword overriding key derivation entirely.
pub const CACHE_ID_KEYWORD: &str = "cache_id";
/// Reserved call-time keyword: perform no invocation and no persistence.
pub const SKIP_KEYWORD: &str = "skip";

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub cache_directory: PathBuf,
    /// Print an advisory line on every hit, miss and skip.
    pub warn_on_cache_event: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_directory: PathBuf::from("."),
            warn_on_cache_event: true,
        }
    }
}

/// Advisory counters; informational only, never consulted for eviction.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
}

impl CacheStats {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_put(&mut self) {
        self.puts += 1;
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

/// Attachment that short-circuits delegate execution via persisted results.
pub struct CachedCall {
    state: AttachmentState,
    store: ResultStore,
    warn_on_cache_event: bool,
    stats: Rc<RefCell<CacheStats>>,
}

impl CachedCall {
    /// Attachment spec with default configuration (cache files next to the
    /// working directory, advisory warnings on).
    pub fn attach() -> AttachmentSpec {
        Self::with_config(CacheConfig::default())
    }

    /// Attachment spec with explicit configuration. An unusable cache
    /// directory fails the composition.
    pub fn with_config(config: CacheConfig) -> AttachmentSpec {
        let (spec, _stats) = Self::with_config_and_stats(config);
        spec
    }

    /// Like [`with_config`](Self::with_config), additionally handing back a
    /// shared view of the advisory counters.
    pub fn with_config_and_stats(config: CacheConfig) -> (AttachmentSpec, Rc<RefCell<CacheStats>>) {
        let stats = Rc::new(RefCell::new(CacheStats::default()));
        let shared = Rc::clone(&stats);
        let spec = AttachmentSpec::operation(move |state| {
            let store = ResultStore::new(&config.cache_directory)?;
            Ok(Box::new(CachedCall {
                state,
                store,
                warn_on_cache_event: config.warn_on_cache_event,
                stats,
            }) as Box<dyn Operation>)
        });
        (spec, shared)
    }

    fn warn(&self, message: &str) {
        if self.warn_on_cache_event {
            println!("[{}] {}", self.state.identity(), message);
        }
    }
}

impl Operation for CachedCall {
    fn invoke(&self, site: &CallSite, mut args: Args) -> RuntimeResult<Option<Value>> {
        let skip = args
            .take_named(SKIP_KEYWORD)
            .map(|v| v.is_truthy())
            .unwrap_or(false);
        let override_key = args.take_named(CACHE_ID_KEYWORD).map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        });

        if skip {
            self.warn("cache skipped: delegate not invoked, nothing stored");
            return Ok(None);
        }

        let key = match override_key {
            Some(key) => key,
            None => keygen::derive_key(site, self.state.identity(), &args)?,
        };

        if let Some(value) = self.store.load(&key)? {
            self.stats.borrow_mut().record_hit();
            self.warn(&format!(
                "cache hit for key {} ({} value)",
                key,
                value.type_name()
            ));
            return Ok(Some(value));
        }

        let output = self.state.delegate(&args)?;
        let path = self.store.save(&key, &output)?;
        {
            let mut stats = self.stats.borrow_mut();
            stats.record_miss();
            stats.record_put();
        }
        self.warn(&format!(
            "cache miss for key {}, stored at {}",
            key,
            path.display()
        ));
        Ok(Some(output))
    }
}
