//! Endow a callable with orthogonal, named behaviors without touching its
//! body: timed and logged execution, memoized result caching, or arbitrary
//! constant metadata, all through one composition contract.
//!
//! ```
//! use endow::{endow, Args, Callable, CachedCall, CacheConfig, Value};
//!
//! let sum = Callable::new("sum", |args: &Args| {
//!     let mut total = 0i64;
//!     for v in &args.positional {
//!         if let Value::Integer(i) = v {
//!             total += i;
//!         }
//!     }
//!     Ok(Value::Integer(total))
//! });
//!
//! let dir = tempfile::tempdir().unwrap();
//! let wrapped = endow(
//!     sum,
//!     vec![(
//!         "remember",
//!         CachedCall::with_config(CacheConfig {
//!             cache_directory: dir.path().to_path_buf(),
//!             warn_on_cache_event: false,
//!         }),
//!     )],
//! )
//! .unwrap();
//!
//! // direct call: identical to the original callable
//! assert_eq!(wrapped.call(&Args::positional([1i64, 2])).unwrap(), Value::Integer(3));
//! // routed call: memoized through the cache directory
//! assert_eq!(
//!     wrapped.invoke("remember", Args::positional([1i64, 2])).unwrap(),
//!     Some(Value::Integer(3))
//! );
//! ```

pub mod attachments;
pub mod callable;
pub mod compose;
pub mod encoding;
pub mod error;
pub mod store;
pub mod values;

pub use attachments::debug::{DebugCall, DebugConfig, RenderPolicy};
pub use attachments::remember::{CacheConfig, CacheStats, CachedCall};
pub use callable::{Args, CallSite, Callable};
pub use compose::{
    endow, AttachmentConfig, AttachmentSpec, AttachmentState, Endowed, Operation,
    RESERVED_ATTACHMENT_NAMES,
};
pub use error::{EndowError, RuntimeResult};
pub use store::ResultStore;
pub use values::Value;
