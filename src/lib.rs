//! marketgate - credential-injecting proxy and read-through cache for a
//! rate-limited market-data API.
//!
//! The gateway forwards client requests to the upstream API, injects the
//! server-held credential, and caches responses so repeated queries for the
//! same resource do not re-hit the upstream within a TTL window. The cache is
//! fail-open: a broken store degrades to direct computation, never to a
//! failed request.

pub mod apis;
pub mod arguments;
pub mod cache;
pub mod config;
pub mod errors;
pub mod logger;
pub mod webserver;

pub use cache::{CacheManager, CacheStore, MemoryStore, RestKvStore};
pub use config::Config;
pub use errors::{GatewayError, GatewayResult};
