//! Caching subsystem.
//!
//! One cache with two layers:
//!
//! - [`CacheBackend`](interpretation::CacheBackend) — the storage seam.
//!   The default [`InMemoryBackend`](interpretation::InMemoryBackend) is
//!   moka-backed and never fails; a shared backend (e.g. redis for
//!   multiple uraniad instances) plugs in via
//!   [`UraniaBuilder::cache_backend()`](crate::UraniaBuilder::cache_backend).
//!
//! - [`InterpretationCache`](interpretation::InterpretationCache) — the
//!   policy wrapper every caller goes through. It absorbs the global
//!   enabled/disabled switch, enforces lazy TTL expiry at read time, and
//!   degrades backend failures to soft misses so an unreachable store
//!   never fails a request.

pub mod interpretation;

pub use interpretation::{
    CacheBackend, CacheConfig, CachedInterpretation, InMemoryBackend, InterpretationCache,
};
