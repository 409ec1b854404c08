//! Interpretation provider abstraction.
//!
//! [`InterpretationProvider`] is the outbound seam to the AI
//! text-generation service. The gateway only ever calls it after an
//! admission-control pass and a cache miss; a provider failure leaves the
//! cache untouched (no negative caching).
//!
//! [`HttpInterpretationProvider`] is the production implementation — a
//! thin reqwest client. [`RetryingProvider`] decorates any provider with
//! exponential-backoff retry on transient errors.

pub mod http;
pub mod retry;
pub mod traits;

pub use http::HttpInterpretationProvider;
pub use retry::{RetryConfig, RetryingProvider};
pub use traits::{GenerationRequest, InterpretationProvider, RelationshipType, School};
