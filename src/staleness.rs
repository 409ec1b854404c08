//! Staleness reconciliation for displayed interpretation text.
//!
//! Interpretation text is generated against a chart's effective "as of"
//! moment. The chart can drift afterwards — most commonly a transit
//! chart's "now" advancing as the user leaves the page open, or the user
//! explicitly picking a different date. This module decides when
//! previously shown text should carry a "this may be outdated —
//! regenerate?" affordance.
//!
//! Two layers:
//!
//! - [`is_stale`] — the pure comparison. Stale when provenance exists and
//!   the gap between its recorded as-of moment and the chart's current
//!   one exceeds a tolerance. The default tolerance
//!   ([`DEFAULT_STALENESS_TOLERANCE`], one hour) absorbs normal
//!   re-render jitter around "now" while still catching a deliberate
//!   date change.
//!
//! - [`ReviewState`] — an explicit state machine over the displayed
//!   text's lifecycle, decoupled from any rendering framework. Dismissing
//!   the warning is display-only state; it resets as soon as provenance
//!   or parameters change again.
//!
//! Nothing here mutates server state or performs I/O.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Default drift tolerance: one hour.
///
/// Chosen to absorb UI re-render/recompute jitter around "now" while
/// still catching a user who explicitly moved the transit date.
pub const DEFAULT_STALENESS_TOLERANCE: Duration = Duration::from_secs(3600);

/// What was true at the moment text was generated (or manually edited).
///
/// Client-resident and ephemeral; created when text is produced, cleared
/// when text is cleared, never otherwise mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provenance {
    /// The chart's effective "as of" moment at generation time.
    pub effective_as_of: DateTime<Utc>,
    /// When the text was generated or edited.
    pub generated_at: DateTime<Utc>,
}

impl Provenance {
    /// Record provenance for text produced now against `effective_as_of`.
    pub fn now(effective_as_of: DateTime<Utc>) -> Self {
        Self {
            effective_as_of,
            generated_at: Utc::now(),
        }
    }
}

/// Pure staleness comparison.
///
/// Not stale when there is no provenance (nothing generated yet) or no
/// current parameter value to compare against. Otherwise stale exactly
/// when the absolute drift exceeds `tolerance` — a drift of exactly
/// `tolerance` is still fresh.
pub fn is_stale(
    provenance: Option<&Provenance>,
    current_as_of: Option<DateTime<Utc>>,
    tolerance: Duration,
) -> bool {
    let (Some(provenance), Some(current)) = (provenance, current_as_of) else {
        return false;
    };
    let drift = (current - provenance.effective_as_of).abs();
    let tolerance =
        chrono::Duration::from_std(tolerance).unwrap_or_else(|_| chrono::Duration::hours(1));
    drift > tolerance
}

/// Display lifecycle of an interpretation on a chart view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    /// No text generated yet.
    Empty,
    /// Text on screen matches the chart's current parameters.
    Fresh,
    /// Parameters drifted beyond tolerance; warning is showing.
    StaleUnacknowledged,
    /// Parameters drifted, but the user dismissed the warning.
    StaleDismissed,
}

/// Events that drive [`ReviewState`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewEvent {
    /// Text was generated against the given as-of moment.
    Generated { effective_as_of: DateTime<Utc> },
    /// Text was manually edited; provenance re-anchors to the given moment.
    Edited { effective_as_of: DateTime<Utc> },
    /// The chart's effective as-of moment changed (or re-computed).
    ParametersChanged { effective_as_of: DateTime<Utc> },
    /// The user dismissed the staleness warning.
    Dismissed,
    /// The text was durably saved.
    Persisted,
    /// The text was cleared.
    Cleared,
}

/// State machine tracking whether displayed text needs a regenerate
/// prompt, plus the persistence marker for the "not yet saved"
/// affordance.
///
/// ```rust
/// # use urania::staleness::{InterpretationReview, ReviewEvent, ReviewState};
/// # use chrono::{Duration, Utc};
/// let mut review = InterpretationReview::new();
/// let t = Utc::now();
/// review.apply(ReviewEvent::Generated { effective_as_of: t });
/// assert_eq!(review.state(), ReviewState::Fresh);
///
/// review.apply(ReviewEvent::ParametersChanged { effective_as_of: t + Duration::hours(4) });
/// assert_eq!(review.state(), ReviewState::StaleUnacknowledged);
/// assert!(review.needs_regenerate_prompt());
/// ```
#[derive(Debug, Clone)]
pub struct InterpretationReview {
    state: ReviewState,
    provenance: Option<Provenance>,
    persisted: bool,
    tolerance: Duration,
}

impl InterpretationReview {
    /// Empty review with the default one-hour tolerance.
    pub fn new() -> Self {
        Self::with_tolerance(DEFAULT_STALENESS_TOLERANCE)
    }

    /// Empty review with a custom tolerance.
    pub fn with_tolerance(tolerance: Duration) -> Self {
        Self {
            state: ReviewState::Empty,
            provenance: None,
            persisted: false,
            tolerance,
        }
    }

    pub fn state(&self) -> ReviewState {
        self.state
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }

    /// Whether the UI should show the regenerate affordance.
    pub fn needs_regenerate_prompt(&self) -> bool {
        self.state == ReviewState::StaleUnacknowledged
    }

    /// Persistence marker: false means the text exists only in the
    /// ephemeral cache and the UI should offer "save".
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Apply an event, returning the resulting state.
    pub fn apply(&mut self, event: ReviewEvent) -> ReviewState {
        match event {
            ReviewEvent::Generated { effective_as_of }
            | ReviewEvent::Edited { effective_as_of } => {
                self.provenance = Some(Provenance::now(effective_as_of));
                self.persisted = false;
                self.state = ReviewState::Fresh;
            }
            ReviewEvent::ParametersChanged { effective_as_of } => {
                // Any parameter change resets a dismissal: the user
                // dismissed a warning about the OLD drift, not this one.
                if self.provenance.is_some() {
                    self.state = if is_stale(
                        self.provenance.as_ref(),
                        Some(effective_as_of),
                        self.tolerance,
                    ) {
                        ReviewState::StaleUnacknowledged
                    } else {
                        ReviewState::Fresh
                    };
                }
            }
            ReviewEvent::Dismissed => {
                if self.state == ReviewState::StaleUnacknowledged {
                    self.state = ReviewState::StaleDismissed;
                }
            }
            ReviewEvent::Persisted => {
                self.persisted = true;
            }
            ReviewEvent::Cleared => {
                self.provenance = None;
                self.persisted = false;
                self.state = ReviewState::Empty;
            }
        }
        self.state
    }
}

impl Default for InterpretationReview {
    fn default() -> Self {
        Self::new()
    }
}
