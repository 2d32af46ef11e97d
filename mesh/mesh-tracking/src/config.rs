//! Configuration for identity allocation and tracking.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default upper bound for protrusion identities.
pub const MAX_PROTRUSIONS_INDEX: u32 = 100_000;

/// Configuration for protrusion tracking.
///
/// # Example
///
/// ```
/// use mesh_tracking::TrackingConfig;
///
/// let config = TrackingConfig::new()
///     .with_max_index(5_000)
///     .with_seed(7);
/// assert_eq!(config.max_index, 5_000);
/// assert_eq!(config.seed, Some(7));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackingConfig {
    /// Inclusive upper bound for newly allocated identities.
    ///
    /// Every collision in a merge raises the lower bound to the identity it
    /// was given, so this also caps how many collisions one merge absorbs.
    pub max_index: u32,
    /// Rejection-sampling attempts before sampling the free set directly.
    pub retry_budget: usize,
    /// Free fraction of the range below which the free set is sampled directly.
    pub dense_free_ratio: f64,
    /// Optional seed for reproducible allocation.
    pub seed: Option<u64>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_index: MAX_PROTRUSIONS_INDEX,
            retry_budget: 64,
            dense_free_ratio: 0.05,
            seed: None,
        }
    }
}

impl TrackingConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the upper identity bound.
    #[must_use]
    pub const fn with_max_index(mut self, max_index: u32) -> Self {
        self.max_index = max_index;
        self
    }

    /// Set the rejection-sampling budget.
    #[must_use]
    pub const fn with_retry_budget(mut self, attempts: usize) -> Self {
        self.retry_budget = attempts;
        self
    }

    /// Set the free-ratio threshold for direct sampling, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_dense_free_ratio(mut self, ratio: f64) -> Self {
        self.dense_free_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Set a random seed for reproducibility.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
