//! Fresh protrusion identity allocation.
//!
//! Identities are drawn uniformly from an inclusive range, skipping every
//! value already in use. Draws are rejection-sampled while the range is
//! sparsely occupied; once the free fraction drops below the configured
//! threshold, or the retry budget runs out, the free values are enumerated
//! and one is picked directly.

// Range sizes fit comfortably in f64 mantissas
#![allow(clippy::cast_precision_loss)]

use hashbrown::HashSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::config::TrackingConfig;
use crate::error::{TrackingError, TrackingResult};

/// Allocates identities absent from a caller-maintained used set.
///
/// The allocator never inserts into the used set; callers add each returned
/// value before asking for the next one.
///
/// # Example
///
/// ```
/// use hashbrown::HashSet;
/// use mesh_tracking::{IdentityAllocator, TrackingConfig};
///
/// let mut allocator = IdentityAllocator::new(&TrackingConfig::new().with_seed(1));
/// let used: HashSet<u32> = [10, 11, 12].into_iter().collect();
///
/// let id = allocator.allocate(&used, 10, 13).unwrap();
/// assert_eq!(id, 13);
/// ```
#[derive(Debug, Clone)]
pub struct IdentityAllocator {
    rng: StdRng,
    retry_budget: usize,
    dense_free_ratio: f64,
}

impl IdentityAllocator {
    /// Create an allocator from a tracking configuration.
    ///
    /// A configured seed makes the sequence of identities reproducible.
    #[must_use]
    pub fn new(config: &TrackingConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            retry_budget: config.retry_budget,
            dense_free_ratio: config.dense_free_ratio,
        }
    }

    /// Draw an identity in `[min_index, max_index]` that is not in `used`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::RangeExhausted`] if the range is empty
    /// (`min_index > max_index`) or every value in it is already used.
    pub fn allocate(
        &mut self,
        used: &HashSet<u32>,
        min_index: u32,
        max_index: u32,
    ) -> TrackingResult<u32> {
        let exhausted = || TrackingError::RangeExhausted {
            min_index,
            max_index,
        };
        if min_index > max_index {
            return Err(exhausted());
        }

        let range_len = u64::from(max_index - min_index) + 1;
        let occupied = used
            .iter()
            .filter(|&&v| (min_index..=max_index).contains(&v))
            .count() as u64;
        let free = range_len - occupied;
        if free == 0 {
            return Err(exhausted());
        }

        let free_ratio = free as f64 / range_len as f64;
        if free_ratio >= self.dense_free_ratio {
            for _ in 0..self.retry_budget {
                let candidate = self.rng.gen_range(min_index..=max_index);
                if !used.contains(&candidate) {
                    return Ok(candidate);
                }
            }
            warn!(
                min_index,
                max_index,
                attempts = self.retry_budget,
                "Rejection sampling exhausted its budget, sampling free identities directly"
            );
        } else {
            debug!(
                min_index,
                max_index, free, "Range densely occupied, sampling free identities directly"
            );
        }

        // `free` values pass the filter, so the nth one always exists.
        let pick = self.rng.gen_range(0..free);
        let nth = usize::try_from(pick).map_err(|_| exhausted())?;
        (min_index..=max_index)
            .filter(|v| !used.contains(v))
            .nth(nth)
            .ok_or_else(exhausted)
    }
}
