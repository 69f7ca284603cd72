//! Capacity growth rules applied when a write needs more room than the backing
//! storage currently has.

use tessera_common::{Result, error::Error};

/// The rule that picks a new capacity once the current one is insufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrowthPolicy {
    /// Multiply the current capacity by `factor` (at least the required capacity).
    /// Appending `n` values triggers `O(log n)` reallocations.
    Geometric { factor: usize },
    /// Extend the current capacity by the smallest multiple of `increment` that
    /// covers the requested capacity: `current + increment * ceil((required - current) / increment)`.
    Linear { increment: usize },
}

impl GrowthPolicy {
    /// Amortized doubling.
    pub const DOUBLING: GrowthPolicy = GrowthPolicy::Geometric { factor: 2 };

    pub fn linear(increment: usize) -> Result<GrowthPolicy> {
        let policy = GrowthPolicy::Linear { increment };
        policy.validate()?;
        Ok(policy)
    }

    pub fn geometric(factor: usize) -> Result<GrowthPolicy> {
        let policy = GrowthPolicy::Geometric { factor };
        policy.validate()?;
        Ok(policy)
    }

    /// Checks the policy parameters: a geometric factor must be at least 2 and
    /// a linear increment at least 1.
    pub fn validate(&self) -> Result<()> {
        match *self {
            GrowthPolicy::Geometric { factor } if factor < 2 => Err(Error::invalid_arg(
                "factor",
                format!("geometric growth factor must be at least 2, got {factor}"),
            )),
            GrowthPolicy::Linear { increment } if increment == 0 => Err(Error::invalid_arg(
                "increment",
                "linear growth increment must be at least 1",
            )),
            _ => Ok(()),
        }
    }

    /// Returns the capacity to grow to from `current` so that at least `required`
    /// elements fit. The result is never less than `required`.
    ///
    /// Should the rule overflow `usize`, the exact `required` capacity is returned.
    pub fn next_capacity(&self, current: usize, required: usize) -> usize {
        if required <= current {
            return current;
        }
        match *self {
            GrowthPolicy::Geometric { factor } => current
                .checked_mul(factor)
                .map_or(required, |grown| grown.max(required)),
            GrowthPolicy::Linear { increment } => {
                let increment = increment.max(1);
                (required - current)
                    .div_ceil(increment)
                    .checked_mul(increment)
                    .and_then(|extra| current.checked_add(extra))
                    .unwrap_or(required)
            }
        }
    }
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        GrowthPolicy::DOUBLING
    }
}
