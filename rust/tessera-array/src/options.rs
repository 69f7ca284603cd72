//! Construction-time configuration of a [`TupleArray`](crate::TupleArray).

use tessera_common::{Result, verify_arg};

use crate::growth::GrowthPolicy;

/// What happens when an array backed by a borrowed block
/// ([`Ownership::Borrowed`](tessera_buffer::Ownership::Borrowed)) has to change
/// its capacity, either to grow or to reclaim unused space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorrowedGrowth {
    /// Copy the live values into a freshly allocated, owned block. The borrowed
    /// block is left intact for its owner.
    #[default]
    CopyOnGrow,
    /// Fail with `InvalidOperation` and leave the array unchanged.
    Refuse,
}

/// Options for [`TupleArray::with_options`](crate::TupleArray::with_options).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayOptions {
    /// Number of components per tuple; at least 1.
    pub tuple_width: usize,
    pub growth: GrowthPolicy,
    /// Number of elements allocated up front.
    pub initial_capacity: usize,
    pub borrowed_growth: BorrowedGrowth,
}

impl ArrayOptions {
    /// Options reproducing the historical single-component array: `size` elements
    /// allocated up front and linear growth by `extend`, both clamped to at least 1.
    pub fn legacy(size: usize, extend: usize) -> ArrayOptions {
        ArrayOptions {
            tuple_width: 1,
            growth: GrowthPolicy::Linear {
                increment: extend.max(1),
            },
            initial_capacity: size.max(1),
            borrowed_growth: BorrowedGrowth::CopyOnGrow,
        }
    }

    pub fn with_tuple_width(mut self, tuple_width: usize) -> Self {
        self.tuple_width = tuple_width;
        self
    }

    pub fn with_growth(mut self, growth: GrowthPolicy) -> Self {
        self.growth = growth;
        self
    }

    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn with_borrowed_growth(mut self, borrowed_growth: BorrowedGrowth) -> Self {
        self.borrowed_growth = borrowed_growth;
        self
    }

    pub fn validate(&self) -> Result<()> {
        verify_arg!(tuple_width, self.tuple_width > 0);
        self.growth.validate()
    }
}

impl Default for ArrayOptions {
    fn default() -> Self {
        ArrayOptions {
            tuple_width: 1,
            growth: GrowthPolicy::default(),
            initial_capacity: 0,
            borrowed_growth: BorrowedGrowth::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tessera_common::error::ErrorKind;

    use super::*;

    #[test]
    fn test_default_options() {
        let options = ArrayOptions::default();
        assert_eq!(options.tuple_width, 1);
        assert_eq!(options.growth, GrowthPolicy::DOUBLING);
        assert_eq!(options.initial_capacity, 0);
        assert_eq!(options.borrowed_growth, BorrowedGrowth::CopyOnGrow);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_legacy_options_clamp() {
        let options = ArrayOptions::legacy(0, 0);
        assert_eq!(options.initial_capacity, 1);
        assert_eq!(options.growth, GrowthPolicy::Linear { increment: 1 });
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_invalid_options() {
        let err = ArrayOptions::default()
            .with_tuple_width(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { name, .. } if name == "tuple_width"));

        let err = ArrayOptions::default()
            .with_growth(GrowthPolicy::Linear { increment: 0 })
            .validate()
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    }
}
