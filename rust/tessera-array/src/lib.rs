//! Typed, resizable, multi-component arrays.
//!
//! A [`TupleArray`] stores homogeneous numeric values contiguously and addresses
//! them either by flat index or by tuple index, where a tuple is a fixed-width
//! group of consecutive values (an XYZ point, an RGB triple). The array separates
//! its logical length from the capacity of its backing [`Storage`], grows through a
//! configurable [`GrowthPolicy`], and can adopt caller-supplied memory under an
//! explicit retention and deletion contract.
//!
//! Access comes in two tiers: checked methods that report
//! [`ErrorKind::IndexOutOfRange`](tessera_common::error::ErrorKind::IndexOutOfRange),
//! and `unsafe` unchecked methods whose preconditions are documented per method.
//!
//! [`AnyTupleArray`] is the closed sum over all supported element kinds and replaces
//! runtime type identity checks with exhaustive matching.
//!
//! # Example
//!
//! ```
//! use tessera_array::TupleArray;
//!
//! let mut points = TupleArray::<f64>::new(3).unwrap();
//! points.insert_next_tuple(&[1.0, 2.0, 3.0]).unwrap();
//! points.insert_next_tuple(&[4.0, 5.0, 6.0]).unwrap();
//! assert_eq!(points.num_tuples(), 2);
//! assert_eq!(points.get_value(4).unwrap(), 5.0);
//! ```

pub mod any;
pub mod element;
pub mod growth;
mod legacy;
pub mod options;
pub mod tuple_array;

pub use any::AnyTupleArray;
pub use element::{Element, ElementKind};
pub use growth::GrowthPolicy;
pub use options::{ArrayOptions, BorrowedGrowth};
pub use tuple_array::TupleArray;

pub use tessera_buffer::{DeletionMethod, OwnedBuffer, Ownership, Retention, Storage};
