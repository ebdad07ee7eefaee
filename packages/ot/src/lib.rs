//! # ftext OT
//!
//! Linear text operations and the operational-transform engine behind
//! collaborative editing.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ operation: Retain / Insert / Delete spans   │
//! │  - apply, compose, invert                   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ transform: reconcile concurrent operations  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ wire: JSON encoding with submitter identity │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Everything here is pure: no I/O, no shared state. Documents, sessions and
//! the server live in `ftext-editor` and `ftext-workspace`.
//!
//! ## Usage
//!
//! ```rust
//! use ftext_ot::{transform, Operation};
//!
//! let base = "hello";
//! let a = Operation::builder().retain(5).insert("X").build();
//! let b = Operation::builder().insert("Y").retain(5).build();
//!
//! let (a_prime, b_prime) = transform(&a, &b).unwrap();
//! let left = b_prime.apply(&a.apply(base).unwrap()).unwrap();
//! let right = a_prime.apply(&b.apply(base).unwrap()).unwrap();
//! assert_eq!(left, "YhelloX");
//! assert_eq!(left, right);
//! ```

mod errors;
mod ids;
mod operation;
mod transform;
mod wire;

pub use errors::OtError;
pub use ids::ClientId;
pub use operation::{Component, Operation, OperationBuilder};
pub use transform::{transform, transform_ordered, SubmissionKey};
pub use wire::AuthoredOperation;
