//! # Transform
//!
//! `transform(a, b)` takes two operations built against the same text and
//! returns `(a', b')` such that applying `a` then `b'` gives the same text as
//! applying `b` then `a'`:
//!
//! ```text
//!            base
//!          a /  \ b
//!           /    \
//!           \    /
//!         b' \  / a'
//!           result
//! ```
//!
//! Rules, walking both operations over the shared base text:
//!
//! - inserted text from either side is kept and skipped by the other side
//! - when both sides insert at the same offset, `a`'s text comes first
//! - a range deleted by both sides is deleted once
//! - a delete never removes text inserted concurrently by the other side

use crate::operation::remainder;
use crate::{ClientId, Component, Operation, OperationBuilder, OtError};

/// Transform two concurrent operations. `a` has priority for same-offset inserts.
pub fn transform(a: &Operation, b: &Operation) -> Result<(Operation, Operation), OtError> {
    let mismatch = || OtError::StructuralMismatch {
        left: a.base_len(),
        right: b.base_len(),
    };
    if a.base_len() != b.base_len() {
        return Err(mismatch());
    }

    let mut a_prime = OperationBuilder::new();
    let mut b_prime = OperationBuilder::new();
    let mut left = a.components().iter().cloned();
    let mut right = b.components().iter().cloned();
    let mut x = left.next();
    let mut y = right.next();

    loop {
        match (x, y) {
            (None, None) => break,
            (Some(Component::Insert(s)), rest) => {
                b_prime.retain(s.chars().count());
                a_prime.insert(&s);
                x = left.next();
                y = rest;
            }
            (rest, Some(Component::Insert(s))) => {
                a_prime.retain(s.chars().count());
                b_prime.insert(&s);
                x = rest;
                y = right.next();
            }
            (Some(Component::Retain(n)), Some(Component::Retain(m))) => {
                let step = n.min(m);
                a_prime.retain(step);
                b_prime.retain(step);
                x = remainder(Component::Retain(n), step).or_else(|| left.next());
                y = remainder(Component::Retain(m), step).or_else(|| right.next());
            }
            // Both sides removed the same characters: nothing left to do.
            (Some(Component::Delete(n)), Some(Component::Delete(m))) => {
                let step = n.min(m);
                x = remainder(Component::Delete(n), step).or_else(|| left.next());
                y = remainder(Component::Delete(m), step).or_else(|| right.next());
            }
            (Some(Component::Delete(n)), Some(Component::Retain(m))) => {
                let step = n.min(m);
                a_prime.delete(step);
                x = remainder(Component::Delete(n), step).or_else(|| left.next());
                y = remainder(Component::Retain(m), step).or_else(|| right.next());
            }
            (Some(Component::Retain(n)), Some(Component::Delete(m))) => {
                let step = n.min(m);
                b_prime.delete(step);
                x = remainder(Component::Retain(n), step).or_else(|| left.next());
                y = remainder(Component::Delete(m), step).or_else(|| right.next());
            }
            (None, Some(_)) | (Some(_), None) => return Err(mismatch()),
        }
    }

    Ok((a_prime.build(), b_prime.build()))
}

/// Ordering used to break ties between concurrent inserts at the same offset.
///
/// Lower revision wins; equal revisions fall back to client identity so the
/// outcome never depends on which side happens to call `transform`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubmissionKey {
    pub revision: u64,
    pub client: ClientId,
}

impl SubmissionKey {
    pub fn new(revision: u64, client: impl Into<ClientId>) -> Self {
        Self {
            revision,
            client: client.into(),
        }
    }
}

/// Like [`transform`], but the operation with the lower [`SubmissionKey`]
/// gets insert priority regardless of argument order.
pub fn transform_ordered(
    a: &Operation,
    a_key: &SubmissionKey,
    b: &Operation,
    b_key: &SubmissionKey,
) -> Result<(Operation, Operation), OtError> {
    if b_key < a_key {
        let (b_prime, a_prime) = transform(b, a)?;
        Ok((a_prime, b_prime))
    } else {
        transform(a, b)
    }
}
