//! # Text Operations
//!
//! An [`Operation`] walks a text from start to end and describes what happens
//! to it as a sequence of spans:
//!
//! ```text
//! base:    h e l l o
//!          └─retain 5─┘ insert "X"
//! target:  h e l l o X
//! ```
//!
//! - `Retain(n)` keeps the next `n` characters
//! - `Insert(s)` writes `s` at the cursor
//! - `Delete(n)` drops the next `n` characters
//!
//! All lengths count `char`s, not bytes.
//!
//! Operations are only built through [`OperationBuilder`], which keeps them in
//! canonical form: no empty components, no two adjacent components of the same
//! kind, and an insert next to a delete always comes first. Two operations with
//! the same effect therefore compare equal.

use crate::OtError;
use serde::{Deserialize, Serialize};

/// One span of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Retain(usize),
    Insert(String),
    Delete(usize),
}

impl Component {
    /// Number of characters this span covers (inserted characters for `Insert`).
    pub fn char_len(&self) -> usize {
        match self {
            Component::Retain(n) | Component::Delete(n) => *n,
            Component::Insert(s) => s.chars().count(),
        }
    }
}

/// What is left of `component` after its first `consumed` characters have been
/// handled, or `None` when it is used up.
pub(crate) fn remainder(component: Component, consumed: usize) -> Option<Component> {
    match component {
        Component::Retain(n) if n > consumed => Some(Component::Retain(n - consumed)),
        Component::Delete(n) if n > consumed => Some(Component::Delete(n - consumed)),
        Component::Insert(s) => {
            let rest: String = s.chars().skip(consumed).collect();
            if rest.is_empty() {
                None
            } else {
                Some(Component::Insert(rest))
            }
        }
        _ => None,
    }
}

fn prefix(s: &str, chars: usize) -> String {
    s.chars().take(chars).collect()
}

/// An immutable edit of a linear text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operation {
    components: Vec<Component>,
    base_len: usize,
    target_len: usize,
}

impl Operation {
    pub fn builder() -> OperationBuilder {
        OperationBuilder::new()
    }

    /// Build an operation from raw components, normalizing them.
    pub fn from_components(components: impl IntoIterator<Item = Component>) -> Self {
        let mut builder = OperationBuilder::new();
        for component in components {
            builder.push(component);
        }
        builder.build()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Length of the text this operation must be applied to.
    pub fn base_len(&self) -> usize {
        self.base_len
    }

    /// Length of the text this operation produces.
    pub fn target_len(&self) -> usize {
        self.target_len
    }

    /// True if applying the operation leaves any valid input unchanged.
    pub fn is_noop(&self) -> bool {
        self.components
            .iter()
            .all(|c| matches!(c, Component::Retain(_)))
    }

    /// Apply the operation to `text`.
    pub fn apply(&self, text: &str) -> Result<String, OtError> {
        let actual = text.chars().count();
        if actual != self.base_len {
            return Err(OtError::LengthMismatch {
                expected: self.base_len,
                actual,
            });
        }

        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars();
        for component in &self.components {
            match component {
                Component::Retain(n) => out.extend(chars.by_ref().take(*n)),
                Component::Insert(s) => out.push_str(s),
                Component::Delete(n) => {
                    chars.by_ref().take(*n).for_each(drop);
                }
            }
        }
        Ok(out)
    }

    /// Build the operation that undoes `self`, given the text `self` was applied to.
    pub fn invert(&self, original: &str) -> Result<Operation, OtError> {
        let actual = original.chars().count();
        if actual != self.base_len {
            return Err(OtError::LengthMismatch {
                expected: self.base_len,
                actual,
            });
        }

        let mut inverse = OperationBuilder::new();
        let mut chars = original.chars();
        for component in &self.components {
            match component {
                Component::Retain(n) => {
                    inverse.retain(*n);
                    chars.by_ref().take(*n).for_each(drop);
                }
                Component::Insert(s) => {
                    inverse.delete(s.chars().count());
                }
                Component::Delete(n) => {
                    let removed: String = chars.by_ref().take(*n).collect();
                    inverse.insert(&removed);
                }
            }
        }
        Ok(inverse.build())
    }

    /// Combine `self` followed by `next` into a single operation.
    pub fn compose(&self, next: &Operation) -> Result<Operation, OtError> {
        let incompatible = || OtError::IncompatibleLengths {
            first_target: self.target_len,
            second_base: next.base_len,
        };
        if self.target_len != next.base_len {
            return Err(incompatible());
        }

        let mut out = OperationBuilder::new();
        let mut first = self.components.iter().cloned();
        let mut second = next.components.iter().cloned();
        let mut a = first.next();
        let mut b = second.next();

        loop {
            match (a, b) {
                (None, None) => break,
                // Deletions of the first operation never reach the second one.
                (Some(Component::Delete(n)), rest) => {
                    out.delete(n);
                    a = first.next();
                    b = rest;
                }
                // Insertions of the second operation consume nothing from the first.
                (rest, Some(Component::Insert(s))) => {
                    out.insert(&s);
                    a = rest;
                    b = second.next();
                }
                (Some(Component::Retain(n)), Some(Component::Retain(m))) => {
                    let step = n.min(m);
                    out.retain(step);
                    a = remainder(Component::Retain(n), step).or_else(|| first.next());
                    b = remainder(Component::Retain(m), step).or_else(|| second.next());
                }
                (Some(Component::Retain(n)), Some(Component::Delete(m))) => {
                    let step = n.min(m);
                    out.delete(step);
                    a = remainder(Component::Retain(n), step).or_else(|| first.next());
                    b = remainder(Component::Delete(m), step).or_else(|| second.next());
                }
                (Some(Component::Insert(s)), Some(Component::Retain(m))) => {
                    let step = s.chars().count().min(m);
                    out.insert(&prefix(&s, step));
                    a = remainder(Component::Insert(s), step).or_else(|| first.next());
                    b = remainder(Component::Retain(m), step).or_else(|| second.next());
                }
                // Text inserted by the first and deleted by the second never existed.
                (Some(Component::Insert(s)), Some(Component::Delete(m))) => {
                    let step = s.chars().count().min(m);
                    a = remainder(Component::Insert(s), step).or_else(|| first.next());
                    b = remainder(Component::Delete(m), step).or_else(|| second.next());
                }
                (None, Some(_)) | (Some(_), None) => return Err(incompatible()),
            }
        }

        Ok(out.build())
    }
}

/// Accumulates components into a canonical [`Operation`].
#[derive(Debug, Clone, Default)]
pub struct OperationBuilder {
    components: Vec<Component>,
    base_len: usize,
    target_len: usize,
}

impl OperationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retain(&mut self, n: usize) -> &mut Self {
        if n == 0 {
            return self;
        }
        self.base_len += n;
        self.target_len += n;
        if let Some(Component::Retain(last)) = self.components.last_mut() {
            *last += n;
        } else {
            self.components.push(Component::Retain(n));
        }
        self
    }

    pub fn insert(&mut self, s: &str) -> &mut Self {
        if s.is_empty() {
            return self;
        }
        self.target_len += s.chars().count();

        // Keep inserts ahead of an adjacent delete.
        if matches!(self.components.last(), Some(Component::Delete(_))) {
            let at = self.components.len() - 1;
            if at > 0 {
                if let Component::Insert(prev) = &mut self.components[at - 1] {
                    prev.push_str(s);
                    return self;
                }
            }
            self.components.insert(at, Component::Insert(s.to_string()));
        } else if let Some(Component::Insert(last)) = self.components.last_mut() {
            last.push_str(s);
        } else {
            self.components.push(Component::Insert(s.to_string()));
        }
        self
    }

    pub fn delete(&mut self, n: usize) -> &mut Self {
        if n == 0 {
            return self;
        }
        self.base_len += n;
        if let Some(Component::Delete(last)) = self.components.last_mut() {
            *last += n;
        } else {
            self.components.push(Component::Delete(n));
        }
        self
    }

    pub fn push(&mut self, component: Component) -> &mut Self {
        match component {
            Component::Retain(n) => self.retain(n),
            Component::Insert(s) => self.insert(&s),
            Component::Delete(n) => self.delete(n),
        }
    }

    /// Finish the operation, leaving the builder empty.
    pub fn build(&mut self) -> Operation {
        let built = std::mem::take(self);
        Operation {
            components: built.components,
            base_len: built.base_len,
            target_len: built.target_len,
        }
    }
}
