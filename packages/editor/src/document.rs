//! # Revisioned Document
//!
//! The authoritative copy of a text plus the operations that produced it.
//!
//! ```text
//! revision:   0 ──op1──▶ 1 ──op2──▶ 2 ──op3──▶ 3
//!                         ▲
//!          client edit ───┘ (known revision 1)
//!          transformed against op2, op3, committed as revision 4
//! ```
//!
//! A Document knows nothing about clients or storage; it only turns an
//! operation written against some past revision into one that applies to the
//! current text.

use crate::EditorError;
use ftext_ot::{transform, Operation, OtError};
use std::collections::VecDeque;

/// An operation accepted into the document's history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedEdit {
    /// The operation as applied to the current text. Other clients apply it
    /// verbatim.
    pub operation: Operation,

    /// Revision reached by applying `operation`
    pub revision: u64,
}

#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    revision: u64,

    /// Committed operations, oldest first. `history[i]` moved the document
    /// from revision `history_start + i` to `history_start + i + 1`.
    history: VecDeque<Operation>,
    history_start: u64,

    /// Maximum number of retained operations (`None` = unbounded)
    history_limit: Option<usize>,
}

impl Document {
    /// Create a document at revision 0
    pub fn new(text: impl Into<String>) -> Self {
        Self::restore(text, 0)
    }

    /// Create a document that continues from an existing revision
    pub fn restore(text: impl Into<String>, revision: u64) -> Self {
        Self {
            text: text.into(),
            revision,
            history: VecDeque::new(),
            history_start: revision,
            history_limit: None,
        }
    }

    pub fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit;
        self.enforce_history_limit();
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Oldest revision a submission may still reference
    pub fn oldest_revision(&self) -> u64 {
        self.history_start
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Committed operations after `revision`, in commit order
    pub fn history_since(
        &self,
        revision: u64,
    ) -> Result<impl Iterator<Item = &Operation>, EditorError> {
        if revision > self.revision {
            return Err(EditorError::FutureRevision {
                known: revision,
                current: self.revision,
            });
        }
        if revision < self.history_start {
            return Err(EditorError::RevisionTrimmed {
                known: revision,
                oldest: self.history_start,
            });
        }
        let skip = (revision - self.history_start) as usize;
        Ok(self.history.range(skip..))
    }

    /// Integrate an operation written against `known_revision`.
    ///
    /// The operation is transformed against everything committed since
    /// `known_revision` (committed operations win insert ties), applied, and
    /// appended to history. On error nothing changes.
    pub fn apply(
        &mut self,
        operation: Operation,
        known_revision: u64,
    ) -> Result<CommittedEdit, EditorError> {
        let mut missed = self.history_since(known_revision)?.peekable();

        // The text length at `known_revision` is the base length of the first
        // missed operation, or the current length if nothing was missed.
        let text_len = match missed.peek() {
            Some(first) => first.base_len(),
            None => self.text.chars().count(),
        };
        if operation.base_len() != text_len {
            return Err(OtError::LengthMismatch {
                expected: operation.base_len(),
                actual: text_len,
            }
            .into());
        }

        let mut reconciled = operation;
        for committed in missed {
            reconciled = match transform(committed, &reconciled) {
                Ok((_, transformed)) => transformed,
                Err(e) => {
                    tracing::error!(
                        known_revision,
                        revision = self.revision,
                        error = %e,
                        "transform rejected a length-checked operation"
                    );
                    return Err(e.into());
                }
            };
        }

        let text = reconciled.apply(&self.text).map_err(|e| {
            tracing::error!(
                known_revision,
                revision = self.revision,
                error = %e,
                "reconciled operation does not fit the document"
            );
            EditorError::ApplyFailed(e)
        })?;

        self.text = text;
        self.history.push_back(reconciled.clone());
        self.revision += 1;
        self.enforce_history_limit();

        tracing::debug!(
            known_revision,
            revision = self.revision,
            "committed operation"
        );

        Ok(CommittedEdit {
            operation: reconciled,
            revision: self.revision,
        })
    }

    /// Drop history that no client at `oldest_needed` or later can reference
    pub fn trim_history(&mut self, oldest_needed: u64) {
        let target = oldest_needed.min(self.revision);
        while self.history_start < target && self.history.pop_front().is_some() {
            self.history_start += 1;
        }
    }

    fn enforce_history_limit(&mut self) {
        if let Some(limit) = self.history_limit {
            while self.history.len() > limit && self.history.pop_front().is_some() {
                self.history_start += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_at(len: usize, at: usize, s: &str) -> Operation {
        Operation::builder().retain(at).insert(s).retain(len - at).build()
    }

    #[test]
    fn test_new_document() {
        let doc = Document::new("hello");
        assert_eq!(doc.text(), "hello");
        assert_eq!(doc.revision(), 0);
        assert_eq!(doc.history_len(), 0);
    }

    #[test]
    fn test_revision_increments_per_apply() {
        let mut doc = Document::new("");
        for i in 0..5 {
            let committed = doc.apply(insert_at(i, i, "x"), i as u64).unwrap();
            assert_eq!(committed.revision, i as u64 + 1);
        }
        assert_eq!(doc.revision(), 5);
        assert_eq!(doc.history_len(), 5);
        assert_eq!(doc.text(), "xxxxx");
    }

    #[test]
    fn test_restored_revision_continues() {
        let mut doc = Document::restore("ab", 41);
        let committed = doc.apply(insert_at(2, 2, "c"), 41).unwrap();
        assert_eq!(committed.revision, 42);
        assert!(matches!(
            doc.apply(insert_at(3, 0, "z"), 40),
            Err(EditorError::RevisionTrimmed { known: 40, oldest: 41 })
        ));
    }

    #[test]
    fn test_future_revision() {
        let mut doc = Document::new("hello");
        let result = doc.apply(insert_at(5, 0, "x"), 1);
        assert!(matches!(
            result,
            Err(EditorError::FutureRevision { known: 1, current: 0 })
        ));
        assert_eq!(doc.revision(), 0);
    }

    #[test]
    fn test_length_mismatch_commits_nothing() {
        let mut doc = Document::new("hello");
        let result = doc.apply(insert_at(3, 0, "x"), 0);
        assert!(matches!(
            result,
            Err(EditorError::Operation(OtError::LengthMismatch { .. }))
        ));
        assert_eq!(doc.text(), "hello");
        assert_eq!(doc.revision(), 0);
        assert_eq!(doc.history_len(), 0);
    }

    #[test]
    fn test_stale_length_checked_against_known_revision() {
        let mut doc = Document::new("hello");
        doc.apply(insert_at(5, 5, "!"), 0).unwrap();

        // Written against "hello" (len 5), the document is now "hello!" (len 6)
        let committed = doc.apply(insert_at(5, 0, ">"), 0).unwrap();
        assert_eq!(doc.text(), ">hello!");
        assert_eq!(committed.revision, 2);

        // Against revision 0 with the current length is wrong
        assert!(doc.apply(insert_at(7, 0, "x"), 0).is_err());
    }

    #[test]
    fn test_stale_submission_reconciled() {
        let mut doc = Document::new("abc");
        doc.apply(insert_at(3, 0, "1"), 0).unwrap();
        doc.apply(
            Operation::builder().retain(2).delete(1).retain(1).build(),
            1,
        )
        .unwrap();
        assert_eq!(doc.text(), "1ac");

        // Still at revision 0: delete "c", insert at the end
        let stale = Operation::builder().retain(2).delete(1).insert("Z").build();
        let committed = doc.apply(stale, 0).unwrap();

        assert_eq!(doc.text(), "1aZ");
        assert_eq!(committed.revision, 3);
        assert_eq!(
            committed.operation,
            Operation::builder().retain(2).insert("Z").delete(1).build()
        );
    }

    #[test]
    fn test_text_is_fold_of_history() {
        let initial = "collaborate";
        let mut doc = Document::new(initial);
        doc.apply(insert_at(11, 0, "we "), 0).unwrap();
        doc.apply(insert_at(11, 11, "!"), 0).unwrap();
        doc.apply(
            Operation::builder().retain(3).delete(2).retain(9).build(),
            1,
        )
        .unwrap();

        let folded = doc
            .history_since(0)
            .unwrap()
            .try_fold(initial.to_string(), |text, op| op.apply(&text))
            .unwrap();
        assert_eq!(folded, doc.text());
    }

    #[test]
    fn test_history_limit() {
        let mut doc = Document::new("").with_history_limit(Some(2));
        for i in 0..4 {
            doc.apply(insert_at(i, 0, "x"), i as u64).unwrap();
        }
        assert_eq!(doc.history_len(), 2);
        assert_eq!(doc.oldest_revision(), 2);
        assert!(doc.apply(insert_at(1, 0, "y"), 1).is_err());
        assert!(doc.apply(insert_at(2, 0, "y"), 2).is_ok());
    }

    #[test]
    fn test_trim_history() {
        let mut doc = Document::new("");
        for i in 0..4 {
            doc.apply(insert_at(i, 0, "x"), i as u64).unwrap();
        }
        doc.trim_history(3);
        assert_eq!(doc.oldest_revision(), 3);
        assert_eq!(doc.history_len(), 1);

        // Trimming never goes past the current revision
        doc.trim_history(100);
        assert_eq!(doc.oldest_revision(), 4);
        assert_eq!(doc.history_len(), 0);
    }
}
