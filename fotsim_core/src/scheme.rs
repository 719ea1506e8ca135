//! Connection-scheme validation.
//!
//! The drag-and-drop assembly itself lives in the UI; this module only judges
//! the assembled element sequence against the reference order.

use crate::error::SchemeError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElementKind {
    Tester,
    Component,
    Connector,
}

/// One element placed on the bench.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionElement {
    pub kind: ElementKind,
    pub id: String,
    pub label: Option<String>,
}

/// The student's assembly plus the reference order it must match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionScheme {
    pub sequence: Vec<ConnectionElement>,
    pub correct_sequence: Vec<String>,
}

impl ConnectionScheme {
    /// Positional comparison against the reference order. Length mismatch and
    /// a wrong element are distinct errors; positions are 1-indexed for
    /// display.
    pub fn validate(&self) -> Result<(), SchemeError> {
        if self.sequence.len() != self.correct_sequence.len() {
            return Err(SchemeError::LengthMismatch {
                expected: self.correct_sequence.len(),
                actual: self.sequence.len(),
            });
        }
        for (i, (element, correct_id)) in self
            .sequence
            .iter()
            .zip(self.correct_sequence.iter())
            .enumerate()
        {
            if element.id != *correct_id {
                return Err(SchemeError::ElementMismatch { position: i + 1 });
            }
        }
        Ok(())
    }
}
