//! The variable-reference table.
//!
//! A reference is a 1-based index into an ordered table keyed by a synthetic
//! path (`"1.scope.0"`, `"1.scope.0.player"`, `"eval.cmpPosition"`).
//! Allocating an existing path updates it in place, so expanding the same
//! path twice within one pause yields the same reference.

use crate::native::ObjectId;
use indexmap::IndexMap;

/// What a reference expands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefTarget {
    /// A lexical environment of the frame, counted outwards from the innermost.
    Scope {
        /// Distance from the innermost environment.
        depth: usize,
    },
    /// The own properties of an object.
    Object(ObjectId),
}

/// One entry of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableReference {
    /// The names to expand, in display order.
    pub values: Vec<String>,
    /// Where the names are looked up.
    pub target: RefTarget,
    /// The 1-based protocol id of the frame the reference was created in.
    pub frame_id: i64,
}

/// The table of references handed out during the current pause.
#[derive(Debug, Default)]
pub struct VariableReferences {
    table: IndexMap<String, VariableReference>,
}

impl VariableReferences {
    /// Creates or updates the reference at `path` and returns its 1-based index.
    pub fn create_or_update(&mut self, path: String, reference: VariableReference) -> i64 {
        let (index, _) = self.table.insert_full(path, reference);
        index as i64 + 1
    }

    /// Looks up a 1-based reference. Zero and out-of-range references are `None`.
    pub fn get(&self, reference: i64) -> Option<(&str, &VariableReference)> {
        let index = usize::try_from(reference.checked_sub(1)?).ok()?;
        self.table
            .get_index(index)
            .map(|(path, reference)| (path.as_str(), reference))
    }

    /// Drops every reference.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// The number of references.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if no reference is allocated.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
