//! Canonical LR(1) automaton and ACTION/GOTO table generation.

pub mod first_sets;
pub mod grammar;
pub mod item;
pub mod lr1;
pub mod syntax;
pub mod table;
pub mod types;
pub mod util;

use crate::{
    grammar::Grammar,
    lr1::CanonicalCollection,
    table::{ParseTable, TableError},
};

/// Compute the canonical LR(1) parse table from the specified grammar.
pub fn compute(g: &Grammar) -> Result<ParseTable, TableError> {
    let collection = CanonicalCollection::generate(g);
    ParseTable::generate(&collection)
}
