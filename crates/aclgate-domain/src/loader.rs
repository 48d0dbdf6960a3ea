//! Bulk parsing of externally authored tuple lists.

use tracing::warn;

use crate::model::Tuple;

/// Result of parsing a batch of tuple strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBatch {
    /// Tuples that matched the grammar, in input order.
    pub tuples: Vec<Tuple>,
    /// Raw strings that were rejected.
    pub rejected: Vec<String>,
}

impl ParsedBatch {
    pub fn accepted(&self) -> usize {
        self.tuples.len()
    }

    pub fn dropped(&self) -> usize {
        self.rejected.len()
    }
}

/// Parses every string in `relationships`, skipping the malformed ones.
///
/// A malformed entry never aborts the batch; it is logged and reported in
/// [`ParsedBatch::rejected`].
pub fn parse_relationships<I, S>(relationships: I) -> ParsedBatch
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut batch = ParsedBatch::default();
    for raw in relationships {
        let raw = raw.as_ref();
        match raw.parse::<Tuple>() {
            Ok(tuple) => batch.tuples.push(tuple),
            Err(e) => {
                warn!(relationship = raw, error = %e, "skipping malformed relationship");
                batch.rejected.push(raw.to_string());
            }
        }
    }
    batch
}
