//! Raw client payload to [`ResultSet`].
//!
//! Values pass through untouched: no coercion, no null normalisation, no
//! reordering.

use crate::engine::RawResults;
use crate::model::{ExecutionId, ResultSet};
use tracing::warn;

/// Whether the first fetched row is a header echo to be dropped.
///
/// Only the caller knows the statement type, so this is never guessed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeaderPolicy {
    #[default]
    Keep,
    Skip,
}

pub(crate) fn assemble(
    execution_id: &ExecutionId,
    raw: RawResults,
    header: HeaderPolicy,
) -> ResultSet {
    let RawResults { columns, mut rows } = raw;

    if header == HeaderPolicy::Skip && !rows.is_empty() {
        rows.remove(0);
    }

    let width = columns.len();
    let ragged = rows.iter().filter(|r| r.len() != width).count();
    if ragged > 0 {
        warn!(
            %execution_id,
            columns = width,
            ragged_rows = ragged,
            "rows do not match the column count"
        );
    }

    ResultSet { columns, rows }
}
