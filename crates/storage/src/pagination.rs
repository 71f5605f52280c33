//! Keyset pagination shared by every list operation.
//!
//! Listings over users, roles, and tags all run the same two-phase
//! algorithm instead of a raw `OFFSET`/`LIMIT` scan:
//!
//! 1. **Probe** - sort the (already filtered) rows, skip `offset` of them,
//!    and read only the sort-key value and primary key of the next row.
//!    If there is no such row the page is empty and the second phase is
//!    skipped entirely.
//! 2. **Fetch** - treat the probed pair as a cursor and select rows at or
//!    past it, ordered the same way, limited to the page size. For an
//!    ascending sort on column `C` with primary key `K` the cursor
//!    predicate is `C > cursor.C OR (C = cursor.C AND K >= cursor.K)`;
//!    descending flips every comparison.
//!
//! The primary key is always the secondary sort key, in the same direction
//! as the business column. That makes the order total, so pages never skip
//! or duplicate a row even when the business column holds duplicate values.
//!
//! The functions here are generic over the row type and the sort-key
//! accessor; each entity store instantiates them once per supported sort
//! order rather than duplicating the windowing logic.
//!
//! # Examples
//!
//! ```
//! use tessera_storage::pagination::{self, PageRequest, SortDirection};
//!
//! let rows = [(1i64, "b"), (2, "a"), (3, "a")];
//! let refs: Vec<&(i64, &str)> = rows.iter().collect();
//!
//! let page = pagination::list_page(
//!     &refs,
//!     |row| row.1,
//!     |row| row.0,
//!     SortDirection::Ascending,
//!     PageRequest::new(0, 2),
//! );
//!
//! // "a" ties break on the primary key.
//! assert_eq!(page, vec![&(2, "a"), &(3, "a")]);
//! ```

use std::cmp::Ordering;

/// Row predicate applied before pagination.
///
/// The same filter must be supplied to both phases of a listing, otherwise
/// the probed cursor and the fetched page would disagree about which rows
/// exist. Stores guarantee this by filtering the snapshot once and running
/// both phases over it.
pub type RowFilter<T> = std::sync::Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Direction of a sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Smallest sort-key value first.
    Ascending,
    /// Largest sort-key value first.
    Descending,
}

/// Page bounds for a listing request.
///
/// `offset` keeps the caller-facing offset semantics; internally only the
/// probe phase pays for the skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Number of rows to skip before the page starts.
    pub offset: u64,

    /// Maximum number of rows in the page.
    pub limit: usize,
}

impl PageRequest {
    /// Creates a new page request.
    #[must_use]
    pub fn new(offset: u64, limit: usize) -> Self {
        Self { offset, limit }
    }
}

/// Cursor produced by the probe phase: the sort-key value and primary key
/// of the first row of the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor<C> {
    /// Sort-key value of the first row of the page.
    pub sort_key: C,

    /// Primary key of the first row of the page.
    pub id: i64,
}

/// Compares two `(sort key, primary key)` pairs under a direction.
///
/// The primary key breaks ties in the same direction as the sort key, so
/// the resulting order is total.
fn compare_keys<C: Ord>(direction: SortDirection, a: (&C, i64), b: (&C, i64)) -> Ordering {
    let ordering = a.0.cmp(b.0).then_with(|| a.1.cmp(&b.1));
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

/// Whether a row lies at or past the cursor in the given direction.
///
/// This is the fetch-phase predicate: ascending admits
/// `C > cursor.C OR (C = cursor.C AND K >= cursor.K)`, descending flips
/// every comparison.
#[must_use]
pub fn cursor_admits<C: Ord>(
    direction: SortDirection,
    cursor: &Cursor<C>,
    sort_key: &C,
    id: i64,
) -> bool {
    match direction {
        SortDirection::Ascending => {
            *sort_key > cursor.sort_key || (*sort_key == cursor.sort_key && id >= cursor.id)
        }
        SortDirection::Descending => {
            *sort_key < cursor.sort_key || (*sort_key == cursor.sort_key && id <= cursor.id)
        }
    }
}

/// Probe phase: locate the first row of the page.
///
/// Sorts only `(sort key, primary key)` pairs, skips `offset` of them, and
/// returns the next pair as a [`Cursor`]. Returns `None` when the offset
/// lies past the end of the data, in which case the page is empty and the
/// fetch phase must be skipped.
///
/// `rows` must already have any filter predicate applied; the fetch phase
/// is expected to run over the same filtered snapshot.
#[must_use]
pub fn probe<T, C, SK, PK>(
    rows: &[T],
    sort_key: SK,
    primary_key: PK,
    direction: SortDirection,
    offset: u64,
) -> Option<Cursor<C>>
where
    C: Ord,
    SK: Fn(&T) -> C,
    PK: Fn(&T) -> i64,
{
    let mut keys: Vec<(C, i64)> = rows.iter().map(|row| (sort_key(row), primary_key(row))).collect();
    keys.sort_unstable_by(|a, b| compare_keys(direction, (&a.0, a.1), (&b.0, b.1)));

    let offset = usize::try_from(offset).ok()?;
    keys.into_iter().nth(offset).map(|(sort_key, id)| Cursor { sort_key, id })
}

/// Fetch phase: select the page starting at `cursor`.
///
/// Admits rows satisfying [`cursor_admits`], orders them the same way the
/// probe did, and returns the first `limit` of them.
#[must_use]
pub fn fetch<T, C, SK, PK>(
    rows: &[T],
    sort_key: SK,
    primary_key: PK,
    direction: SortDirection,
    cursor: &Cursor<C>,
    limit: usize,
) -> Vec<T>
where
    T: Copy,
    C: Ord,
    SK: Fn(&T) -> C,
    PK: Fn(&T) -> i64,
{
    let mut admitted: Vec<(C, i64, T)> = rows
        .iter()
        .map(|row| (sort_key(row), primary_key(row), *row))
        .filter(|(key, id, _)| cursor_admits(direction, cursor, key, *id))
        .collect();
    admitted.sort_unstable_by(|a, b| compare_keys(direction, (&a.0, a.1), (&b.0, b.1)));

    admitted.into_iter().take(limit).map(|(_, _, row)| row).collect()
}

/// Runs both phases over a filtered snapshot and returns one page.
///
/// Equivalent to sorting `rows` by `(sort key, primary key)` in `direction`
/// and slicing `[offset, offset + limit)`.
#[must_use]
pub fn list_page<T, C, SK, PK>(
    rows: &[T],
    sort_key: SK,
    primary_key: PK,
    direction: SortDirection,
    page: PageRequest,
) -> Vec<T>
where
    T: Copy,
    C: Ord,
    SK: Fn(&T) -> C,
    PK: Fn(&T) -> i64,
{
    let Some(cursor) = probe(rows, &sort_key, &primary_key, direction, page.offset) else {
        return Vec::new();
    };
    fetch(rows, &sort_key, &primary_key, direction, &cursor, page.limit)
}
