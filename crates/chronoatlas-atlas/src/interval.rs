//! First-match lookup over time-bounded records.
//!
//! Epoch lists are short (a handful of records per entity) so every lookup
//! is a linear scan in input order. When records overlap, the first
//! matching record wins; that tie-break is deterministic and never an
//! error.

use chronoatlas_types::TimeBoundedRecord;

/// Return the first record whose interval contains `year`.
///
/// Returns `None` when no record covers the year. Callers decide on any
/// fallback.
pub fn resolve<T>(records: &[TimeBoundedRecord<T>], year: i32) -> Option<&TimeBoundedRecord<T>> {
    records.iter().find(|r| r.contains(year))
}

/// Return every record whose interval contains `year`, in input order.
///
/// More than one result means the dataset has overlapping intervals.
pub fn resolve_all<T>(records: &[TimeBoundedRecord<T>], year: i32) -> Vec<&TimeBoundedRecord<T>> {
    records.iter().filter(|r| r.contains(year)).collect()
}

/// Distance in years from `year` to the record's interval.
///
/// Zero inside the interval, otherwise the gap to the nearer bound.
pub fn distance_to<T>(record: &TimeBoundedRecord<T>, year: i32) -> u64 {
    let year = i64::from(year);
    let start = i64::from(record.start_year);
    let end = i64::from(record.end_year);
    if year < start {
        start.saturating_sub(year).unsigned_abs()
    } else if year > end {
        year.saturating_sub(end).unsigned_abs()
    } else {
        0
    }
}

/// Return the record chronologically nearest to `year`.
///
/// An exact match has distance zero and always wins. Among records at the
/// same distance the first in input order is chosen.
pub fn nearest<T>(records: &[TimeBoundedRecord<T>], year: i32) -> Option<&TimeBoundedRecord<T>> {
    records.iter().fold(None, |best: Option<(&TimeBoundedRecord<T>, u64)>, r| {
        let d = distance_to(r, year);
        match best {
            Some((_, best_d)) if best_d <= d => best,
            _ => Some((r, d)),
        }
    })
    .map(|(r, _)| r)
}
