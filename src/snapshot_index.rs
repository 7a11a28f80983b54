//! Snapshot numbering and redshift metadata (spec's ambient A6),
//! replacing the three external shell helpers of spec §6 (`FindCatID`,
//! `FindCatZ`, the catalog-count script in
//! `original_source/src/IOSettings.cpp`) with a plain table the crate
//! consumes directly.
use crate::error::MergerTreeError;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotEntry {
    pub number: u32,
    pub redshift: f64,
    pub scale_factor: f64,
}

pub trait SnapshotIndex {
    /// Ordered oldest (highest redshift) to newest (lowest redshift),
    /// matching the driver's iteration order (spec §4.8: "highest-z to
    /// lowest-z").
    fn snapshots(&self) -> &[SnapshotEntry];

    fn snapshot_string(&self, entry: &SnapshotEntry) -> String {
        format!("{:03}", entry.number)
    }
}

/// Reads a whitespace-separated `snapshot redshift` table, one row per
/// line, computing `scale_factor = 1 / (1 + redshift)` (the same
/// relation `IOSettings::FindCatZ` uses).
pub struct TableSnapshotIndex {
    entries: Vec<SnapshotEntry>,
}

impl TableSnapshotIndex {
    pub fn from_table_str(contents: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut cols = line.split_whitespace();
            let number: u32 = cols
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| MergerTreeError::CatalogParse {
                    path: "snapshot-index".into(),
                    line: line_no,
                    reason: "missing snapshot number".to_string(),
                })?;
            let redshift: f64 = cols
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| MergerTreeError::CatalogParse {
                    path: "snapshot-index".into(),
                    line: line_no,
                    reason: "missing redshift".to_string(),
                })?;
            entries.push(SnapshotEntry {
                number,
                redshift,
                scale_factor: 1.0 / (1.0 + redshift),
            });
        }
        entries.sort_by(|a, b| b.redshift.partial_cmp(&a.redshift).unwrap());
        Ok(Self { entries })
    }
}

impl SnapshotIndex for TableSnapshotIndex {
    fn snapshots(&self) -> &[SnapshotEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_highest_redshift_first() {
        let index = TableSnapshotIndex::from_table_str("2 0.5\n0 2.0\n1 1.0\n").unwrap();
        let nums: Vec<_> = index.snapshots().iter().map(|e| e.number).collect();
        assert_eq!(nums, vec![0, 1, 2]);
    }

    #[test]
    fn scale_factor_matches_redshift_relation() {
        let index = TableSnapshotIndex::from_table_str("0 1.0\n").unwrap();
        assert!((index.snapshots()[0].scale_factor - 0.5).abs() < 1e-12);
    }

    #[test]
    fn snapshot_string_is_zero_padded_three_digits() {
        let index = TableSnapshotIndex::from_table_str("7 0.0\n").unwrap();
        assert_eq!(index.snapshot_string(&index.snapshots()[0]), "007");
    }
}
