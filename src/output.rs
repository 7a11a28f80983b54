//! Persisted tree output (spec §1: retained, not part of the hard
//! core; record layout per spec §6 "Persisted state layout").
use std::io::Write;

use crate::halo::HaloId;
use crate::tree_cleaner::CleanEdge;

/// `{descendantId, [progenitorId, nCommonPerType...]+}`, one record
/// per descendant halo with at least one clean edge.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRecord {
    pub descendant_id: HaloId,
    pub progenitors: Vec<(HaloId, Vec<u64>)>,
}

pub fn records_from_edges(edges: &[CleanEdge]) -> Vec<TreeRecord> {
    let mut by_descendant: linked_hash_map::LinkedHashMap<HaloId, Vec<(HaloId, Vec<u64>)>> = linked_hash_map::LinkedHashMap::new();
    for edge in edges {
        by_descendant
            .entry(edge.descendant_id)
            .or_insert_with(Vec::new)
            .push((edge.progenitor_id, edge.n_common_per_type.clone()));
    }
    by_descendant
        .into_iter()
        .map(|(descendant_id, progenitors)| TreeRecord { descendant_id, progenitors })
        .collect()
}

/// Writes one line per record: `descendantId progId:c0,c1,... progId:c0,c1,...`.
pub fn write_step<W: Write>(mut writer: W, records: &[TreeRecord]) -> std::io::Result<()> {
    for record in records {
        write!(writer, "{}", record.descendant_id.0)?;
        for (prog_id, counts) in &record.progenitors {
            let counts_str = counts.iter().map(u64::to_string).collect::<Vec<_>>().join(",");
            write!(writer, " {}:{}", prog_id.0, counts_str)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Parses a step file written by `write_step`, for `runMode=1`
/// round-trip re-ingestion (spec §8 "Round-trip").
pub fn read_step(contents: &str) -> Vec<TreeRecord> {
    contents
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let mut cols = line.split_whitespace();
            let descendant_id = HaloId(cols.next().unwrap().parse().unwrap());
            let progenitors = cols
                .map(|col| {
                    let (id, counts) = col.split_once(':').unwrap();
                    let counts = counts.split(',').map(|c| c.parse().unwrap()).collect();
                    (HaloId(id.parse().unwrap()), counts)
                })
                .collect();
            TreeRecord { descendant_id, progenitors }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_edge_set() {
        let records = vec![TreeRecord {
            descendant_id: HaloId(3),
            progenitors: vec![(HaloId(1), vec![5, 0]), (HaloId(2), vec![5, 1])],
        }];
        let mut buf = Vec::new();
        write_step(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(read_step(&text), records);
    }
}
