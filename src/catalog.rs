//! Halo-finder catalog reader (spec's ambient A5). Spec.md scopes
//! catalog *parsing* out of the hard core but pins the on-disk format
//! precisely (§6); this gives the crate a concrete, runnable reader
//! behind the `CatalogReader` trait contract, grounded in
//! `original_source/src/IOSettings.cpp`'s `ReadHalos`/`ReadParticles`.
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;

use glam::DVec3;

use crate::error::MergerTreeError;
use crate::error::Result;
use crate::halo::Halo;
use crate::halo::HaloId;
use crate::halo::ParticleCounts;
use crate::halo::ParticleId;
use crate::halo::ParticleType;
use crate::particle_set::ParticleSet;

/// One halo record plus its particle-ownership tuples, as produced by
/// a catalog reader for a single snapshot chunk (spec §1 "out of
/// scope" contract).
pub struct CatalogRecord {
    pub halo: Halo,
    pub particles: Vec<(ParticleId, ParticleType)>,
}

pub trait CatalogReader {
    /// Reads every halo and particle-ownership record found in the
    /// chunk files named by `snapshot`/`chunk`, in file order (spec §5
    /// "insertion order as produced by the catalog reader").
    fn read_chunk(&self, snapshot_str: &str, redshift: f64, chunk: u32) -> Result<Vec<CatalogRecord>>;
}

/// File-naming convention of spec §6:
/// `{pathInput}{haloPrefix}{snapStr}.{chunk:04d}.z{z:.3f}.{suffix}`.
pub fn halo_file_name(path_input: &str, halo_prefix: &str, snap_str: &str, chunk: u32, z: f64, halo_suffix: &str) -> PathBuf {
    PathBuf::from(format!("{path_input}{halo_prefix}{snap_str}.{chunk:04}.z{z:.3}.{halo_suffix}"))
}

pub fn particle_file_name(path_input: &str, halo_prefix: &str, snap_str: &str, chunk: u32, z: f64, part_suffix: &str) -> PathBuf {
    PathBuf::from(format!("{path_input}{halo_prefix}{snap_str}.{chunk:04}.z{z:.3}.{part_suffix}"))
}

pub struct AsciiCatalogReader {
    pub path_input: String,
    pub halo_prefix: String,
    pub halo_suffix: String,
    pub part_suffix: String,
    pub n_ptypes: u8,
}

impl AsciiCatalogReader {
    /// Parses one whitespace-separated halo line, column order per
    /// spec §6: `id host-id mass particle-count per-type-counts...
    /// x y z vx vy vz rvir spin`.
    fn parse_halo_line(&self, line: &str, path: &Path, line_no: usize) -> Result<Halo> {
        let cols: Vec<&str> = line.split_whitespace().collect();
        let expected = 4 + self.n_ptypes as usize + 8;
        if cols.len() < expected {
            return Err(MergerTreeError::CatalogParse {
                path: path.to_path_buf(),
                line: line_no,
                reason: format!("expected at least {expected} columns, found {}", cols.len()),
            });
        }
        let parse = |s: &str, what: &str| -> Result<f64> {
            s.parse::<f64>().map_err(|_| MergerTreeError::CatalogParse {
                path: path.to_path_buf(),
                line: line_no,
                reason: format!("bad {what} value `{s}`"),
            })
        };
        let id = parse(cols[0], "id")? as u64;
        let host_id = parse(cols[1], "host-id")? as u64;
        let mut idx = 3;
        let mut per_type = Vec::with_capacity(self.n_ptypes as usize);
        for _ in 0..self.n_ptypes {
            per_type.push(parse(cols[idx], "per-type particle count")? as u64);
            idx += 1;
        }
        let x = parse(cols[idx], "x")?;
        let y = parse(cols[idx + 1], "y")?;
        let z = parse(cols[idx + 2], "z")?;
        let vx = parse(cols[idx + 3], "vx")?;
        let vy = parse(cols[idx + 4], "vy")?;
        let vz = parse(cols[idx + 5], "vz")?;
        let rvir = parse(cols[idx + 6], "rvir")?;
        let spin = parse(cols[idx + 7], "spin")?;
        Ok(Halo {
            id: HaloId(id),
            host_id: if host_id == 0 { None } else { Some(HaloId(host_id)) },
            position: DVec3::new(x, y, z),
            velocity: DVec3::new(vx, vy, vz),
            virial_radius: rvir,
            particle_counts: ParticleCounts(per_type),
            spin,
            high_res_mass_fraction: 1.0,
            is_token: false,
            n_orphan_steps: 0,
        })
    }

    fn read_halo_file(&self, path: &Path) -> Result<Vec<Halo>> {
        let file = std::fs::File::open(path).map_err(|_| MergerTreeError::MissingOptionalFile {
            path: path.to_path_buf(),
        })?;
        let mut halos = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|_| MergerTreeError::CatalogParse {
                path: path.to_path_buf(),
                line: line_no,
                reason: "not valid UTF-8".to_string(),
            })?;
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            match self.parse_halo_line(&line, path, line_no) {
                Ok(halo) => halos.push(halo),
                Err(e) => log::warn!("{e}"),
            }
        }
        Ok(halos)
    }

    /// Two-line header (`nParts haloId`) followed by one `particleId
    /// particleType` per line (spec §6).
    fn read_particle_file(&self, path: &Path) -> Result<std::collections::HashMap<HaloId, Vec<(ParticleId, ParticleType)>>> {
        let file = match std::fs::File::open(path) {
            Ok(f) => f,
            Err(_) => {
                log::warn!("{}", MergerTreeError::MissingOptionalFile { path: path.to_path_buf() });
                return Ok(std::collections::HashMap::new());
            }
        };
        let mut lines = BufReader::new(file).lines();
        let mut by_halo: std::collections::HashMap<HaloId, Vec<(ParticleId, ParticleType)>> = std::collections::HashMap::new();

        let _n_file_halos: usize = match lines.next() {
            Some(Ok(l)) => l.trim().parse().unwrap_or(0),
            _ => 0,
        };

        loop {
            let header = match lines.next() {
                Some(Ok(l)) => l,
                _ => break,
            };
            let mut header_cols = header.split_whitespace();
            let n_parts: usize = match header_cols.next().and_then(|s| s.parse().ok()) {
                Some(n) => n,
                None => break,
            };
            let halo_id: u64 = match header_cols.next().and_then(|s| s.parse().ok()) {
                Some(id) => id,
                None => break,
            };
            let mut owned = Vec::with_capacity(n_parts);
            for _ in 0..n_parts {
                let line = match lines.next() {
                    Some(Ok(l)) => l,
                    _ => break,
                };
                let mut cols = line.split_whitespace();
                let particle_id: u64 = match cols.next().and_then(|s| s.parse().ok()) {
                    Some(id) => id,
                    None => continue,
                };
                let particle_type: ParticleType = match cols.next().and_then(|s| s.parse().ok()) {
                    Some(t) => t,
                    None => continue,
                };
                owned.push((ParticleId(particle_id), particle_type));
            }
            by_halo.insert(HaloId(halo_id), owned);
        }
        Ok(by_halo)
    }
}

impl CatalogReader for AsciiCatalogReader {
    fn read_chunk(&self, snap_str: &str, redshift: f64, chunk: u32) -> Result<Vec<CatalogRecord>> {
        let halo_path = halo_file_name(&self.path_input, &self.halo_prefix, snap_str, chunk, redshift, &self.halo_suffix);
        let part_path = particle_file_name(&self.path_input, &self.halo_prefix, snap_str, chunk, redshift, &self.part_suffix);
        let halos = self.read_halo_file(&halo_path)?;
        let mut particles_by_halo = self.read_particle_file(&part_path)?;
        Ok(halos
            .into_iter()
            .map(|halo| {
                let particles = particles_by_halo.remove(&halo.id).unwrap_or_default();
                CatalogRecord { halo, particles }
            })
            .collect())
    }
}

/// Builds a sorted-per-type `ParticleSet` from the raw ownership
/// tuples a catalog reader returns (spec §3 "kept sorted ascending per
/// type").
pub fn particle_set_from_record(num_types: u8, record: &CatalogRecord) -> ParticleSet {
    ParticleSet::from_pairs(num_types as usize, record.particles.iter().map(|(id, t)| (*t, *id)))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn reader(dir: &Path) -> AsciiCatalogReader {
        AsciiCatalogReader {
            path_input: format!("{}/", dir.display()),
            halo_prefix: "halos_".to_string(),
            halo_suffix: "ahf".to_string(),
            part_suffix: "particles".to_string(),
            n_ptypes: 2,
        }
    }

    #[test]
    fn reads_halo_and_particle_files_and_joins_by_id() {
        let dir = std::env::temp_dir().join(format!("mergertree_catalog_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let halo_path = halo_file_name(&format!("{}/", dir.display()), "halos_", "000", 0, 0.0, "ahf");
        let part_path = particle_file_name(&format!("{}/", dir.display()), "halos_", "000", 0, 0.0, "particles");

        let mut halo_file = std::fs::File::create(&halo_path).unwrap();
        writeln!(halo_file, "# id host mass nparts t0 t1 x y z vx vy vz rvir spin").unwrap();
        writeln!(halo_file, "42 0 1.0e12 3 1 2 10.0 20.0 30.0 1.0 2.0 3.0 100.0 0.05").unwrap();

        let mut part_file = std::fs::File::create(&part_path).unwrap();
        writeln!(part_file, "1").unwrap();
        writeln!(part_file, "3 42").unwrap();
        writeln!(part_file, "1 0").unwrap();
        writeln!(part_file, "2 0").unwrap();
        writeln!(part_file, "3 1").unwrap();

        let records = reader(&dir).read_chunk("000", 0.0, 0).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].halo.id, HaloId(42));
        assert_eq!(records[0].particles.len(), 3);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn malformed_line_is_skipped_not_fatal() {
        let dir = std::env::temp_dir().join(format!("mergertree_catalog_bad_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let halo_path = halo_file_name(&format!("{}/", dir.display()), "halos_", "001", 0, 0.0, "ahf");
        let mut halo_file = std::fs::File::create(&halo_path).unwrap();
        writeln!(halo_file, "not enough columns").unwrap();
        writeln!(halo_file, "7 0 1.0e11 2 1 1 1.0 2.0 3.0 0.1 0.2 0.3 10.0 0.01").unwrap();

        let records = reader(&dir).read_chunk("001", 0.0, 0).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].halo.id, HaloId(7));

        std::fs::remove_dir_all(&dir).ok();
    }
}
