//! Runtime configuration (spec §6 "Runtime configuration"), adapted
//! from the teacher's `parameter_plugin`: a YAML document is read from
//! disk, then a list of command-line `key/sub:value` overrides is
//! applied to the raw `serde_yaml::Value` tree before the whole thing
//! is deserialized into one flat struct. The teacher splits this across
//! one struct per plugin; spec §6 lists a single flat option set, so we
//! keep one `RuntimeConfig` rather than reintroducing per-plugin
//! sectioning the spec never asked for.
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use serde_yaml::Value;

use crate::config::DEFAULT_NUM_PARTICLE_TYPES;
use crate::error::MergerTreeError;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DomainMode {
    Zoom,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompareMode {
    CmpMap,
    DirectIntersect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Compute,
    ReadPrecomputed,
    Hybrid,
}

fn default_run_mode() -> RunMode {
    RunMode::Compute
}

fn default_num_particle_types() -> u8 {
    DEFAULT_NUM_PARTICLE_TYPES
}

fn default_ghost_width() -> usize {
    2
}

fn default_max_orphan_steps() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    pub n_grid: usize,
    pub box_size: f64,
    #[serde(default = "default_num_particle_types")]
    pub n_ptypes: u8,
    pub n_chunks_per_file: usize,
    pub min_part_halo: u64,
    pub min_part_cmp: u64,
    pub d_max_factor: f64,
    pub domain_mode: DomainMode,
    pub compare_mode: CompareMode,
    #[serde(default = "default_run_mode")]
    pub run_mode: RunMode,
    #[serde(default = "default_ghost_width")]
    pub ghost_width: usize,
    #[serde(default = "default_max_orphan_steps")]
    pub max_orphan_steps: u32,
    pub path_input: String,
    #[serde(default)]
    pub halo_prefix: String,
    #[serde(default)]
    pub halo_suffix: String,
    #[serde(default)]
    pub part_suffix: String,
}

impl RuntimeConfig {
    pub fn from_yaml_str(contents: &str, overrides: &[Override]) -> Result<Self> {
        let mut value: Value = serde_yaml::from_str(contents).map_err(|e| MergerTreeError::InvariantViolation {
            detail: format!("malformed parameter file: {e}"),
        })?;
        for o in overrides {
            apply_override(&mut value, o)?;
        }
        serde_yaml::from_value(value).map_err(|e| MergerTreeError::InvariantViolation {
            detail: format!("parameter file does not match RuntimeConfig: {e}"),
        })
    }

    pub fn from_file(path: &Path, overrides: &[Override]) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|_| MergerTreeError::MissingRequiredCatalog {
            path: path.to_path_buf(),
        })?;
        Self::from_yaml_str(&contents, overrides)
    }
}

/// One `--set key/sub:value` command-line override (spec §6, teacher's
/// `Override`/`key/keys:value` grammar, flattened since `RuntimeConfig`
/// has no plugin sections).
#[derive(Debug, Clone)]
pub struct Override {
    pub path: Vec<String>,
    pub value: Value,
}

#[derive(Debug)]
pub struct ParseOverrideError(String);

impl fmt::Display for ParseOverrideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ParseOverrideError {}

impl FromStr for Override {
    type Err = ParseOverrideError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let split: Vec<_> = s.splitn(2, ':').collect();
        if split.len() != 2 {
            return Err(ParseOverrideError(format!("expected key and value separated by `:`, found `{s}`")));
        }
        let path: Vec<String> = split[0].split('/').map(str::to_owned).collect();
        let value = serde_yaml::from_str(split[1])
            .map_err(|e| ParseOverrideError(format!("bad value for `{}`: {e}", split[0])))?;
        Ok(Override { path, value })
    }
}

fn apply_override(root: &mut Value, o: &Override) -> Result<()> {
    let mut current = root;
    for key in &o.path[..o.path.len().saturating_sub(1)] {
        current = current
            .as_mapping_mut()
            .and_then(|m| m.get_mut(key.as_str()))
            .ok_or_else(|| MergerTreeError::InvariantViolation {
                detail: format!("override key `{key}` not found"),
            })?;
    }
    let last = o.path.last().ok_or_else(|| MergerTreeError::InvariantViolation {
        detail: "empty override path".to_string(),
    })?;
    match current.as_mapping_mut() {
        Some(mapping) => {
            mapping.insert(Value::String(last.clone()), o.value.clone());
            Ok(())
        }
        None => Err(MergerTreeError::InvariantViolation {
            detail: format!("cannot set `{last}` on a non-mapping value"),
        }),
    }
}
