use std::fmt;
use std::path::PathBuf;

/// Errors raised by the merger-tree engine, ordered here from most to
/// least recoverable (see spec §7: missing optional file < parse error
/// < invariant violation < communication/missing-catalog failure).
#[derive(Debug)]
pub enum MergerTreeError {
    /// A ghost-only file was missing. The caller should log a warning
    /// and continue with an empty buffer; this variant exists so the
    /// catalog layer can report the condition without panicking.
    MissingOptionalFile { path: PathBuf },
    /// A single malformed catalog record. Carries enough context to
    /// print a useful warning; the offending line is skipped.
    CatalogParse {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    /// An invariant the engine relies on was violated for a single
    /// edge or halo (e.g. both sides of a comparison were buffer
    /// references). The offending edge is skipped, the step continues.
    InvariantViolation { detail: String },
    /// A required catalog file could not be found or read.
    MissingRequiredCatalog { path: PathBuf },
    /// An MPI call failed. Fatal for the step that triggered it.
    Communication { detail: String },
}

impl MergerTreeError {
    /// Whether this error is fatal for the whole run (spec §7: only
    /// communication failures and missing required catalogs abort).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MergerTreeError::MissingRequiredCatalog { .. }
                | MergerTreeError::Communication { .. }
        )
    }
}

impl fmt::Display for MergerTreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergerTreeError::MissingOptionalFile { path } => {
                write!(f, "optional file missing, continuing with empty buffer: {:?}", path)
            }
            MergerTreeError::CatalogParse { path, line, reason } => {
                write!(f, "{:?}:{}: malformed catalog record: {}", path, line, reason)
            }
            MergerTreeError::InvariantViolation { detail } => {
                write!(f, "invariant violation, dropping edge: {}", detail)
            }
            MergerTreeError::MissingRequiredCatalog { path } => {
                write!(f, "required catalog missing: {:?}", path)
            }
            MergerTreeError::Communication { detail } => {
                write!(f, "communication failure: {}", detail)
            }
        }
    }
}

impl std::error::Error for MergerTreeError {}

pub type Result<T> = std::result::Result<T, MergerTreeError>;
