//! Error types for the LDIF codec.

use dirtree_name::NameError;
use thiserror::Error;

/// Errors produced while parsing LDIF.
///
/// Every syntax error carries the 1-based physical line number where it was
/// detected. For folded lines this is the line the logical line starts on.
#[derive(Debug, Error)]
pub enum LdifError {
    #[error("line {line}: no ':' separator")]
    LineWithoutSeparator { line: usize },

    #[error("line {line}: record starts with {key:?} instead of dn")]
    EntryStartsWithNonDn { line: usize, key: String },

    #[error("line {line}: dn value is not valid UTF-8")]
    DnNotUtf8 { line: usize },

    #[error("line {line}: record starts with a continuation line")]
    EntryStartsWithLeadingSpace { line: usize },

    #[error("line {line}: version {value:?} is not a number")]
    VersionNotNumeric { line: usize, value: String },

    #[error("line {line}: unsupported LDIF version {version}")]
    UnsupportedVersion { line: usize, version: u64 },

    #[error("line {line}: input ends inside a record")]
    TruncatedStream { line: usize },

    #[error("line {line}: URL values are not supported")]
    UrlValuesUnsupported { line: usize },

    #[error("line {line}: invalid base64 value: {source}")]
    InvalidBase64 {
        line: usize,
        #[source]
        source: base64::DecodeError,
    },

    #[error("line {line}: expected a changetype line")]
    MissingChangetype { line: usize },

    #[error("line {line}: unsupported changetype {changetype:?}")]
    UnsupportedChangetype { line: usize, changetype: String },

    #[error("line {line}: add record has no attributes")]
    AddMissingAttributes { line: usize },

    #[error("line {line}: delete record must end after the changetype line")]
    DeleteHasTrailingData { line: usize },

    #[error("line {line}: unknown modification {spec:?}")]
    UnknownModSpec { line: usize, spec: String },

    #[error("line {line}: value for {found:?} inside modification of {expected:?}")]
    ModSpecAttributeMismatch {
        line: usize,
        expected: String,
        found: String,
    },

    #[error("line {line}: modification not terminated by '-'")]
    ModSpecMissingEndDash { line: usize },

    #[error(transparent)]
    Name(#[from] NameError),
}

impl LdifError {
    /// The line the error was detected on, if it is a syntax error.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::LineWithoutSeparator { line }
            | Self::EntryStartsWithNonDn { line, .. }
            | Self::DnNotUtf8 { line }
            | Self::EntryStartsWithLeadingSpace { line }
            | Self::VersionNotNumeric { line, .. }
            | Self::UnsupportedVersion { line, .. }
            | Self::TruncatedStream { line }
            | Self::UrlValuesUnsupported { line }
            | Self::InvalidBase64 { line, .. }
            | Self::MissingChangetype { line }
            | Self::UnsupportedChangetype { line, .. }
            | Self::AddMissingAttributes { line }
            | Self::DeleteHasTrailingData { line }
            | Self::UnknownModSpec { line, .. }
            | Self::ModSpecAttributeMismatch { line, .. }
            | Self::ModSpecMissingEndDash { line } => Some(*line),
            Self::Name(_) => None,
        }
    }
}

/// Convenience alias for LDIF operations.
pub type LdifResult<T> = Result<T, LdifError>;
