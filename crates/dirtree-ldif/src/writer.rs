//! LDIF serialization.
//!
//! Lines are never folded. Values that cannot be written as plain text are
//! base64 encoded (see [`dirtree_entry::line`]).

use std::io::{self, Write};

use dirtree_entry::{Entry, Operation};

/// The header that opens a multi-record document.
pub const VERSION_HEADER: &str = "version: 1\n\n";

/// Streaming LDIF writer.
///
/// The version header is written before the first record.
pub struct LdifWriter<W: Write> {
    inner: W,
    header_written: bool,
}

impl<W: Write> LdifWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            header_written: false,
        }
    }

    /// Write one content record.
    pub fn write_entry(&mut self, entry: &Entry) -> io::Result<()> {
        self.write_record(&entry.to_ldif())
    }

    /// Write one change record.
    pub fn write_change(&mut self, op: &Operation) -> io::Result<()> {
        self.write_record(&op.as_ldif())
    }

    fn write_record(&mut self, record: &str) -> io::Result<()> {
        if !self.header_written {
            self.inner.write_all(VERSION_HEADER.as_bytes())?;
            self.header_written = true;
        }
        self.inner.write_all(record.as_bytes())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Render `entries` as one document.
pub fn write_entries<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> String {
    let mut out = String::from(VERSION_HEADER);
    for entry in entries {
        out.push_str(&entry.to_ldif());
    }
    out
}

/// Render `ops` as one change document.
pub fn write_changes<'a>(ops: impl IntoIterator<Item = &'a Operation>) -> String {
    let mut out = String::from(VERSION_HEADER);
    for op in ops {
        out.push_str(&op.as_ldif());
    }
    out
}
