//! Incremental LDIF parser.
//!
//! Input is fed in arbitrary chunks; complete records are returned as soon
//! as their terminating blank line has been seen. Physical lines are first
//! joined into logical lines (a line starting with one space continues the
//! previous one), then run through a per-record state machine.

use std::mem;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use dirtree_entry::{
    AddOp, AttributeMap, AttributeSet, DeleteOp, Entry, ModifyOp, Modification, Operation, Value,
};
use dirtree_name::Dn;
use tracing::debug;

use crate::error::{LdifError, LdifResult};

/// One parsed LDIF record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LdifRecord {
    /// A content record.
    Entry(Entry),
    /// A change record.
    Change(Operation),
}

/// Which record grammar the parser accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Content records: `dn:` followed by attribute lines.
    Entries,
    /// Change records: `dn:`, `changetype:` and a body.
    Changes,
}

/// A logical line and the physical line it starts on.
struct Line {
    number: usize,
    bytes: Vec<u8>,
}

#[derive(Clone, Copy)]
enum SpecKind {
    Add,
    Delete,
    Replace,
}

struct ModSpec {
    kind: SpecKind,
    set: AttributeSet,
}

impl ModSpec {
    fn into_modification(self) -> Modification {
        match self.kind {
            SpecKind::Add => Modification::Add(self.set),
            SpecKind::Delete => Modification::Delete(self.set),
            SpecKind::Replace => Modification::Replace(self.set),
        }
    }
}

enum State {
    /// Between records.
    Idle,
    Entry {
        dn: Dn,
        attributes: AttributeMap,
    },
    Changetype {
        dn: Dn,
    },
    Add {
        dn: Dn,
        attributes: AttributeMap,
    },
    Delete {
        dn: Dn,
    },
    Modify {
        dn: Dn,
        modifications: Vec<Modification>,
        spec: Option<ModSpec>,
    },
}

/// Incremental LDIF parser.
///
/// A parser that has returned an error is left in an unspecified state and
/// should be dropped.
///
/// ```
/// use dirtree_ldif::{LdifParser, LdifRecord};
///
/// let mut parser = LdifParser::entries();
/// assert!(parser.feed(b"dn: cn=foo\ncn: f").unwrap().is_empty());
/// let records = parser.feed(b"oo\n\n").unwrap();
/// assert_eq!(records.len(), 1);
/// assert!(matches!(&records[0], LdifRecord::Entry(e) if e.contains("cn")));
/// assert!(parser.finish().unwrap().is_empty());
/// ```
pub struct LdifParser {
    mode: Mode,
    buffer: Vec<u8>,
    line: usize,
    started: bool,
    pending: Option<Line>,
    state: State,
    records: Vec<LdifRecord>,
}

impl LdifParser {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            buffer: Vec::new(),
            line: 0,
            started: false,
            pending: None,
            state: State::Idle,
            records: Vec::new(),
        }
    }

    /// A parser for content records.
    pub fn entries() -> Self {
        Self::new(Mode::Entries)
    }

    /// A parser for change records.
    pub fn changes() -> Self {
        Self::new(Mode::Changes)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Consume `bytes` and return every record completed so far.
    pub fn feed(&mut self, bytes: &[u8]) -> LdifResult<Vec<LdifRecord>> {
        self.buffer.extend_from_slice(bytes);
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let physical = strip_cr(&self.buffer[start..end]).to_vec();
            start = end + 1;
            self.physical_line(physical)?;
        }
        self.buffer.drain(..start);
        Ok(mem::take(&mut self.records))
    }

    /// Signal end of input.
    ///
    /// Returns any record still pending, or `TruncatedStream` when the input
    /// stopped inside a record.
    pub fn finish(mut self) -> LdifResult<Vec<LdifRecord>> {
        if !self.buffer.is_empty() {
            let rest = mem::take(&mut self.buffer);
            self.physical_line(strip_cr(&rest).to_vec())?;
        }
        if let Some(pending) = self.pending.take() {
            self.logical_line(pending)?;
        }
        if !matches!(self.state, State::Idle) {
            return Err(LdifError::TruncatedStream { line: self.line });
        }
        Ok(self.records)
    }

    fn physical_line(&mut self, bytes: Vec<u8>) -> LdifResult<()> {
        self.line += 1;
        let number = self.line;

        if let Some(rest) = bytes.strip_prefix(b" ") {
            return match self.pending.as_mut() {
                Some(pending) => {
                    pending.bytes.extend_from_slice(rest);
                    Ok(())
                }
                None => Err(LdifError::EntryStartsWithLeadingSpace { line: number }),
            };
        }

        if let Some(pending) = self.pending.take() {
            self.logical_line(pending)?;
        }
        if bytes.is_empty() {
            self.end_record(number)
        } else {
            self.pending = Some(Line { number, bytes });
            Ok(())
        }
    }

    fn logical_line(&mut self, line: Line) -> LdifResult<()> {
        if line.bytes.first() == Some(&b'#') {
            return Ok(());
        }
        let first = !self.started;
        self.started = true;

        self.state = match mem::replace(&mut self.state, State::Idle) {
            State::Idle => {
                let (name, value) = split(&line)?;
                if first && name.eq_ignore_ascii_case("version") {
                    check_version(&line, &value)?;
                    State::Idle
                } else if !name.eq_ignore_ascii_case("dn") {
                    return Err(LdifError::EntryStartsWithNonDn {
                        line: line.number,
                        key: name,
                    });
                } else {
                    let text = value.as_str().ok_or(LdifError::DnNotUtf8 { line: line.number })?;
                    let dn = Dn::parse(text)?;
                    match self.mode {
                        Mode::Entries => State::Entry {
                            dn,
                            attributes: AttributeMap::new(),
                        },
                        Mode::Changes => State::Changetype { dn },
                    }
                }
            }
            State::Entry { dn, mut attributes } => {
                let (name, value) = split(&line)?;
                attributes.add_values(&name, [value]);
                State::Entry { dn, attributes }
            }
            State::Changetype { dn } => {
                let (name, value) = split(&line)?;
                if !name.eq_ignore_ascii_case("changetype") {
                    return Err(LdifError::MissingChangetype { line: line.number });
                }
                let changetype = value.to_string_lossy();
                match changetype.trim().to_ascii_lowercase().as_str() {
                    "add" => State::Add {
                        dn,
                        attributes: AttributeMap::new(),
                    },
                    "delete" => State::Delete { dn },
                    "modify" => State::Modify {
                        dn,
                        modifications: Vec::new(),
                        spec: None,
                    },
                    _ => {
                        return Err(LdifError::UnsupportedChangetype {
                            line: line.number,
                            changetype,
                        })
                    }
                }
            }
            State::Add { dn, mut attributes } => {
                let (name, value) = split(&line)?;
                attributes.add_values(&name, [value]);
                State::Add { dn, attributes }
            }
            State::Delete { .. } => {
                return Err(LdifError::DeleteHasTrailingData { line: line.number });
            }
            State::Modify {
                dn,
                modifications,
                spec: None,
            } => {
                if is_dash(&line.bytes) {
                    return Err(LdifError::UnknownModSpec {
                        line: line.number,
                        spec: "-".into(),
                    });
                }
                let (name, value) = split(&line)?;
                let kind = match name.to_ascii_lowercase().as_str() {
                    "add" => SpecKind::Add,
                    "delete" => SpecKind::Delete,
                    "replace" => SpecKind::Replace,
                    _ => {
                        return Err(LdifError::UnknownModSpec {
                            line: line.number,
                            spec: name,
                        })
                    }
                };
                let attribute = value.to_string_lossy().trim().to_string();
                let spec = ModSpec {
                    kind,
                    set: AttributeSet::new(attribute),
                };
                State::Modify {
                    dn,
                    modifications,
                    spec: Some(spec),
                }
            }
            State::Modify {
                dn,
                mut modifications,
                spec: Some(mut spec),
            } => {
                if is_dash(&line.bytes) {
                    modifications.push(spec.into_modification());
                    State::Modify {
                        dn,
                        modifications,
                        spec: None,
                    }
                } else {
                    let (name, value) = split(&line)?;
                    if name != spec.set.key() {
                        return Err(LdifError::ModSpecAttributeMismatch {
                            line: line.number,
                            expected: spec.set.key().to_string(),
                            found: name,
                        });
                    }
                    spec.set.insert(value);
                    State::Modify {
                        dn,
                        modifications,
                        spec: Some(spec),
                    }
                }
            }
        };
        Ok(())
    }

    fn end_record(&mut self, number: usize) -> LdifResult<()> {
        let record = match mem::replace(&mut self.state, State::Idle) {
            State::Idle => return Ok(()),
            State::Entry { dn, attributes } => {
                LdifRecord::Entry(Entry::with_attributes(dn, attributes))
            }
            State::Changetype { .. } => {
                return Err(LdifError::MissingChangetype { line: number });
            }
            State::Add { dn, attributes } => {
                if attributes.is_empty() {
                    return Err(LdifError::AddMissingAttributes { line: number });
                }
                LdifRecord::Change(AddOp::new(Entry::with_attributes(dn, attributes)).into())
            }
            State::Delete { dn } => LdifRecord::Change(DeleteOp::new(dn).into()),
            State::Modify { spec: Some(_), .. } => {
                return Err(LdifError::ModSpecMissingEndDash { line: number });
            }
            State::Modify {
                dn,
                modifications,
                spec: None,
            } => LdifRecord::Change(ModifyOp::new(dn, modifications).into()),
        };
        debug!(line = number, "ldif record complete");
        self.records.push(record);
        Ok(())
    }
}

fn strip_cr(bytes: &[u8]) -> &[u8] {
    bytes.strip_suffix(b"\r").unwrap_or(bytes)
}

fn is_dash(bytes: &[u8]) -> bool {
    let mut trimmed = bytes;
    while let Some(rest) = trimmed.strip_suffix(b" ") {
        trimmed = rest;
    }
    trimmed == b"-"
}

fn trim_spaces(mut bytes: &[u8]) -> &[u8] {
    while let Some(rest) = bytes.strip_prefix(b" ") {
        bytes = rest;
    }
    bytes
}

/// Split a logical line into attribute name and decoded value.
fn split(line: &Line) -> LdifResult<(String, Value)> {
    let Some(colon) = line.bytes.iter().position(|&b| b == b':') else {
        return Err(LdifError::LineWithoutSeparator { line: line.number });
    };
    let name = String::from_utf8_lossy(&line.bytes[..colon]).trim().to_string();
    let rest = &line.bytes[colon + 1..];
    let value = match rest.first() {
        Some(b':') => {
            let encoded: Vec<u8> = rest[1..]
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            STANDARD
                .decode(encoded)
                .map_err(|source| LdifError::InvalidBase64 {
                    line: line.number,
                    source,
                })?
        }
        Some(b'<') => return Err(LdifError::UrlValuesUnsupported { line: line.number }),
        _ => trim_spaces(rest).to_vec(),
    };
    Ok((name, Value::new(value)))
}

fn check_version(line: &Line, value: &Value) -> LdifResult<()> {
    let text = value.to_string_lossy();
    let version: u64 = text.trim().parse().map_err(|_| LdifError::VersionNotNumeric {
        line: line.number,
        value: text.clone(),
    })?;
    if version != 1 {
        return Err(LdifError::UnsupportedVersion {
            line: line.number,
            version,
        });
    }
    Ok(())
}

/// Parse a complete document of content records.
pub fn parse_entries(text: &str) -> LdifResult<Vec<Entry>> {
    let mut parser = LdifParser::entries();
    let mut records = parser.feed(text.as_bytes())?;
    records.extend(parser.finish()?);
    Ok(records
        .into_iter()
        .filter_map(|record| match record {
            LdifRecord::Entry(entry) => Some(entry),
            LdifRecord::Change(_) => None,
        })
        .collect())
}

/// Parse a complete document of change records.
pub fn parse_changes(text: &str) -> LdifResult<Vec<Operation>> {
    let mut parser = LdifParser::changes();
    let mut records = parser.feed(text.as_bytes())?;
    records.extend(parser.finish()?);
    Ok(records
        .into_iter()
        .filter_map(|record| match record {
            LdifRecord::Change(op) => Some(op),
            LdifRecord::Entry(_) => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dn(s: &str) -> Dn {
        Dn::parse(s).unwrap()
    }

    fn one_entry(text: &str) -> Entry {
        let mut entries = parse_entries(text).unwrap();
        assert_eq!(entries.len(), 1);
        entries.remove(0)
    }

    // -----------------------------------------------------------------------
    // Content records
    // -----------------------------------------------------------------------

    #[test]
    fn parse_single_entry() {
        let e = one_entry("dn: cn=foo,dc=example\nobjectClass: person\ncn: foo\ncn: bar\n\n");
        assert_eq!(e.dn(), &dn("cn=foo,dc=example"));
        assert!(e.get("cn").unwrap() == ["bar", "foo"]);
        assert!(e.get("objectclass").unwrap() == ["person"]);
    }

    #[test]
    fn parse_version_and_several_entries() {
        let entries = parse_entries(
            "version: 1\n\ndn: dc=example\ndc: example\n\ndn: cn=a,dc=example\ncn: a\n\n",
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].dn(), &dn("cn=a,dc=example"));
    }

    #[test]
    fn version_may_precede_dn_directly() {
        let e = one_entry("version: 1\ndn: cn=foo\ncn: foo\n\n");
        assert_eq!(e.dn(), &dn("cn=foo"));
    }

    #[test]
    fn folded_line_joins() {
        let e = one_entry(
            "dn: cn=foo\n\
             description: Babs is a big sailing fan, and travels extensively in sea\n \
             rch of perfect sailing conditions.\n\n",
        );
        assert!(
            e.get("description").unwrap()
                == ["Babs is a big sailing fan, and travels extensively in search of perfect sailing conditions."]
        );
    }

    #[test]
    fn folded_dn_and_base64() {
        let e = one_entry("dn: cn=fo\n o,dc=ex\n ample\ncn:: IGxlYWRpbmc=\n\n");
        assert_eq!(e.dn(), &dn("cn=foo,dc=example"));
        assert!(e.get("cn").unwrap() == [" leading"]);
    }

    #[test]
    fn base64_dn() {
        let e = one_entry("dn:: Y249Zm9v\n\n");
        assert_eq!(e.dn(), &dn("cn=foo"));
        assert!(e.attributes().is_empty());
    }

    #[test]
    fn comments_and_their_continuations_are_ignored() {
        let e = one_entry(
            "# leading comment\n\
             dn: cn=foo\n\
             # inside\n \
             still the comment\n\
             cn: foo\n\n\
             # trailing\n",
        );
        assert_eq!(e.attributes().len(), 1);
    }

    #[test]
    fn crlf_line_endings() {
        let e = one_entry("dn: cn=foo\r\ncn: foo\r\n\r\n");
        assert!(e.get("cn").unwrap() == ["foo"]);
    }

    #[test]
    fn extra_blank_lines_between_records() {
        let entries = parse_entries("\n\ndn: cn=a\n\n\n\ndn: cn=b\n\n").unwrap();
        assert_eq!(entries.len(), 2);
    }

    // -----------------------------------------------------------------------
    // Incremental feeding
    // -----------------------------------------------------------------------

    #[test]
    fn feed_byte_by_byte() {
        let text = b"version: 1\n\ndn: cn=a\ncn: a\n long\n\ndn: cn=b\ncn:: Yg==\n\n";
        let mut parser = LdifParser::entries();
        let mut records = Vec::new();
        for b in text.iter() {
            records.extend(parser.feed(std::slice::from_ref(b)).unwrap());
        }
        records.extend(parser.finish().unwrap());
        assert_eq!(records.len(), 2);
        match &records[0] {
            LdifRecord::Entry(e) => assert!(e.get("cn").unwrap() == ["along"]),
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn records_are_returned_as_they_complete() {
        let mut parser = LdifParser::entries();
        assert_eq!(parser.feed(b"dn: cn=a\n\ndn: cn=b\n").unwrap().len(), 1);
        assert_eq!(parser.feed(b"\n").unwrap().len(), 1);
        assert!(parser.finish().unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Change records
    // -----------------------------------------------------------------------

    #[test]
    fn parse_change_records() {
        let ops = parse_changes(
            "version: 1\n\n\
             dn: cn=new,dc=example\nchangetype: add\nobjectClass: top\ncn: new\n\n\
             dn: cn=old,dc=example\nchangetype: delete\n\n\
             dn: cn=foo,dc=example\nchangetype: modify\n\
             add: mail\nmail: a@x\nmail: b@x\n-\n\
             delete: sn\n-\n\
             replace: description\ndescription: d\n-\n\n",
        )
        .unwrap();
        assert_eq!(ops.len(), 3);
        match &ops[0] {
            Operation::Add(op) => assert!(op.entry.get("cn").unwrap() == ["new"]),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(ops[1], Operation::Delete(DeleteOp::new(dn("cn=old,dc=example"))));
        assert_eq!(
            ops[2],
            Operation::Modify(ModifyOp::new(
                dn("cn=foo,dc=example"),
                vec![
                    Modification::add("mail", ["a@x", "b@x"]),
                    Modification::delete_all("sn"),
                    Modification::replace("description", ["d"]),
                ]
            ))
        );
    }

    #[test]
    fn modify_record_round_trip() {
        let op = Operation::Modify(ModifyOp::new(
            dn("cn=foo,dc=example,dc=com"),
            vec![
                Modification::add("foo", ["bar", "baz"]),
                Modification::delete("sn", [" spaced"]),
            ],
        ));
        assert_eq!(parse_changes(&op.as_ldif()).unwrap(), vec![op]);
    }

    #[test]
    fn empty_modify_record() {
        let ops = parse_changes("dn: cn=foo\nchangetype: modify\n\n").unwrap();
        assert_eq!(ops, vec![Operation::Modify(ModifyOp::new(dn("cn=foo"), vec![]))]);
    }

    #[test]
    fn mod_spec_attribute_must_match_exactly() {
        assert!(matches!(
            parse_changes("dn: cn=foo\nchangetype: modify\nadd: Mail\nmail: x\n-\n\n"),
            Err(LdifError::ModSpecAttributeMismatch { line: 4, .. })
        ));
        let ops = parse_changes("dn: cn=foo\nchangetype: modify\nadd: Mail\nMail: x\n-\n\n").unwrap();
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn base64_dn_must_be_utf8() {
        assert!(matches!(
            entries_err("dn:: /w==\ncn: a\n\n"),
            LdifError::DnNotUtf8 { line: 1 }
        ));
        assert!(matches!(
            changes_err("dn:: /w==\nchangetype: delete\n\n"),
            LdifError::DnNotUtf8 { line: 1 }
        ));
        let entries = parse_entries("dn:: Y249Zm9v\ncn: foo\n\n").unwrap();
        assert_eq!(*entries[0].dn(), dn("cn=foo"));
    }

    // -----------------------------------------------------------------------
    // Errors
    // -----------------------------------------------------------------------

    fn entries_err(text: &str) -> LdifError {
        parse_entries(text).unwrap_err()
    }

    fn changes_err(text: &str) -> LdifError {
        parse_changes(text).unwrap_err()
    }

    #[test]
    fn content_errors() {
        assert!(matches!(
            entries_err("dn: cn=a\nnocolon\n\n"),
            LdifError::LineWithoutSeparator { line: 2 }
        ));
        assert!(matches!(
            entries_err("cn: a\n\n"),
            LdifError::EntryStartsWithNonDn { line: 1, .. }
        ));
        assert!(matches!(
            entries_err(" dn: cn=a\n\n"),
            LdifError::EntryStartsWithLeadingSpace { line: 1 }
        ));
        assert!(matches!(
            entries_err("version: one\n\n"),
            LdifError::VersionNotNumeric { line: 1, .. }
        ));
        assert!(matches!(
            entries_err("version: 2\n\n"),
            LdifError::UnsupportedVersion { line: 1, version: 2 }
        ));
        assert!(matches!(
            entries_err("dn: cn=a\ncn: a\n"),
            LdifError::TruncatedStream { .. }
        ));
        assert!(matches!(
            entries_err("dn: cn=a\njpegPhoto:< file:///tmp/x\n\n"),
            LdifError::UrlValuesUnsupported { line: 2 }
        ));
        assert!(matches!(
            entries_err("dn: cn=a\ncn:: !!!\n\n"),
            LdifError::InvalidBase64 { line: 2, .. }
        ));
        assert!(matches!(entries_err("dn: =bad\n\n"), LdifError::Name(_)));
    }

    #[test]
    fn version_only_allowed_first() {
        assert!(matches!(
            entries_err("dn: cn=a\n\nversion: 1\n\n"),
            LdifError::EntryStartsWithNonDn { line: 3, .. }
        ));
    }

    #[test]
    fn truncated_without_trailing_newline() {
        assert!(matches!(
            entries_err("dn: cn=a\ncn: a"),
            LdifError::TruncatedStream { line: 2 }
        ));
    }

    #[test]
    fn change_errors() {
        assert!(matches!(
            changes_err("dn: cn=a\ncn: a\n\n"),
            LdifError::MissingChangetype { line: 2 }
        ));
        assert!(matches!(
            changes_err("dn: cn=a\n\n"),
            LdifError::MissingChangetype { line: 2 }
        ));
        assert!(matches!(
            changes_err("dn: cn=a\nchangetype: modrdn\n\n"),
            LdifError::UnsupportedChangetype { line: 2, .. }
        ));
        assert!(matches!(
            changes_err("dn: cn=a\nchangetype: moddn\n\n"),
            LdifError::UnsupportedChangetype { .. }
        ));
        assert!(matches!(
            changes_err("dn: cn=a\nchangetype: add\n\n"),
            LdifError::AddMissingAttributes { line: 3 }
        ));
        assert!(matches!(
            changes_err("dn: cn=a\nchangetype: delete\ncn: a\n\n"),
            LdifError::DeleteHasTrailingData { line: 3 }
        ));
        assert!(matches!(
            changes_err("dn: cn=a\nchangetype: modify\nincrement: uid\n-\n\n"),
            LdifError::UnknownModSpec { line: 3, .. }
        ));
        assert!(matches!(
            changes_err("dn: cn=a\nchangetype: modify\nadd: mail\ncn: x\n-\n\n"),
            LdifError::ModSpecAttributeMismatch { line: 4, .. }
        ));
        assert!(matches!(
            changes_err("dn: cn=a\nchangetype: modify\nadd: mail\nmail: x\n\n"),
            LdifError::ModSpecMissingEndDash { line: 5 }
        ));
        assert!(matches!(
            changes_err("dn: cn=a\nchangetype: modify\nadd: mail\n"),
            LdifError::TruncatedStream { .. }
        ));
    }

    #[test]
    fn error_reports_line_number() {
        let err = entries_err("dn: cn=a\ncn: a\n\ndn: cn=b\nbroken\n\n");
        assert_eq!(err.line(), Some(5));
        assert!(err.to_string().starts_with("line 5:"));
    }
}
