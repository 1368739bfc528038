//! Node-level operations against a directory tree.
//!
//! This module holds the operation data and its LDIF change-record form.
//! Applying an operation to a tree needs the tree contract and lives with
//! the storage backends.

use std::fmt;

use dirtree_name::Dn;

use crate::entry::Entry;
use crate::error::EntryResult;
use crate::line::write_line;
use crate::modification::Modification;

fn header(out: &mut String, dn: &Dn, changetype: &str) {
    write_line(out, "dn", dn.to_string().as_bytes());
    out.push_str("changetype: ");
    out.push_str(changetype);
    out.push('\n');
}

/// Modify the attributes of the entry at `dn`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModifyOp {
    pub dn: Dn,
    pub modifications: Vec<Modification>,
}

impl ModifyOp {
    pub fn new(dn: Dn, modifications: Vec<Modification>) -> Self {
        Self { dn, modifications }
    }

    /// Apply every modification to `entry`, in order.
    ///
    /// Stops at the first failure; earlier modifications stay applied.
    pub fn patch_entry(&self, entry: &mut Entry) -> EntryResult<()> {
        for modification in &self.modifications {
            modification.patch(entry)?;
        }
        Ok(())
    }

    /// Render as an LDIF `changetype: modify` record.
    pub fn as_ldif(&self) -> String {
        let mut out = String::new();
        header(&mut out, &self.dn, "modify");
        for modification in &self.modifications {
            out.push_str(&modification.as_ldif());
        }
        out.push('\n');
        out
    }
}

/// Add a new entry below its parent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddOp {
    pub entry: Entry,
}

impl AddOp {
    pub fn new(entry: Entry) -> Self {
        Self { entry }
    }

    /// Render as an LDIF `changetype: add` record.
    pub fn as_ldif(&self) -> String {
        let mut out = String::new();
        header(&mut out, self.entry.dn(), "add");
        out.push_str(&self.entry.attribute_lines());
        out.push('\n');
        out
    }
}

/// Delete the leaf entry at `dn`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteOp {
    pub dn: Dn,
}

impl DeleteOp {
    pub fn new(dn: Dn) -> Self {
        Self { dn }
    }

    /// Render as an LDIF `changetype: delete` record.
    pub fn as_ldif(&self) -> String {
        let mut out = String::new();
        header(&mut out, &self.dn, "delete");
        out.push('\n');
        out
    }
}

/// Any node-level operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Modify(ModifyOp),
    Add(AddOp),
    Delete(DeleteOp),
}

impl Operation {
    /// The DN of the node this operation targets.
    pub fn dn(&self) -> &Dn {
        match self {
            Self::Modify(op) => &op.dn,
            Self::Add(op) => op.entry.dn(),
            Self::Delete(op) => &op.dn,
        }
    }

    /// Render as an LDIF change record.
    pub fn as_ldif(&self) -> String {
        match self {
            Self::Modify(op) => op.as_ldif(),
            Self::Add(op) => op.as_ldif(),
            Self::Delete(op) => op.as_ldif(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_ldif())
    }
}

impl From<ModifyOp> for Operation {
    fn from(op: ModifyOp) -> Self {
        Self::Modify(op)
    }
}

impl From<AddOp> for Operation {
    fn from(op: AddOp) -> Self {
        Self::Add(op)
    }
}

impl From<DeleteOp> for Operation {
    fn from(op: DeleteOp) -> Self {
        Self::Delete(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::AttributeMap;

    fn dn(s: &str) -> Dn {
        Dn::parse(s).unwrap()
    }

    #[test]
    fn modify_record() {
        let op = ModifyOp::new(
            dn("cn=foo,dc=example,dc=com"),
            vec![Modification::add("foo", ["bar", "baz"])],
        );
        assert_eq!(
            op.as_ldif(),
            "dn: cn=foo,dc=example,dc=com\n\
             changetype: modify\n\
             add: foo\n\
             foo: bar\n\
             foo: baz\n\
             -\n\
             \n"
        );
    }

    #[test]
    fn modify_record_several_specs() {
        let op = ModifyOp::new(
            dn("cn=foo"),
            vec![
                Modification::delete_all("sn"),
                Modification::replace("mail", ["m"]),
            ],
        );
        assert_eq!(
            op.as_ldif(),
            "dn: cn=foo\nchangetype: modify\ndelete: sn\n-\nreplace: mail\nmail: m\n-\n\n"
        );
    }

    #[test]
    fn add_record() {
        let entry = Entry::with_attributes(
            dn("cn=foo,dc=example"),
            AttributeMap::from_pairs([("cn", vec!["foo"]), ("objectClass", vec!["top"])]),
        );
        assert_eq!(
            Operation::from(AddOp::new(entry)).as_ldif(),
            "dn: cn=foo,dc=example\nchangetype: add\nobjectClass: top\ncn: foo\n\n"
        );
    }

    #[test]
    fn delete_record() {
        let op = Operation::from(DeleteOp::new(dn("cn=foo,dc=example")));
        assert_eq!(op.as_ldif(), "dn: cn=foo,dc=example\nchangetype: delete\n\n");
        assert_eq!(op.dn(), &dn("cn=foo,dc=example"));
    }

    #[test]
    fn patch_entry_applies_in_order() {
        let mut entry = Entry::new(dn("cn=foo"));
        let op = ModifyOp::new(
            dn("cn=foo"),
            vec![
                Modification::add("mail", ["a", "b"]),
                Modification::delete("mail", ["a"]),
            ],
        );
        op.patch_entry(&mut entry).unwrap();
        assert!(entry.get("mail").unwrap() == ["b"]);
    }
}
