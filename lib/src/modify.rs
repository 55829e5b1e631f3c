//! Modification compilation. This is how the pending changes of an [`Entry`] are expressed as
//! the ordered series of protocol modifications that bring the server's copy in line with the
//! local one, and how that series is committed.

use std::slice;
use std::vec;

use ldap3_proto::proto::{LdapAttribute, LdapModify, LdapModifyType, LdapPartialAttribute};

use crate::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Modify {
    // These values should be added to the attribute.
    AddValues(String, Vec<Value>),
    // These values should no longer exist on the attribute.
    DeleteValues(String, Vec<Value>),
    // The attribute should hold exactly these values. May be empty.
    ReplaceValues(String, Vec<Value>),
    // This attribute should not exist.
    DeleteAttribute(String),
}

impl Modify {
    pub fn attr(&self) -> &str {
        match self {
            Modify::AddValues(a, _)
            | Modify::DeleteValues(a, _)
            | Modify::ReplaceValues(a, _)
            | Modify::DeleteAttribute(a) => a.as_str(),
        }
    }

    fn to_ldap(&self, codec: &ValueCodec) -> Result<LdapModify, OperationError> {
        let (operation, atype, vals) = match self {
            Modify::AddValues(a, vs) => (LdapModifyType::Add, a, codec.encode_all(vs)?),
            Modify::DeleteValues(a, vs) => (LdapModifyType::Delete, a, codec.encode_all(vs)?),
            Modify::ReplaceValues(a, vs) => (LdapModifyType::Replace, a, codec.encode_all(vs)?),
            Modify::DeleteAttribute(a) => (LdapModifyType::Delete, a, Vec::with_capacity(0)),
        };
        Ok(LdapModify {
            operation,
            modification: LdapPartialAttribute {
                atype: atype.clone(),
                vals,
            },
        })
    }
}

/// Which server operation a commit is sent as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    /// Create the entry.
    Add,
    /// Apply the changes to an entry the server already holds.
    Modify,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModifyList {
    // The order of this list matters. Each change must be done in order.
    mods: Vec<Modify>,
}

impl<'a> IntoIterator for &'a ModifyList {
    type IntoIter = slice::Iter<'a, Modify>;
    type Item = &'a Modify;

    fn into_iter(self) -> Self::IntoIter {
        self.mods.iter()
    }
}

impl IntoIterator for ModifyList {
    type IntoIter = vec::IntoIter<Modify>;
    type Item = Modify;

    fn into_iter(self) -> Self::IntoIter {
        self.mods.into_iter()
    }
}

impl ModifyList {
    pub fn new() -> Self {
        ModifyList {
            mods: Vec::with_capacity(0),
        }
    }

    pub fn new_list(mods: Vec<Modify>) -> Self {
        ModifyList { mods }
    }

    /// Compile every pending change of `entry`.
    ///
    /// Attributes are visited in insertion order. A fresh attribute yields its value adds and
    /// then its value deletes, a replaced attribute yields one replace, and an unchanged one
    /// yields nothing. Whole attribute deletions come last, in the order they were made.
    #[instrument(
        level = "debug",
        name = "modifylist::compile",
        skip_all,
        fields(dn = %entry.dn())
    )]
    pub fn compile(entry: &Entry) -> Self {
        let mut mods = Vec::new();

        for (name, vl) in entry.iter() {
            match vl.status() {
                ValueStatus::Fresh => {
                    if !vl.added().is_empty() {
                        mods.push(Modify::AddValues(name.to_string(), vl.added().to_vec()));
                    }
                    if !vl.removed().is_empty() {
                        mods.push(Modify::DeleteValues(name.to_string(), vl.removed().to_vec()));
                    }
                }
                ValueStatus::Replaced => {
                    mods.push(Modify::ReplaceValues(name.to_string(), vl.values().to_vec()));
                }
                ValueStatus::Unchanged => {}
            }
        }

        mods.extend(
            entry
                .deleted_attributes()
                .iter()
                .map(|name| Modify::DeleteAttribute(name.clone())),
        );

        modify_trace!(count = mods.len(), "compiled modifications");
        ModifyList { mods }
    }

    pub fn iter(&self) -> slice::Iter<'_, Modify> {
        self.mods.iter()
    }

    pub fn len(&self) -> usize {
        self.mods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }

    /// Encode as the change list of a modify request.
    pub fn to_ldap_changes(&self, codec: &ValueCodec) -> Result<Vec<LdapModify>, OperationError> {
        self.mods.iter().map(|m| m.to_ldap(codec)).collect()
    }

    /// Fold into the attribute list of an add request. The modifications are applied in order
    /// to an empty entry, and attributes left without values are omitted.
    pub fn to_ldap_attributes(
        &self,
        codec: &ValueCodec,
    ) -> Result<Vec<LdapAttribute>, OperationError> {
        let mut attrs: Vec<(&str, Vec<&Value>)> = Vec::new();

        for m in self.mods.iter() {
            let idx = match attrs.iter().position(|(a, _)| a.eq_ignore_ascii_case(m.attr())) {
                Some(idx) => idx,
                None => {
                    attrs.push((m.attr(), Vec::new()));
                    attrs.len() - 1
                }
            };
            let (_, vals) = &mut attrs[idx];

            match m {
                Modify::AddValues(_, vs) => vals.extend(vs.iter()),
                Modify::DeleteValues(_, vs) => {
                    for v in vs {
                        if let Some(pos) = vals.iter().position(|x| *x == v) {
                            vals.remove(pos);
                        }
                    }
                }
                Modify::ReplaceValues(_, vs) => *vals = vs.iter().collect(),
                Modify::DeleteAttribute(_) => vals.clear(),
            }
        }

        attrs
            .into_iter()
            .filter(|(_, vals)| !vals.is_empty())
            .map(|(atype, vals)| -> Result<LdapAttribute, OperationError> {
                let vals = vals
                    .into_iter()
                    .map(|v| codec.encode(v))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(LdapAttribute {
                    atype: atype.to_string(),
                    vals,
                })
            })
            .collect()
    }

    /// Release a list that was compiled but will not be sent.
    pub fn discard(self) {
        modify_trace!(count = self.mods.len(), "discarding modifications");
    }
}

impl Entry {
    /// Send every pending change to the server, as `kind`.
    ///
    /// The session and identity are checked before anything is compiled. On success the entry
    /// matches the server and every change record is cleared. If the server refuses, or the
    /// transport fails, the change records are left exactly as they were so the commit can be
    /// inspected and retried.
    #[instrument(
        level = "debug",
        name = "entry::commit",
        skip_all,
        fields(dn = %self.dn(), ?kind)
    )]
    pub fn commit(&mut self, kind: CommitKind) -> Result<(), OperationError> {
        let session = self.connected_session()?;
        if self.dn().is_empty() {
            return Err(OperationError::IdentityMissing);
        }

        let mods = ModifyList::compile(self);

        if kind == CommitKind::Modify && mods.is_empty() {
            modify_trace!("no pending changes");
            return Ok(());
        }

        let res = match kind {
            CommitKind::Add => session.execute_add(self.dn(), &mods),
            CommitKind::Modify => session.execute_modify(self.dn(), &mods),
        };
        mods.discard();

        res.and_then(DirectoryResult::into_result).map_err(|e| {
            request_error!(?e, "commit failed, pending changes retained");
            e
        })?;

        self.reset_changes();
        modify_info!("commit complete");
        Ok(())
    }
}
