//! Entries are the local image of one directory object. An [`Entry`] is a map from attribute
//! name to an [`AttributeValueList`], plus the entry's distinguished name. A pseudo example:
//!
//! ```text
//! Entry {
//!   dn: "cn=alice,ou=People,dc=example,dc=com",
//!   "cn": ["alice"],
//!   "mail": ["alice@example.com", "a.smith@example.com"],
//! };
//! ```
//!
//! There are four rules for entries:
//! * Attribute names are compared ignoring ASCII case. The spelling used when a name was first
//!   inserted is kept and used on the wire.
//! * Attributes iterate in the order they were inserted.
//! * Removing an attribute remembers its name so that the deletion can be sent to the server.
//!   Setting the attribute again cancels that pending deletion.
//! * The reserved key `dn` addresses the distinguished name, never an attribute.
//!
//! Entries perform no I/O until they are committed through a bound
//! [`DirectorySession`](crate::session::DirectorySession).

use std::str::FromStr;
use std::sync::{Arc, Weak};

use hashbrown::HashMap;

use crate::prelude::*;

/// The right hand side of [`Entry::set`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttrInput {
    /// Remove the attribute.
    Absent,
    /// A single string. The only form accepted for the reserved `dn` key.
    Text(String),
    Integer(i64),
    Boolean(bool),
    Scalar(Value),
    Sequence(Vec<Value>),
    List(AttributeValueList),
}

impl From<Value> for AttrInput {
    fn from(v: Value) -> Self {
        AttrInput::Scalar(v)
    }
}

impl From<&str> for AttrInput {
    fn from(s: &str) -> Self {
        AttrInput::Text(s.to_string())
    }
}

impl From<String> for AttrInput {
    fn from(s: String) -> Self {
        AttrInput::Text(s)
    }
}

impl From<i64> for AttrInput {
    fn from(i: i64) -> Self {
        AttrInput::Integer(i)
    }
}

impl From<bool> for AttrInput {
    fn from(b: bool) -> Self {
        AttrInput::Boolean(b)
    }
}

impl From<Vec<Value>> for AttrInput {
    fn from(vs: Vec<Value>) -> Self {
        AttrInput::Sequence(vs)
    }
}

impl From<Vec<&str>> for AttrInput {
    fn from(vs: Vec<&str>) -> Self {
        AttrInput::Sequence(vs.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<String>> for AttrInput {
    fn from(vs: Vec<String>) -> Self {
        AttrInput::Sequence(vs.into_iter().map(Value::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for AttrInput {
    fn from(vs: [&str; N]) -> Self {
        AttrInput::Sequence(vs.into_iter().map(Value::from).collect())
    }
}

impl From<AttributeValueList> for AttrInput {
    fn from(vl: AttributeValueList) -> Self {
        AttrInput::List(vl)
    }
}

impl<T: Into<AttrInput>> From<Option<T>> for AttrInput {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(AttrInput::Absent)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Entry {
    dn: Dn,
    // Insertion order, spelled as first inserted. Always the same names as the keys of values.
    attributes: Vec<String>,
    values: HashMap<String, AttributeValueList>,
    // Removed locally, pending deletion on the server. Never overlaps attributes.
    deleted: Vec<String>,
    session: Option<Weak<dyn DirectorySession>>,
}

impl Entry {
    pub fn new(dn: &str) -> Result<Self, OperationError> {
        Ok(Entry {
            dn: Dn::from_str(dn)?,
            ..Default::default()
        })
    }

    pub fn with_session(
        dn: &str,
        session: &Arc<dyn DirectorySession>,
    ) -> Result<Self, OperationError> {
        let mut e = Self::new(dn)?;
        e.set_session(session);
        Ok(e)
    }

    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    /// Validate and assign a new distinguished name. On error the current name is kept.
    pub fn set_dn(&mut self, dn: &str) -> Result<(), OperationError> {
        self.dn = Dn::from_str(dn)?;
        Ok(())
    }

    pub(crate) fn replace_dn(&mut self, dn: Dn) {
        self.dn = dn;
    }

    /// Bind this entry to a session. Only a weak reference is kept, the caller owns the session.
    pub fn set_session(&mut self, session: &Arc<dyn DirectorySession>) {
        self.session = Some(Arc::downgrade(session));
    }

    pub fn session(&self) -> Option<Arc<dyn DirectorySession>> {
        self.session.as_ref().and_then(Weak::upgrade)
    }

    /// The bound session, if it is still alive and connected.
    pub(crate) fn connected_session(&self) -> Result<Arc<dyn DirectorySession>, OperationError> {
        let session = self.session().ok_or(OperationError::SessionUnbound)?;
        if !session.is_connected() {
            return Err(OperationError::SessionNotConnected);
        }
        Ok(session)
    }

    /// The stored spelling of `key`, if the entry holds it in any case.
    fn canonical_key(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|k| k.eq_ignore_ascii_case(key))
            .map(|k| k.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.canonical_key(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValueList> {
        self.canonical_key(key).and_then(|k| self.values.get(k))
    }

    /// As [`Entry::get`], failing with [`OperationError::KeyNotFound`] for an absent name.
    pub fn try_get(&self, key: &str) -> Result<&AttributeValueList, OperationError> {
        self.get(key)
            .ok_or_else(|| OperationError::KeyNotFound(key.to_string()))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut AttributeValueList> {
        let k = self.canonical_key(key)?.to_string();
        self.values.get_mut(&k)
    }

    /// Set, replace or (with [`AttrInput::Absent`]) remove an attribute.
    ///
    /// A name the entry does not yet hold becomes [`ValueStatus::Fresh`] and every one of its
    /// values is a pending add. Setting a name the entry already holds makes it
    /// [`ValueStatus::Replaced`], so the full value set overwrites the server's copy. Either way
    /// a pending deletion of the same name is cancelled.
    pub fn set<V: Into<AttrInput>>(&mut self, key: &str, value: V) -> Result<(), OperationError> {
        let value = value.into();

        if key.eq_ignore_ascii_case(ATTR_DN) {
            return match value {
                AttrInput::Text(dn) | AttrInput::Scalar(Value::Text(dn)) => self.set_dn(&dn),
                AttrInput::Absent => Err(OperationError::TypeMismatch(
                    "Cannot delete the distinguished name.".to_string(),
                )),
                _ => Err(OperationError::TypeMismatch(
                    "Distinguished name must be string type.".to_string(),
                )),
            };
        }

        if key.is_empty() {
            return Err(OperationError::TypeMismatch(
                "Attribute name must not be empty.".to_string(),
            ));
        }

        let mut list = match value {
            AttrInput::Absent => return self.remove_attribute(key),
            AttrInput::Text(s) => AttributeValueList::from_values(vec![Value::from(s)]),
            AttrInput::Integer(i) => AttributeValueList::from_values(vec![Value::from(i)]),
            AttrInput::Boolean(b) => AttributeValueList::from_values(vec![Value::from(b)]),
            AttrInput::Scalar(v) => AttributeValueList::from_values(vec![v]),
            AttrInput::Sequence(vs) => AttributeValueList::from_values(vs),
            AttrInput::List(vl) => vl,
        };

        let canonical = match self.canonical_key(key) {
            Some(existing) => {
                list.mark_replaced();
                existing.to_string()
            }
            None => {
                list.mark_fresh();
                self.attributes.push(key.to_string());
                key.to_string()
            }
        };

        self.deleted.retain(|d| !d.eq_ignore_ascii_case(&canonical));
        self.values.insert(canonical, list);
        Ok(())
    }

    /// Remove an attribute, queueing its deletion on the server.
    pub fn delete(&mut self, key: &str) -> Result<(), OperationError> {
        self.set(key, AttrInput::Absent)
    }

    fn remove_attribute(&mut self, key: &str) -> Result<(), OperationError> {
        let canonical = self
            .canonical_key(key)
            .map(str::to_string)
            .ok_or_else(|| OperationError::KeyNotFound(key.to_string()))?;

        self.values.remove(&canonical);
        self.attributes.retain(|k| k != &canonical);
        if !self.deleted.iter().any(|d| d.eq_ignore_ascii_case(&canonical)) {
            self.deleted.push(canonical);
        }
        Ok(())
    }

    /// Apply `set` for each pair in order. Stops at the first failure; pairs applied before it
    /// stay applied.
    pub fn update<I, K, V>(&mut self, pairs: I) -> Result<(), OperationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<AttrInput>,
    {
        pairs
            .into_iter()
            .try_for_each(|(k, v)| self.set(k.as_ref(), v))
    }

    /// Insert without change tracking. Used when building an entry from what the server holds.
    pub(crate) fn insert_unchanged(&mut self, name: &str, values: Vec<Value>) {
        let existing = self.canonical_key(name).map(str::to_string);
        match existing {
            // The server sent the same attribute twice. Keep a single list.
            Some(k) => {
                if let Some(list) = self.values.get_mut(&k) {
                    let mut merged = list.values().to_vec();
                    merged.extend(values);
                    *list = AttributeValueList::from_values(merged);
                }
            }
            None => {
                self.attributes.push(name.to_string());
                self.values
                    .insert(name.to_string(), AttributeValueList::from_values(values));
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValueList)> {
        self.attributes
            .iter()
            .filter_map(|k| self.values.get(k).map(|vl| (k.as_str(), vl)))
    }

    pub(crate) fn iter_mut_values(&mut self) -> impl Iterator<Item = &mut AttributeValueList> {
        self.values.values_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|k| k.as_str())
    }

    /// Attribute names in insertion order.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Names removed locally whose deletion has not yet been committed.
    pub fn deleted_attributes(&self) -> &[String] {
        &self.deleted
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub(crate) fn clear_deleted(&mut self) {
        self.deleted.clear();
    }

    /// Abandon every pending change. The entry then claims to match the server.
    pub fn reset_changes(&mut self) {
        self.iter_mut_values().for_each(|vl| vl.reset());
        self.clear_deleted();
    }

    /// Create this entry on the server from its pending changes.
    pub fn add(&mut self) -> Result<(), OperationError> {
        self.commit(CommitKind::Add)
    }

    /// Send this entry's pending changes to the server.
    pub fn modify(&mut self) -> Result<(), OperationError> {
        self.commit(CommitKind::Modify)
    }

    /// Delete this entry from the server.
    ///
    /// The local attributes are kept, but become pending adds: the entry now describes an object
    /// the server does not hold, and a later [`Entry::add`] would recreate it.
    #[instrument(level = "debug", skip_all, fields(dn = %self.dn))]
    pub fn delete_entry(&mut self) -> Result<(), OperationError> {
        let session = self.connected_session()?;
        if self.dn.is_empty() {
            return Err(OperationError::IdentityMissing);
        }

        session.execute_delete(&self.dn)?.into_result().map_err(|e| {
            request_error!(?e, "delete refused by server");
            e
        })?;

        self.iter_mut_values().for_each(|vl| vl.mark_fresh());
        self.clear_deleted();
        request_info!("entry deleted");
        Ok(())
    }

    /// Rename (and possibly move) this entry on the server. The new name is validated before
    /// the server is contacted and only assigned once the server accepts it.
    #[instrument(level = "debug", skip_all, fields(dn = %self.dn, new_dn = %new_dn))]
    pub fn rename(&mut self, new_dn: &str) -> Result<(), OperationError> {
        let session = self.connected_session()?;
        if self.dn.is_empty() {
            return Err(OperationError::IdentityMissing);
        }

        let new_dn = Dn::from_str(new_dn)?;
        let new_rdn = new_dn.rdn(0).ok_or_else(|| {
            OperationError::InvalidDistinguishedName(
                "cannot rename an entry to the empty name".to_string(),
            )
        })?;
        let new_superior = new_dn.ancestors();

        session
            .execute_rename(&self.dn, new_rdn, &new_superior)?
            .into_result()
            .map_err(|e| {
                request_error!(?e, "rename refused by server");
                e
            })?;

        self.replace_dn(new_dn);
        request_info!("entry renamed");
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Entry {
    type Item = (&'a str, &'a AttributeValueList);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a AttributeValueList)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
