//! The ordered value container for one attribute, and the change state that drives which
//! modification the attribute compiles to.

use std::slice;

use crate::prelude::*;

/// How an attribute differs from the copy the server holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueStatus {
    /// Matches the server, nothing to send.
    #[default]
    Unchanged,
    /// Introduced or edited in place. Changes are sent as incremental value adds and deletes.
    Fresh,
    /// The whole value set overwrites the server's copy.
    Replaced,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeValueList {
    current: Vec<Value>,
    status: ValueStatus,
    // Only meaningful while Fresh.
    added: Vec<Value>,
    removed: Vec<Value>,
}

impl AttributeValueList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an unchanged list, as it would be read from the server.
    pub fn from_values(values: Vec<Value>) -> Self {
        AttributeValueList {
            current: values,
            status: ValueStatus::Unchanged,
            added: Vec::with_capacity(0),
            removed: Vec::with_capacity(0),
        }
    }

    pub fn status(&self) -> ValueStatus {
        self.status
    }

    pub fn values(&self) -> &[Value] {
        &self.current
    }

    pub fn added(&self) -> &[Value] {
        &self.added
    }

    pub fn removed(&self) -> &[Value] {
        &self.removed
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.current.contains(value)
    }

    pub fn iter(&self) -> slice::Iter<'_, Value> {
        self.current.iter()
    }

    // Editing a list the server already holds starts incremental tracking.
    fn begin_edit(&mut self) {
        if self.status == ValueStatus::Unchanged {
            self.status = ValueStatus::Fresh;
        }
    }

    pub fn append<V: Into<Value>>(&mut self, value: V) {
        let value = value.into();
        self.begin_edit();
        if self.status == ValueStatus::Fresh {
            self.added.push(value.clone());
        }
        self.current.push(value);
    }

    pub fn extend<I, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        values.into_iter().for_each(|v| self.append(v))
    }

    /// Remove the first value equal to `value`, returning it.
    pub fn remove(&mut self, value: &Value) -> Result<Value, OperationError> {
        let idx = self
            .current
            .iter()
            .position(|v| v == value)
            .ok_or_else(|| OperationError::ValueNotFound(value.to_string()))?;

        self.begin_edit();
        let value = self.current.remove(idx);
        if self.status == ValueStatus::Fresh {
            self.removed.push(value.clone());
        }
        Ok(value)
    }

    /// Forget all pending changes; the list now matches the server.
    pub fn reset(&mut self) {
        self.status = ValueStatus::Unchanged;
        self.added.clear();
        self.removed.clear();
    }

    /// The attribute is new to the entry: every current value is a pending add.
    pub(crate) fn mark_fresh(&mut self) {
        self.status = ValueStatus::Fresh;
        self.added = self.current.clone();
        self.removed.clear();
    }

    pub(crate) fn mark_replaced(&mut self) {
        self.status = ValueStatus::Replaced;
        self.added.clear();
        self.removed.clear();
    }
}

impl<'a> IntoIterator for &'a AttributeValueList {
    type IntoIter = slice::Iter<'a, Value>;
    type Item = &'a Value;

    fn into_iter(self) -> Self::IntoIter {
        self.current.iter()
    }
}

impl<V: Into<Value>> FromIterator<V> for AttributeValueList {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from_values(iter.into_iter().map(Into::into).collect())
    }
}
