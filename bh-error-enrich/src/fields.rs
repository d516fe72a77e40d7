// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use serde_json::{Map, Value};

use crate::{Context, Error, Node};

/// Named diagnostic values attached to an [`Error`] or accumulated in a [`Context`].
///
/// Keys are unique, and writing an existing key overwrites its value.  Entries are enumerated in
/// insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldBag(Map<String, Value>);

impl FieldBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the `value` under the `key`, overwriting the previous value if any.
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.0.insert(key.into(), value.into());
    }

    /// Returns the value stored under the `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Number of stored fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the bag holds no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the fields in insertion order.
    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.0.iter()
    }

    /// The fields as a JSON object map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl<K, V> Extend<(K, V)> for FieldBag
where
    K: Into<String>,
    V: Into<Value>,
{
    fn extend<I>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in fields {
            self.insert(key, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for FieldBag
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut bag = Self::new();
        bag.extend(fields);
        bag
    }
}

impl IntoIterator for FieldBag {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldBag {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl From<FieldBag> for Value {
    fn from(bag: FieldBag) -> Self {
        Value::Object(bag.0)
    }
}

impl Error {
    /// Attaches a single field to the error.
    ///
    /// See [`Error::with_fields`].
    pub fn with_field<K, V>(self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.with_fields([(key, value)])
    }

    /// Attaches the `fields` to the error, overwriting the values of already present keys.
    ///
    /// The chain holds a single [`FieldBag`]: if one is already present anywhere in the chain, the
    /// fields are merged into it, and the chain doesn't grow.
    pub fn with_fields<I, K, V>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut error = self.into_field_bag();
        if let Some(bag) = error.fields_mut() {
            bag.extend(fields);
        }
        error
    }

    /// Returns the fields attached to the error, if any.
    pub fn fields(&self) -> Option<&FieldBag> {
        self.chain().find_map(|error| match &error.node {
            Node::Fields { fields, .. } => Some(fields),
            _ => None,
        })
    }

    /// Merges the fields accumulated in `ctx`.  An empty context adds no field node.
    pub(crate) fn attach_fields(self, ctx: &Context) -> Self {
        if ctx.fields().is_empty() {
            return self;
        }

        self.with_fields(ctx.fields().clone())
    }

    /// Makes sure the chain has a field node, reusing the existing one.
    fn into_field_bag(mut self) -> Self {
        if self.fields_mut().is_some() {
            return self;
        }

        self.decorate(|cause| Node::Fields {
            fields: FieldBag::new(),
            cause,
        })
    }

    fn fields_mut(&mut self) -> Option<&mut FieldBag> {
        match &mut self.node {
            Node::Raw(_) => None,
            Node::Fields { fields, .. } => Some(fields),
            Node::Nested { parent, child } => match parent.fields_mut() {
                Some(fields) => Some(fields),
                None => child.fields_mut(),
            },
            Node::Stack { cause, .. }
            | Node::Components { cause, .. }
            | Node::Opaque { cause, .. }
            | Node::Message { cause, .. } => cause.fields_mut(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::FieldBag;
    use crate::Error;

    #[test]
    fn test_insert() {
        let mut bag = FieldBag::new();
        assert!(bag.is_empty());

        bag.insert("userId", 1);
        bag.insert("handler", "addUser");
        bag.insert("userId", "some id");

        assert_eq!(bag.len(), 2);
        assert_eq!(bag.get("userId"), Some(&json!("some id")));
        assert_eq!(bag.get("handler"), Some(&json!("addUser")));
        assert_eq!(bag.get("missing"), None);
    }

    #[test]
    fn test_insertion_order() {
        let bag = FieldBag::from_iter([("b", 1), ("a", 2), ("c", 3)]);

        let keys: Vec<_> = bag.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, ["b", "a", "c"]);
        assert_eq!(
            serde_json::Value::from(bag).to_string(),
            r#"{"b":1,"a":2,"c":3}"#
        );
    }

    #[test]
    fn test_with_field() {
        let error = Error::msg("err").with_field("some key", "field value");

        assert_eq!(
            error.fields(),
            Some(&FieldBag::from_iter([("some key", "field value")]))
        );
        assert_eq!(error.depth(), 2);
    }

    #[test]
    fn test_with_fields_accumulate() {
        let error = Error::msg("err")
            .with_fields(HashMap::from([("key1", "value1")]))
            .with_field("key2", "value2");

        assert_eq!(
            error.fields(),
            Some(&FieldBag::from_iter([("key1", "value1"), ("key2", "value2")]))
        );
        assert_eq!(error.depth(), 2);
    }

    #[test]
    fn test_with_fields_last_write_wins() {
        let error = Error::msg("err")
            .with_fields([("a", 1), ("b", 2)])
            .with_fields([("b", 3)]);

        assert_eq!(error.fields(), Some(&FieldBag::from_iter([("a", 1), ("b", 3)])));
        assert_eq!(error.depth(), 2);
    }

    #[test]
    fn test_with_field_reuses_inner_bag() {
        let error = Error::msg("err")
            .with_field("key1", "value1")
            .with_stack()
            .wrap("ctx")
            .with_field("key1", "NEW");

        // message, stack, fields, raw
        assert_eq!(error.depth(), 4);
        assert_eq!(error.fields(), Some(&FieldBag::from_iter([("key1", "NEW")])));
    }

    #[test]
    fn test_fields_missing() {
        assert!(Error::msg("err").fields().is_none());
        assert!(Error::msg("err").with_stack().fields().is_none());
    }
}
