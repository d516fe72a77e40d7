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

use serde_json::Value;

use crate::FieldBag;

/// Request-scoped carrier of the fields & components accumulated along a call path.
///
/// A context is created by the caller of the outermost layer and passed explicitly (by reference)
/// to every layer below.  Each layer adds its own data by deriving a new context; the context it
/// received is never modified.  Sibling branches of a call tree therefore never see each other's
/// data, and a context can be shared across threads freely.
///
/// Once an error occurs, [`Error::enrich`][crate::Error::enrich] attaches the accumulated data to
/// it.
///
/// # Examples
///
/// ```
/// use bh_error_enrich::Context;
///
/// let root = Context::new().with_field("requestId", 7);
/// let handler = root.in_component("handler");
/// let service = handler.in_component("service");
///
/// assert!(root.components().is_empty());
/// assert_eq!(handler.components(), ["handler"]);
/// assert_eq!(service.components(), ["handler", "service"]);
/// assert_eq!(service.fields().len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Context {
    fields: FieldBag,
    components: Vec<String>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new context with `name` appended to the component path.
    #[must_use]
    pub fn in_component<N>(&self, name: N) -> Self
    where
        N: Into<String>,
    {
        let mut ctx = self.clone();
        ctx.components.push(name.into());
        ctx
    }

    /// Returns a new context with the field added, overwriting the previous value of the `key`.
    #[must_use]
    pub fn with_field<K, V>(&self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.with_fields([(key, value)])
    }

    /// Returns a new context with the `fields` merged in, overwriting the values of present keys.
    #[must_use]
    pub fn with_fields<I, K, V>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut ctx = self.clone();
        ctx.fields.extend(fields);
        ctx
    }

    /// The accumulated fields; empty if none were added.
    pub fn fields(&self) -> &FieldBag {
        &self.fields
    }

    /// The accumulated component path, outermost first.
    pub fn components(&self) -> &[String] {
        &self.components
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Context;
    use crate::FieldBag;

    #[test]
    fn test_empty() {
        let ctx = Context::new();

        assert!(ctx.fields().is_empty());
        assert!(ctx.components().is_empty());
    }

    #[test]
    fn test_with_field() {
        let ctx = Context::new()
            .with_field("userId", 1)
            .with_field("handler", "addUser");

        assert_eq!(
            ctx.fields(),
            &FieldBag::from_iter([("userId", json!(1)), ("handler", json!("addUser"))])
        );
    }

    #[test]
    fn test_with_field_overwrites() {
        let ctx = Context::new()
            .with_field("userId", 1)
            .with_field("userId", "some id");

        assert_eq!(ctx.fields(), &FieldBag::from_iter([("userId", "some id")]));
    }

    #[test]
    fn test_with_fields() {
        let ctx = Context::new()
            .with_field("a", 1)
            .with_fields([("b", 2), ("a", 3)]);

        assert_eq!(ctx.fields(), &FieldBag::from_iter([("a", 3), ("b", 2)]));
    }

    #[test]
    fn test_branches_are_isolated() {
        let root = Context::new().in_component("api").with_field("requestId", 1);

        let left = root.in_component("left").with_field("side", "left");
        let right = root.in_component("right");

        assert_eq!(root.components(), ["api"]);
        assert_eq!(root.fields().len(), 1);
        assert_eq!(left.components(), ["api", "left"]);
        assert_eq!(left.fields().len(), 2);
        assert_eq!(right.components(), ["api", "right"]);
        assert_eq!(right.fields().get("side"), None);
    }

    #[test]
    fn test_shared_across_threads() {
        let ctx = Context::new().in_component("api");

        let handles: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|name| {
                let ctx = ctx.clone();
                std::thread::spawn(move || ctx.in_component(name))
            })
            .collect();

        for (handle, name) in handles.into_iter().zip(["a", "b"]) {
            assert_eq!(handle.join().unwrap().components(), ["api", name]);
        }
        assert_eq!(ctx.components(), ["api"]);
    }
}
