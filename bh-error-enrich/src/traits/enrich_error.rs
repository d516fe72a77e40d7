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

use crate::{Context, Error};

/// Extension trait for decorating the error of a [`std::result::Result`].
///
/// This trait is implemented for any `Result<T, S>` where `S` is a [`std::error::Error`],
/// including [`crate::Error`] itself.  The [Err] variant is converted with [`Error::new`] and
/// decorated; the [Ok] variant is left untouched, so successful results flow through any chain of
/// decorations unchanged.
pub trait EnrichError<T> {
    /// Enriches the [Err] variant, see [`Error::enrich`].
    fn enrich(self, ctx: &Context) -> crate::Result<T>;

    /// Captures the stack trace for the [Err] variant, see [`Error::with_stack`].
    fn with_stack(self) -> crate::Result<T>;

    /// Prefixes the message of the [Err] variant, see [`Error::wrap`].
    ///
    /// The prefix is lazily evaluated.
    fn wrap<P, F>(self, f: F) -> crate::Result<T>
    where
        P: Into<String>,
        F: FnOnce() -> P;

    /// Hides the message of the [Err] variant behind a public one, see [`Error::opaque`].
    ///
    /// The message is lazily evaluated.
    fn opaque<M, F>(self, f: F) -> crate::Result<T>
    where
        M: Into<String>,
        F: FnOnce() -> M;

    /// Attaches a field to the [Err] variant, see [`Error::with_field`].
    fn with_field<K, V>(self, key: K, value: V) -> crate::Result<T>
    where
        K: Into<String>,
        V: Into<Value>;

    /// Attaches fields to the [Err] variant, see [`Error::with_fields`].
    fn with_fields<I, K, V>(self, fields: I) -> crate::Result<T>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>;
}

// Stack capturing methods avoid `map_err` so that no closure frame ends up between the caller and
// the captured stack.
impl<T, S> EnrichError<T> for std::result::Result<T, S>
where
    S: std::error::Error + Send + Sync + 'static,
{
    #[inline(never)]
    fn enrich(self, ctx: &Context) -> crate::Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(Error::new(error).enriched(ctx)),
        }
    }

    #[inline(never)]
    fn with_stack(self) -> crate::Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(Error::new(error).stacked()),
        }
    }

    fn wrap<P, F>(self, f: F) -> crate::Result<T>
    where
        P: Into<String>,
        F: FnOnce() -> P,
    {
        self.map_err(|error| Error::new(error).wrap(f()))
    }

    fn opaque<M, F>(self, f: F) -> crate::Result<T>
    where
        M: Into<String>,
        F: FnOnce() -> M,
    {
        self.map_err(|error| Error::new(error).opaque(f()))
    }

    fn with_field<K, V>(self, key: K, value: V) -> crate::Result<T>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.map_err(|error| Error::new(error).with_field(key, value))
    }

    fn with_fields<I, K, V>(self, fields: I) -> crate::Result<T>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.map_err(|error| Error::new(error).with_fields(fields))
    }
}
