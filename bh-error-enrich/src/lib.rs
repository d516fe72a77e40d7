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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate enriches errors with diagnostic metadata as they travel up through the layers of
//! an application (handlers, services, repositories), without changing the error-return
//! signatures of those layers.
//!
//! # Details
//!
//! Use `std::result::Result<T, bh_error_enrich::Error>`, or equivalently
//! `bh_error_enrich::Result<T>` as the return type of functions which may fail.
//!
//! An [`Error`] is a chain of decorations around the original ("raw") error.  The following
//! decorations are available:
//!
//! * a [`StackTrace`] captured where the error was first enriched, see [`Error::with_stack`];
//! * a [`FieldBag`] of named diagnostic values, see [`Error::with_field`];
//! * a component path, the subsystem names the error passed through, see
//!   [`Context::in_component`] and [`Error::components`];
//! * a message prefix, see [`Error::wrap`];
//! * an opaque public message hiding the internal one, see [`Error::opaque`].
//!
//! A chain carries at most one stack trace, one field bag and one component path, no matter how
//! many times the error gets enriched.  Decorating never hides the identity of the raw error:
//! [`Error::find`] and [`Error::is`] match it through any number of decorations.
//!
//! Fields and components are usually accumulated in a request-scoped [`Context`], which is
//! threaded explicitly through the calls.  [`Error::enrich`] then attaches the stack trace and
//! everything accumulated in the context in one go.
//!
//! Errors which are not [`Error`] yet, i.e. any [`std::error::Error`], are decorated through the
//! [`EnrichError`][traits::EnrichError] extension trait on [`std::result::Result`], which leaves
//! the [`Ok`] variant untouched.
//!
//! The crate never logs anything by itself.  Use the [`Loggable`][traits::Loggable] trait to log
//! an error explicitly.
//!
//! # Examples
//!
//! ```
//! use bh_error_enrich::{traits::EnrichError as _, Context};
//!
//! #[derive(Debug, PartialEq)]
//! struct RecordNotFound;
//!
//! impl std::fmt::Display for RecordNotFound {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "record not found")
//!     }
//! }
//!
//! impl std::error::Error for RecordNotFound {}
//!
//! fn repository(ctx: &Context) -> bh_error_enrich::Result<()> {
//!     let ctx = ctx.in_component("repository");
//!
//!     Err::<(), _>(RecordNotFound)
//!         .with_field("db", "postgres")
//!         // Capture the stack and attach everything accumulated in `ctx`.
//!         .enrich(&ctx)
//! }
//!
//! fn service(ctx: &Context) -> bh_error_enrich::Result<()> {
//!     let ctx = ctx.in_component("service");
//!
//!     repository(&ctx).wrap(|| "loading user")
//! }
//!
//! fn handler(ctx: &Context) -> bh_error_enrich::Result<()> {
//!     let ctx = ctx.in_component("handler").with_field("requestId", 42);
//!
//!     service(&ctx)
//!         // Already enriched, so this neither captures a new stack nor adds components.
//!         .enrich(&ctx)
//!         .opaque(|| "user not found")
//! }
//!
//! let err = handler(&bh_error_enrich::Context::new()).unwrap_err();
//!
//! assert_eq!(err.to_string(), "user not found");
//! assert!(err.is(&RecordNotFound));
//! assert_eq!(err.components().unwrap(), ["handler", "service", "repository"]);
//!
//! let fields = err.fields().unwrap();
//! assert_eq!(fields.get("db"), Some(&serde_json::json!("postgres")));
//! assert_eq!(fields.get("requestId"), Some(&serde_json::json!(42)));
//! ```

use std::fmt;

pub use context::Context;
pub use fields::FieldBag;
pub use stack::{Frame, StackTrace, MAX_FRAMES};

pub mod adapters;
mod components;
mod context;
mod display;
mod fields;
mod stack;
pub mod traits;

/// The [`std::result::Result`] alias with [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// A decoration of a causal chain.
///
/// Each node owns exactly one payload and its cause(s).  The chain ends with a raw error.
enum Node {
    Raw(Box<dyn std::error::Error + Send + Sync>),
    Stack { trace: StackTrace, cause: Box<Error> },
    Fields { fields: FieldBag, cause: Box<Error> },
    Components { components: Vec<String>, cause: Box<Error> },
    Opaque { message: String, cause: Box<Error> },
    Message { prefix: String, cause: Box<Error> },
    Nested { parent: Box<Error>, child: Box<Error> },
}

/// An error enriched with diagnostic metadata.
///
/// The struct wraps the original error together with all the decorations added to it while it
/// was propagated.  It is cheap to move around; the metadata is only queried (or rendered) by
/// whoever handles the error in the end.
///
/// Rendering:
///
/// * `{}` writes the message chain only;
/// * `{:#}` also writes the captured stack trace, one frame per line;
/// * `{:?}` writes a single line JSON object with the message, fields, components and the short
///   form of the stack trace.
pub struct Error {
    node: Node,
}

/// Raw error created from a plain message.
#[derive(Debug)]
struct MessageError(String);

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for MessageError {}

impl Error {
    /// Creates an undecorated error from any [`std::error::Error`].
    ///
    /// If `error` already is an [`Error`], it is returned as is.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::from_boxed(Box::new(error))
    }

    /// Creates an undecorated error from a boxed [`std::error::Error`].
    ///
    /// If the boxed error is an [`Error`], it is unboxed and returned as is.
    pub fn from_boxed(error: Box<dyn std::error::Error + Send + Sync>) -> Self {
        match error.downcast::<Error>() {
            Ok(error) => *error,
            Err(error) => Self {
                node: Node::Raw(error),
            },
        }
    }

    /// Creates an undecorated error with the given message.
    pub fn msg<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self::new(MessageError(message.into()))
    }

    fn decorate<F>(self, f: F) -> Self
    where
        F: FnOnce(Box<Error>) -> Node,
    {
        Self {
            node: f(Box::new(self)),
        }
    }

    /// Captures the stack trace, unless the chain already carries one.
    ///
    /// The first frame of the trace is the caller of this method.
    #[inline(never)]
    pub fn with_stack(self) -> Self {
        self.stacked()
    }

    /// Must be inlined into a public entry point, so that the frame skipped by the capture is the
    /// entry point itself.
    #[inline(always)]
    pub(crate) fn stacked(self) -> Self {
        if self.stack_trace().is_some() {
            return self;
        }

        let trace = StackTrace::capture(1);
        self.decorate(|cause| Node::Stack { trace, cause })
    }

    /// Enriches the error with the stack trace and the fields & components accumulated in `ctx`.
    ///
    /// This is the recommended way of decorating an error.  The method is safe to call any number
    /// of times on the same chain:
    ///
    /// * the stack trace is captured only once, with the first frame being the caller of the first
    ///   `enrich` (or [`with_stack`][Self::with_stack]) call;
    /// * fields of `ctx` are merged into the chain's single [`FieldBag`], overwriting values of
    ///   the same keys;
    /// * the components of `ctx` are attached only if the chain has no components yet.
    #[inline(never)]
    pub fn enrich(self, ctx: &Context) -> Self {
        self.enriched(ctx)
    }

    /// Same inlining requirement as `stacked`.
    #[inline(always)]
    pub(crate) fn enriched(self, ctx: &Context) -> Self {
        self.stacked().attach_fields(ctx).attach_components(ctx)
    }

    /// Prefixes the error message with `prefix`, i.e. renders as `"{prefix}: {message}"`.
    pub fn wrap<P>(self, prefix: P) -> Self
    where
        P: Into<String>,
    {
        let prefix = prefix.into();
        self.decorate(|cause| Node::Message { prefix, cause })
    }

    /// Replaces the rendered message with a public one.
    ///
    /// The original error stays in the chain, so [`Error::find`] and [`Error::is`] still match
    /// it, but none of its text is rendered.
    pub fn opaque<M>(self, message: M) -> Self
    where
        M: Into<String>,
    {
        let message = message.into();
        self.decorate(|cause| Node::Opaque { message, cause })
    }

    /// Combines two errors into one, rendered as `"{parent}: {child}"`.
    ///
    /// Both errors remain discoverable with [`Error::find`] and [`Error::is`].  Metadata queries
    /// search the parent first.
    pub fn nested(parent: Error, child: Error) -> Self {
        Self {
            node: Node::Nested {
                parent: Box::new(parent),
                child: Box::new(child),
            },
        }
    }

    /// Returns the stack trace captured for this chain, if any.
    pub fn stack_trace(&self) -> Option<&StackTrace> {
        self.chain().find_map(|error| match &error.node {
            Node::Stack { trace, .. } => Some(trace),
            _ => None,
        })
    }

    /// Finds the first error of type `E` in the chain.
    ///
    /// Besides the decorated errors themselves, the search also covers the sources of the raw
    /// errors.
    pub fn find<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.raw_errors().find_map(|error| error.downcast_ref::<E>())
    }

    /// Checks whether an error equal to `target` is found in the chain.
    pub fn is<E>(&self, target: &E) -> bool
    where
        E: std::error::Error + PartialEq + 'static,
    {
        self.raw_errors()
            .filter_map(|error| error.downcast_ref::<E>())
            .any(|error| error == target)
    }

    /// Iterates over all the nodes of the chain, starting with `self`.
    ///
    /// Nested errors are visited depth first, the parent before the child.
    pub fn chain(&self) -> Chain<'_> {
        Chain {
            pending: vec![self],
        }
    }

    /// Number of nodes on the primary causal line, including the raw error.
    ///
    /// For nested errors only the parent is followed.
    pub fn depth(&self) -> usize {
        std::iter::successors(Some(self), |error| error.cause()).count()
    }

    fn cause(&self) -> Option<&Error> {
        match &self.node {
            Node::Raw(_) => None,
            Node::Nested { parent, .. } => Some(&**parent),
            Node::Stack { cause, .. }
            | Node::Fields { cause, .. }
            | Node::Components { cause, .. }
            | Node::Opaque { cause, .. }
            | Node::Message { cause, .. } => Some(&**cause),
        }
    }

    fn raw_errors(&self) -> impl Iterator<Item = &(dyn std::error::Error + 'static)> {
        self.chain()
            .filter_map(|error| match &error.node {
                Node::Raw(raw) => Some(&**raw as &(dyn std::error::Error + 'static)),
                _ => None,
            })
            .flat_map(|raw| std::iter::successors(Some(raw), |error| error.source()))
    }
}

/// Iterator over the nodes of an [`Error`] chain, created by [`Error::chain`].
pub struct Chain<'a> {
    pending: Vec<&'a Error>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Error;

    fn next(&mut self) -> Option<Self::Item> {
        let error = self.pending.pop()?;

        match &error.node {
            Node::Raw(_) => {}
            Node::Nested { parent, child } => {
                self.pending.push(child);
                self.pending.push(parent);
            }
            Node::Stack { cause, .. }
            | Node::Fields { cause, .. }
            | Node::Components { cause, .. }
            | Node::Opaque { cause, .. }
            | Node::Message { cause, .. } => self.pending.push(cause),
        }

        Some(error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.node {
            Node::Raw(raw) => raw.source(),
            _ => self.cause().map(|cause| cause as _),
        }
    }
}
