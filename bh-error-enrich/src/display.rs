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

use std::fmt;

use serde_json::{Map, Value};

use crate::{Error, Node};

impl Error {
    fn write_message(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Node::Raw(raw) => write!(f, "{raw}"),
            Node::Opaque { message, .. } => f.write_str(message),
            Node::Message { prefix, cause } => {
                write!(f, "{prefix}: ")?;
                cause.write_message(f)
            }
            Node::Nested { parent, child } => {
                parent.write_message(f)?;
                f.write_str(": ")?;
                child.write_message(f)
            }
            Node::Stack { cause, .. }
            | Node::Fields { cause, .. }
            | Node::Components { cause, .. } => cause.write_message(f),
        }
    }
}

// Writes the message chain, and with `{:#}` the stack trace as well.
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_message(f)?;

        if f.alternate() {
            if let Some(trace) = self.stack_trace() {
                write!(f, "{trace:#}")?;
            }
        }

        Ok(())
    }
}

// Writes a single line JSON object, convenient for logs.
impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut object = Map::new();

        object.insert("error".to_owned(), self.to_string().into());

        if let Some(fields) = self.fields() {
            object.insert("fields".to_owned(), fields.clone().into());
        }

        if let Some(components) = self.components() {
            object.insert("components".to_owned(), components.into());
        }

        if let Some(trace) = self.stack_trace() {
            let frames = trace.iter().map(ToString::to_string).collect::<Value>();
            object.insert("stack".to_owned(), frames);
        }

        write!(f, "{}", Value::Object(object))
    }
}
