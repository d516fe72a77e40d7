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

use crate::{Context, Error, Node};

impl Error {
    /// Returns the names of the components the error passed through, outermost first.
    ///
    /// The components are taken from the [`Context`] the error was first enriched with, see
    /// [`Context::in_component`] and [`Error::enrich`].
    pub fn components(&self) -> Option<&[String]> {
        self.chain().find_map(|error| match &error.node {
            Node::Components { components, .. } => Some(components.as_slice()),
            _ => None,
        })
    }

    /// First write wins: a chain which already has components keeps them.
    pub(crate) fn attach_components(self, ctx: &Context) -> Self {
        if ctx.components().is_empty() || self.components().is_some() {
            return self;
        }

        let components = ctx.components().to_vec();
        self.decorate(|cause| Node::Components { components, cause })
    }
}
