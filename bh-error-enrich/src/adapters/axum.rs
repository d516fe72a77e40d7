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

//! [Error] adapter for the [axum] web framework.
//!
//! The response body is the rendered message of the error, i.e. its [`std::fmt::Display`] form.
//! Use [`Error::opaque`] before returning an error from a handler, so that only the public
//! message reaches the client.  Fields, components and the stack trace are never part of the
//! response.

pub use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::Error;

impl Error {
    /// Converts the error into an [axum] [`Response`] with the given [`StatusCode`].
    pub fn into_axum_response(self, status: StatusCode) -> Response {
        (status, self.to_string()).into_response()
    }
}

// Unless stated otherwise, a failed handler is a server error.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.into_axum_response(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse as _;

    use super::StatusCode;
    use crate::Error;

    #[test]
    fn test_into_response() {
        let response = Error::msg("db password rejected")
            .opaque("internal error")
            .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_into_axum_response() {
        let response = Error::msg("no such user")
            .opaque("not found")
            .into_axum_response(StatusCode::NOT_FOUND);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
