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

use std::panic::Location;

/// Trait making the error variant of [`crate::Result`] loggable.
///
/// The error is logged in its [`Debug`][std::fmt::Debug] form, i.e. as a JSON object with the
/// message, fields, components and stack trace.  The log target is the source location of the
/// caller.
pub trait Loggable {
    /// Logs the error at the error level, if it occurred.
    fn log_err(self) -> Self;

    /// Logs the error at the warning level, if it occurred.
    fn log_warn(self) -> Self;
}

impl<T> Loggable for crate::Result<T> {
    #[track_caller]
    fn log_err(self) -> Self {
        log_at(self, log::Level::Error, Location::caller())
    }

    #[track_caller]
    fn log_warn(self) -> Self {
        log_at(self, log::Level::Warn, Location::caller())
    }
}

fn log_at<T>(
    result: crate::Result<T>,
    level: log::Level,
    location: &Location<'_>,
) -> crate::Result<T> {
    result.map_err(|error| {
        log::log!(target: &location.to_string(), level, "{:?}", error);
        error
    })
}

#[cfg(test)]
mod tests {
    use super::Loggable as _;
    use crate::Error;

    #[test]
    fn test_log_passes_through() {
        let ok: crate::Result<u8> = Ok(1);
        assert_eq!(ok.log_err().log_warn().ok(), Some(1));

        let err: crate::Result<u8> = Err(Error::msg("err").with_field("a", 1));
        let error = err.log_err().log_warn().unwrap_err();
        assert_eq!(error.to_string(), "err");
        assert_eq!(error.depth(), 2);
    }
}
