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

use std::{
    ffi::c_void,
    fmt,
    path::{Path, PathBuf},
    sync::OnceLock,
};

/// Maximum number of frames stored in a [`StackTrace`].
pub const MAX_FRAMES: usize = 32;

/// Upper bound on the frames the unwinder itself puts on top of [`StackTrace::capture`].
const UNWINDER_FRAMES: usize = 16;

#[derive(Clone, Debug, Default)]
struct Symbol {
    function: Option<String>,
    file: Option<PathBuf>,
    line: Option<u32>,
}

/// A single call site captured in a [`StackTrace`].
///
/// Only the instruction pointer is stored at capture time.  The function name, file and line are
/// resolved the first time any of them is requested, and cached afterwards.  Resolving does not
/// need the original stack, so a frame can be formatted from any thread, at any later time.
///
/// Formatting:
///
/// * `{}` writes `file-name:line`, e.g. `handler.rs:42`;
/// * `{:#}` writes the function name, followed by the full file path and the line on the next
///   line, indented with a tab.
///
/// Frames which cannot be resolved are written as `unknown` with the line `0`.
#[derive(Clone)]
pub struct Frame {
    ip: usize,
    symbol: OnceLock<Symbol>,
}

impl Frame {
    fn new(ip: usize) -> Self {
        Self {
            ip,
            symbol: OnceLock::new(),
        }
    }

    /// The captured instruction pointer.
    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Demangled name of the function, without the hash suffix.
    pub fn function(&self) -> Option<&str> {
        self.symbol().function.as_deref()
    }

    /// Full path of the source file.
    pub fn file(&self) -> Option<&Path> {
        self.symbol().file.as_deref()
    }

    /// Line number in the source file.
    pub fn line(&self) -> Option<u32> {
        self.symbol().line
    }

    fn symbol(&self) -> &Symbol {
        self.symbol.get_or_init(|| resolve(self.ip))
    }
}

fn resolve(ip: usize) -> Symbol {
    if ip == 0 {
        return Symbol::default();
    }

    let mut resolved = None;
    // Inlined calls produce several symbols per address, the first one is the innermost.
    backtrace::resolve(ip as *mut c_void, |symbol| {
        resolved.get_or_insert_with(|| Symbol {
            function: symbol.name().map(|name| format!("{name:#}")),
            file: symbol.filename().map(Path::to_path_buf),
            line: symbol.lineno(),
        });
    });

    resolved.unwrap_or_default()
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = self.line().unwrap_or(0);

        if f.alternate() {
            let function = self.function().unwrap_or("unknown");
            match self.file() {
                Some(file) => write!(f, "{function}\n\t{}:{line}", file.display()),
                None => write!(f, "{function}\n\tunknown:{line}"),
            }
        } else {
            match self.file().and_then(Path::file_name) {
                Some(name) => write!(f, "{}:{line}", name.to_string_lossy()),
                None => write!(f, "unknown:{line}"),
            }
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Call stack captured when an error was first enriched.
///
/// Frames are ordered from the innermost call to the outermost one, and there are at most
/// [`MAX_FRAMES`] of them.
///
/// Formatting:
///
/// * `{}` writes all frames in the short form, e.g. `[service.rs:10 handler.rs:42]`;
/// * `{:#}` writes every frame in the long form, each one starting on a new line.
#[derive(Clone, Default)]
pub struct StackTrace {
    frames: Vec<Frame>,
}

impl StackTrace {
    /// Captures the current call stack.
    ///
    /// With `skip == 0` the first frame is the caller of this function.  Each increment of
    /// `skip` drops one more frame from the top.
    #[inline(never)]
    pub fn capture(skip: usize) -> Self {
        let anchor = Self::capture as usize;
        let limit = skip.saturating_add(UNWINDER_FRAMES + MAX_FRAMES);

        let mut raw = Vec::with_capacity(UNWINDER_FRAMES + MAX_FRAMES);
        backtrace::trace(|frame| {
            raw.push((frame.ip() as usize, frame.symbol_address() as usize));
            raw.len() < limit
        });

        // Everything up to and including this very function belongs to the unwinder.  Keep all
        // frames on platforms which can't tell function addresses apart.
        let start = raw
            .iter()
            .position(|&(_, symbol)| symbol == anchor)
            .map_or(0, |index| index + 1);

        let frames = raw
            .into_iter()
            .skip(start.saturating_add(skip))
            .take(MAX_FRAMES)
            .map(|(ip, _)| Frame::new(ip))
            .collect();

        Self { frames }
    }

    /// The captured frames, innermost first.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Iterates over the captured frames, innermost first.
    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    /// Number of captured frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frames were captured.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl<'a> IntoIterator for &'a StackTrace {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            for frame in &self.frames {
                write!(f, "\n{frame:#}")?;
            }
            return Ok(());
        }

        write!(f, "[")?;
        for (index, frame) in self.frames.iter().enumerate() {
            if index > 0 {
                write!(f, " ")?;
            }
            write!(f, "{frame}")?;
        }
        write!(f, "]")
    }
}

impl fmt::Debug for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.frames).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::hint::black_box;

    use super::*;
    use crate::{Context, Error};

    #[inline(never)]
    fn current_frame() -> Frame {
        StackTrace::capture(0).frames()[0].clone()
    }

    #[inline(never)]
    fn level_three() -> Error {
        black_box(Error::msg("err").enrich(&Context::new()))
    }

    #[inline(never)]
    fn level_two() -> Error {
        black_box(level_three())
    }

    #[inline(never)]
    fn level_one() -> Error {
        black_box(level_two())
    }

    fn trace_len(error: &Error) -> usize {
        error.stack_trace().map_or(0, StackTrace::len)
    }

    #[test]
    fn test_frame_format() {
        let frame = current_frame();

        assert!(frame.function().unwrap().ends_with("current_frame"));
        assert!(frame.file().unwrap().ends_with("stack.rs"));

        let short = frame.to_string();
        assert!(short.starts_with("stack.rs:"), "{short}");
        assert_eq!(short, format!("stack.rs:{}", frame.line().unwrap()));

        let long = format!("{frame:#}");
        let (function, location) = long.split_once("\n\t").unwrap();
        assert!(function.ends_with("current_frame"), "{long}");
        assert!(location.ends_with(&format!("stack.rs:{}", frame.line().unwrap())));
        assert!(location.len() > short.len());
    }

    #[test]
    fn test_unknown_frame_format() {
        let frame = Frame::new(0);

        assert_eq!(frame.to_string(), "unknown:0");
        assert_eq!(format!("{frame:#}"), "unknown\n\tunknown:0");
        assert_eq!(format!("{frame:?}"), "unknown:0");
    }

    #[test]
    fn test_stack_trace_format() {
        let empty = StackTrace::default();
        assert_eq!(empty.to_string(), "[]");
        assert_eq!(format!("{empty:#}"), "");
        assert_eq!(format!("{empty:?}"), "[]");

        let trace = StackTrace {
            frames: vec![Frame::new(0), Frame::new(0)],
        };
        assert_eq!(trace.to_string(), "[unknown:0 unknown:0]");
        assert_eq!(
            format!("{trace:#}"),
            "\nunknown\n\tunknown:0\nunknown\n\tunknown:0"
        );
        assert_eq!(format!("{trace:?}"), "[unknown:0, unknown:0]");
    }

    #[test]
    fn test_capture_skip() {
        let trace = StackTrace::capture(0);
        let skipped = StackTrace::capture(1);

        assert!(!trace.is_empty());
        assert!(trace.len() <= MAX_FRAMES);
        assert!(trace.frames()[0]
            .function()
            .unwrap()
            .contains("test_capture_skip"));
        assert_eq!(skipped.frames()[0].ip(), trace.frames()[1].ip());
    }

    #[test]
    fn test_capture_skip_past_stack() {
        assert!(StackTrace::capture(usize::MAX).is_empty());
        assert!(StackTrace::capture(usize::MAX / 2).is_empty());
        assert!(StackTrace::capture(usize::MAX - UNWINDER_FRAMES).is_empty());
    }

    #[test]
    fn test_first_frame_is_caller() {
        let error = std::thread::spawn(level_one).join().unwrap();
        let trace = error.stack_trace().unwrap();

        let functions: Vec<_> = trace
            .iter()
            .take(3)
            .map(|frame| frame.function().unwrap_or_default().to_owned())
            .collect();
        assert!(functions[0].ends_with("level_three"), "{functions:?}");
        assert!(functions[1].ends_with("level_two"), "{functions:?}");
        assert!(functions[2].ends_with("level_one"), "{functions:?}");
    }

    #[test]
    fn test_stack_trace_length() {
        // Fresh threads keep the stacks short and of the same base depth.
        let shallow = std::thread::spawn(level_three).join().unwrap();
        let deep = std::thread::spawn(level_one).join().unwrap();

        assert!(trace_len(&deep) < MAX_FRAMES);
        assert_eq!(trace_len(&deep), trace_len(&shallow) + 2);
    }

    #[test]
    fn test_resolve_after_thread_exit() {
        let trace = std::thread::spawn(current_frame_trace).join().unwrap();

        let rendered = format!("{trace:#}");
        assert!(rendered.contains("current_frame_trace"), "{rendered}");
    }

    #[inline(never)]
    fn current_frame_trace() -> StackTrace {
        black_box(StackTrace::capture(0))
    }

    #[test]
    fn test_frames_are_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}

        assert_send_sync::<Frame>();
        assert_send_sync::<StackTrace>();
    }
}
