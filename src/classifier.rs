//! Keep-or-suppress decision for each reported error stack.
//!
//! Walking a stack from the error outward, the first frames that belong to
//! Ruby itself (before the extension is ever entered) decide whether a known
//! runtime entry point is to blame. Once the extension has been entered, Ruby
//! frames further out are the extension's own calls into the runtime and
//! never suppress. A stack that never enters the extension is suppressed.

use crate::stack::{Frame, Stack};
use memcheck_config::Configuration;
use std::path::Path;

/// Where a frame's code lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// The Ruby executable or `libruby.so`.
    Runtime,
    /// The extension under test.
    Binary,
    /// Anything else, including unresolved frames.
    Foreign,
}

/// Classifies stacks against a shared, read-only [`Configuration`].
#[derive(Debug, Clone, Copy)]
pub struct StackClassifier<'a> {
    config: &'a Configuration,
}

impl<'a> StackClassifier<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &'a Configuration {
        self.config
    }

    /// `true` if the error should be suppressed, `false` if it is reported.
    pub fn skip_stack(&self, stack: &Stack) -> bool {
        let init_function = self.config.init_function();
        let mut in_binary = false;

        for frame in stack.iter() {
            match self.provenance(frame) {
                Provenance::Runtime => {
                    if !in_binary && self.is_skipped_ruby_function(&frame.function) {
                        log::trace!("Suppressing stack at Ruby frame {}", frame.function);
                        return true;
                    }
                }
                Provenance::Binary => {
                    in_binary = true;
                    if frame.function == init_function {
                        log::trace!("Suppressing stack allocated in {}", frame.function);
                        return true;
                    }
                }
                Provenance::Foreign => {}
            }
        }

        !in_binary
    }

    /// Runtime is checked first, so a frame can never be both.
    pub fn provenance(&self, frame: &Frame) -> Provenance {
        if self.frame_in_ruby(frame) {
            Provenance::Runtime
        } else if self.frame_in_binary(frame) {
            Provenance::Binary
        } else {
            Provenance::Foreign
        }
    }

    /// The frame's object is the Ruby executable, or `libruby.so.<version>`
    /// for Ruby built with `--enable-shared`.
    pub fn frame_in_ruby(&self, frame: &Frame) -> bool {
        let Some(obj) = frame.obj() else {
            return false;
        };
        obj == self.config.ruby()
            || file_name(obj) == Some(self.config.runtime().shared_library_name().as_str())
    }

    /// The frame's object file name, minus its last extension, is the binary name.
    pub fn frame_in_binary(&self, frame: &Frame) -> bool {
        frame
            .obj()
            .and_then(|obj| obj.file_stem())
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| stem == self.config.binary_name())
    }

    fn is_skipped_ruby_function(&self, function: &str) -> bool {
        self.config
            .skipped_ruby_functions()
            .iter()
            .any(|pattern| pattern.is_match(function))
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}
