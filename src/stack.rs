//! Error stacks as handed over by the report parser.
//!
//! Stacks arrive as JSON, innermost (erroring) frame first:
//!
//! ```json
//! [
//!   {
//!     "kind": "Leak_DefinitelyLost",
//!     "message": "24 bytes in 1 blocks are definitely lost",
//!     "stack": [
//!       { "fn": "malloc", "obj": "/usr/libexec/valgrind/vgpreload_memcheck-amd64-linux.so" },
//!       { "fn": "leaky_fn", "obj": "/app/lib/mygem.so", "file": "mygem.c", "line": 12 }
//!     ]
//!   }
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

/// One stack entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "fn")]
    pub function: String,
    /// Shared object or executable defining the function. Absent for
    /// unresolved frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obj: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Frame {
    /// A frame with no containing object.
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            obj: None,
            file: None,
            line: None,
        }
    }

    pub fn with_obj(mut self, obj: impl Into<PathBuf>) -> Self {
        self.obj = Some(obj.into());
        self
    }

    pub fn obj(&self) -> Option<&Path> {
        self.obj.as_deref()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.function)?;
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, " ({file}:{line})")?,
            (Some(file), None) => write!(f, " ({file})")?,
            _ => {}
        }
        if let Some(obj) = &self.obj {
            write!(f, " in {}", obj.display())?;
        }
        Ok(())
    }
}

/// Frames ordered from the error outward through its callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stack {
    pub frames: Vec<Frame>,
}

impl Stack {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FromIterator<Frame> for Stack {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// One error reported by the checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedError {
    /// Checker error kind, e.g. `Leak_DefinitelyLost` or `InvalidRead`.
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    pub stack: Stack,
}

/// Read a JSON array of [`ReportedError`].
pub fn read_errors<R: Read>(reader: R) -> serde_json::Result<Vec<ReportedError>> {
    serde_json::from_reader(reader)
}
