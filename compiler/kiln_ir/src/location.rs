use std::fmt;
use std::sync::Arc;

/// Source position attached to IR nodes and target instructions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextLocation {
    /// Source file path, `/`-separated.
    pub file: Arc<str>,
    /// 1-based line number.
    pub line: u32,
}

impl TextLocation {
    pub fn new(file: impl Into<Arc<str>>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for TextLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}
