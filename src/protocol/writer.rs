use std::fmt::Display;
use std::path::Path;

/// Builds a protocol: one token per line, newline terminated. Reals use the
/// shortest text that reads back to the same value.
#[derive(Debug, Default)]
pub struct ProtocolWriter {
    text: String,
}

impl ProtocolWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&mut self, value: impl Display) -> &mut Self {
        self.text.push_str(&value.to_string());
        self.text.push('\n');
        self
    }

    pub fn path(&mut self, path: &Path) -> &mut Self {
        self.token(path.display())
    }

    pub fn finish(self) -> String {
        self.text
    }
}
