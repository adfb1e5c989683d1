//! Hook output generation for stdout.

use std::io::{self, Write};

/// Response a hook writes to stdout.
///
/// The host injects `Context` text into the conversation. `Empty` is
/// written as `{}` and means there is nothing to inject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutput {
    Context(String),
    Empty,
}

impl HookOutput {
    /// Context output, collapsing blank text to `Empty`.
    pub fn context(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            Self::Empty
        } else {
            Self::Context(text)
        }
    }

    /// Nothing to inject.
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Text exactly as written to stdout, without the trailing newline.
    pub fn render(&self) -> &str {
        match self {
            Self::Context(text) => text,
            Self::Empty => "{}",
        }
    }

    /// Write the output to any writer.
    pub fn write_to(&self, mut writer: impl Write) -> io::Result<()> {
        writeln!(writer, "{}", self.render())?;
        writer.flush()
    }

    /// Write the output to stdout.
    pub fn write_stdout(&self) -> anyhow::Result<()> {
        self.write_to(io::stdout().lock())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_renders_as_json_object() {
        assert_eq!(HookOutput::empty().render(), "{}");
    }

    #[test]
    fn test_blank_context_is_empty() {
        assert_eq!(HookOutput::context("  \n"), HookOutput::Empty);
    }

    #[test]
    fn test_write_context() {
        let mut buf = Vec::new();
        HookOutput::context("## Workspace Context\nhello")
            .write_to(&mut buf)
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "## Workspace Context\nhello\n");
    }
}
