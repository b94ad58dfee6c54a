//! External text-extraction helpers.
//!
//! A [`TextExtractor`] turns a file on disk into plain text. The legacy
//! document path tries an ordered list of them before decoding the
//! compound file itself; any failure simply moves on to the next strategy.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use crate::error::{Error, ToolError};

/// A pluggable text-extraction capability.
pub trait TextExtractor: Send + Sync {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// Extract plain text from the file at `path`.
    fn extract_text(&self, path: &Path) -> Result<String, ToolError>;
}

/// Runs an external program and captures its standard output.
///
/// The input path is passed as the last argument.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    /// Create an extractor for the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// The `antiword` converter, with line wrapping disabled.
    pub fn antiword() -> Self {
        Self::new("antiword").with_args(["-w", "0"])
    }

    /// Set the arguments placed before the input path.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Program name.
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl TextExtractor for CommandExtractor {
    fn name(&self) -> &str {
        &self.program
    }

    fn extract_text(&self, path: &Path) -> Result<String, ToolError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ToolError::NotInstalled(self.program.clone()),
                _ => ToolError::Io(e),
            })?;

        if !output.status.success() {
            return Err(ToolError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            return Err(ToolError::EmptyOutput(self.program.clone()));
        }

        Ok(text)
    }
}

/// A helper that is never installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTool;

impl TextExtractor for NoTool {
    fn name(&self) -> &str {
        "none"
    }

    fn extract_text(&self, _path: &Path) -> Result<String, ToolError> {
        Err(ToolError::NotInstalled("none".to_string()))
    }
}

/// The default strategy list.
pub fn default_tools() -> Vec<Box<dyn TextExtractor>> {
    vec![Box::new(CommandExtractor::antiword())]
}

/// Run one extractor over `data` written to a uniquely named temporary file.
///
/// The temporary file is removed before this function returns, whatever the
/// extractor did.
pub fn extract_with(tool: &dyn TextExtractor, data: &[u8]) -> Result<String, ToolError> {
    let mut file = tempfile::Builder::new()
        .prefix("dochtml-")
        .suffix(".doc")
        .tempfile()?;
    file.write_all(data)?;
    file.flush()?;

    // Close our handle so the helper can open the file on every platform
    let path = file.into_temp_path();
    let result = tool.extract_text(&path);

    if let Err(e) = path.close() {
        log::warn!("Failed to remove temporary file: {}", e);
    }

    result
}

/// Try each strategy in order and return the first non-empty text.
///
/// Returns `None` when every strategy declines.
pub fn try_external_extract(tools: &[Box<dyn TextExtractor>], data: &[u8]) -> Option<String> {
    for tool in tools {
        let result = extract_with(tool.as_ref(), data).and_then(|text| {
            if text.trim().is_empty() {
                Err(ToolError::EmptyOutput(tool.name().to_string()))
            } else {
                Ok(text)
            }
        });

        match result {
            Ok(text) => {
                log::debug!("{} extracted {} bytes of text", tool.name(), text.len());
                return Some(text);
            }
            Err(e) => {
                let err = Error::from(e);
                log::warn!("{} declined: {}", tool.name(), err);
            }
        }
    }
    None
}
