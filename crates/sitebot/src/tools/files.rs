use std::fs;
use std::path::{Path, PathBuf};

use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Map, Value};
use sitebot_core::tool::{Error as ToolError, Tool, ToolResult, sandbox};
use tokio::task::spawn_blocking;

use super::{absolute_base, relative_display};

#[derive(Deserialize, JsonSchema)]
pub struct ReadFileParameters {
    #[schemars(description = "Path to the file, relative to the website root.")]
    file_path: String,
}

/// A tool for reading the content of a file.
pub struct ReadFileTool {
    base_dir: PathBuf,
    parameter_schema: Value,
}

impl ReadFileTool {
    /// Creates a tool reading files below `base_dir`.
    #[inline]
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        ReadFileTool {
            base_dir: absolute_base(base_dir.as_ref()),
            parameter_schema: schema_for!(ReadFileParameters).to_value(),
        }
    }
}

impl Tool for ReadFileTool {
    type Input = ReadFileParameters;

    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn path_arguments(&self) -> &[&str] {
        &["file_path"]
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: ReadFileParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let base_dir = self.base_dir.clone();
        async move {
            let path = sandbox::resolve_path(&base_dir, &input.file_path)?;
            let display = relative_display(&base_dir, &path);
            let content = spawn_blocking(move || {
                if !path.is_file() {
                    return Err(ToolError::execution_error()
                        .with_reason(format!("File does not exist: {display}")));
                }
                Ok(fs::read_to_string(&path)?)
            })
            .await
            .map_err(|_| ToolError::execution_error().with_reason("Failed to read file"))??;

            let mut fields = Map::new();
            fields.insert("content".to_owned(), Value::String(content));
            Ok(fields)
        }
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct WriteFileParameters {
    #[schemars(description = "Path to the file, relative to the website root.")]
    file_path: String,
    #[schemars(description = "The complete new content of the file.")]
    content: String,
}

/// A tool for writing a file, creating missing parent directories.
pub struct WriteFileTool {
    base_dir: PathBuf,
    parameter_schema: Value,
}

impl WriteFileTool {
    /// Creates a tool writing files below `base_dir`.
    #[inline]
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        WriteFileTool {
            base_dir: absolute_base(base_dir.as_ref()),
            parameter_schema: schema_for!(WriteFileParameters).to_value(),
        }
    }
}

impl Tool for WriteFileTool {
    type Input = WriteFileParameters;

    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn path_arguments(&self) -> &[&str] {
        &["file_path"]
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: WriteFileParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let base_dir = self.base_dir.clone();
        async move {
            let path = sandbox::resolve_path(&base_dir, &input.file_path)?;
            let display_path = relative_display(&base_dir, &path);
            spawn_blocking(move || -> Result<(), ToolError> {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&path, input.content)?;
                Ok(())
            })
            .await
            .map_err(|_| ToolError::execution_error().with_reason("Failed to write file"))??;

            info!(file = %display_path, "file written");
            let mut fields = Map::new();
            fields.insert(
                "message".to_owned(),
                Value::String(format!("File written: {display_path}")),
            );
            Ok(fields)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let write = WriteFileTool::new(dir.path());
        let read = ReadFileTool::new(dir.path());

        let fields = write
            .execute(WriteFileParameters {
                file_path: "pages/about.html".to_owned(),
                content: "<h1>About</h1>".to_owned(),
            })
            .await
            .unwrap();
        assert_eq!(fields["message"], "File written: pages/about.html");

        let fields = read
            .execute(ReadFileParameters {
                file_path: "pages/about.html".to_owned(),
            })
            .await
            .unwrap();
        assert_eq!(fields["content"], "<h1>About</h1>");
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReadFileTool::new(dir.path())
            .execute(ReadFileParameters {
                file_path: "missing.html".to_owned(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "File does not exist: missing.html");
    }

    #[tokio::test]
    async fn test_write_outside_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = WriteFileTool::new(dir.path().join("site"))
            .execute(WriteFileParameters {
                file_path: "../escaped.html".to_owned(),
                content: String::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), sitebot_core::tool::ErrorKind::PermissionDenied);
        assert!(!dir.path().join("escaped.html").exists());
    }
}
