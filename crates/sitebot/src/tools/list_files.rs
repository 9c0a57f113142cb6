use std::fs;
use std::path::{Path, PathBuf};

use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Map, Value};
use sitebot_core::tool::{Error as ToolError, Tool, ToolResult, sandbox};
use tokio::task::spawn_blocking;

use super::{absolute_base, relative_display};

fn default_directory() -> String {
    ".".to_owned()
}

#[derive(Deserialize, JsonSchema)]
pub struct ListFilesParameters {
    #[serde(default = "default_directory")]
    #[schemars(
        description = "Directory to list, relative to the website root. Defaults to the root."
    )]
    directory: String,
    #[schemars(
        description = "Optional glob pattern relative to `directory`, such as `**/*.html`."
    )]
    pattern: Option<String>,
}

/// A tool for listing the files of a directory, optionally filtered by a
/// glob pattern.
pub struct ListFilesTool {
    base_dir: PathBuf,
    parameter_schema: Value,
}

impl ListFilesTool {
    /// Creates a tool listing files below `base_dir`.
    #[inline]
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        ListFilesTool {
            base_dir: absolute_base(base_dir.as_ref()),
            parameter_schema: schema_for!(ListFilesParameters).to_value(),
        }
    }
}

impl Tool for ListFilesTool {
    type Input = ListFilesParameters;

    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        r#"
List files in a directory of the website.
Paths are returned relative to the website root.
Supports glob patterns like *, ? and ** for recursive searches."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn path_arguments(&self) -> &[&str] {
        &["directory"]
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: ListFilesParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let base_dir = self.base_dir.clone();
        async move {
            let directory = sandbox::resolve_path(&base_dir, &input.directory)?;
            let files = spawn_blocking(move || match input.pattern {
                Some(pattern) => glob_files(&base_dir, &directory, &pattern),
                None => read_dir_files(&base_dir, &directory),
            })
            .await
            .map_err(|_| ToolError::execution_error().with_reason("Failed to list files"))??;

            let mut fields = Map::new();
            fields.insert(
                "files".to_owned(),
                Value::Array(files.into_iter().map(Value::String).collect()),
            );
            Ok(fields)
        }
    }
}

fn read_dir_files(base_dir: &Path, directory: &Path) -> Result<Vec<String>, ToolError> {
    let mut files = vec![];
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(relative_display(base_dir, &entry.path()));
        }
    }
    files.sort();
    Ok(files)
}

fn glob_files(
    base_dir: &Path,
    directory: &Path,
    pattern: &str,
) -> Result<Vec<String>, ToolError> {
    if Path::new(pattern).is_absolute() {
        return Err(ToolError::invalid_input()
            .with_reason("`pattern` must be relative to `directory`"));
    }
    let full_pattern = directory.join(pattern);
    let paths = glob::glob(&full_pattern.to_string_lossy())
        .map_err(|err| ToolError::invalid_input().with_reason(err.to_string()))?;

    let mut files = vec![];
    for path in paths.flatten() {
        // Patterns may climb out with `..`; those matches are dropped.
        let path = sandbox::normalize(&path);
        if path.starts_with(base_dir) && path.is_file() {
            files.push(relative_display(base_dir, &path));
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("index.html"), "").unwrap();
        fs::write(dir.path().join("about.html"), "").unwrap();
        fs::write(dir.path().join("css/main.css"), "").unwrap();
        dir
    }

    fn files(fields: &Map<String, Value>) -> Vec<&str> {
        fields["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_list_root() {
        let site = site();
        let tool = ListFilesTool::new(site.path());
        let fields = tool
            .execute(ListFilesParameters {
                directory: ".".to_owned(),
                pattern: None,
            })
            .await
            .unwrap();
        assert_eq!(files(&fields), ["about.html", "index.html"]);

        let fields = tool
            .execute(ListFilesParameters {
                directory: "css".to_owned(),
                pattern: None,
            })
            .await
            .unwrap();
        assert_eq!(files(&fields), ["css/main.css"]);
    }

    #[tokio::test]
    async fn test_list_with_pattern() {
        let site = site();
        let tool = ListFilesTool::new(site.path());
        let fields = tool
            .execute(ListFilesParameters {
                directory: ".".to_owned(),
                pattern: Some("**/*.css".to_owned()),
            })
            .await
            .unwrap();
        assert_eq!(files(&fields), ["css/main.css"]);

        let err = tool
            .execute(ListFilesParameters {
                directory: ".".to_owned(),
                pattern: Some("/etc/*".to_owned()),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), sitebot_core::tool::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_directory_defaults_to_root() {
        let input: ListFilesParameters = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(input.directory, ".");
        assert!(input.pattern.is_none());
    }
}
