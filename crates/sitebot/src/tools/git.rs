use std::path::{Path, PathBuf};

use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Map, Value};
use sitebot_core::tool::{Error as ToolError, Tool, ToolResult, sandbox};
use tokio::process::Command;

use super::absolute_base;

fn default_branch() -> String {
    "main".to_owned()
}

#[derive(Deserialize, JsonSchema)]
pub struct GitAddParameters {
    #[schemars(description = "Repository directory, relative to the website root.")]
    repo_dir: String,
}

#[derive(Deserialize, JsonSchema)]
pub struct GitCommitParameters {
    #[schemars(description = "Repository directory, relative to the website root.")]
    repo_dir: String,
    #[schemars(description = "The commit message.")]
    message: String,
}

#[derive(Deserialize, JsonSchema)]
pub struct GitPushParameters {
    #[schemars(description = "Repository directory, relative to the website root.")]
    repo_dir: String,
    #[serde(default = "default_branch")]
    #[schemars(description = "Branch to push to `origin`, default to `main`.")]
    branch: String,
}

/// A tool staging every change of a repository (`git add .`).
pub struct GitAddTool {
    base_dir: PathBuf,
    parameter_schema: Value,
}

/// A tool committing the staged changes of a repository.
pub struct GitCommitTool {
    base_dir: PathBuf,
    parameter_schema: Value,
}

/// A tool pushing a branch of a repository to `origin`.
pub struct GitPushTool {
    base_dir: PathBuf,
    parameter_schema: Value,
}

impl GitAddTool {
    /// Creates a tool for repositories below `base_dir`.
    #[inline]
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        GitAddTool {
            base_dir: absolute_base(base_dir.as_ref()),
            parameter_schema: schema_for!(GitAddParameters).to_value(),
        }
    }
}

impl GitCommitTool {
    /// Creates a tool for repositories below `base_dir`.
    #[inline]
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        GitCommitTool {
            base_dir: absolute_base(base_dir.as_ref()),
            parameter_schema: schema_for!(GitCommitParameters).to_value(),
        }
    }
}

impl GitPushTool {
    /// Creates a tool for repositories below `base_dir`.
    #[inline]
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        GitPushTool {
            base_dir: absolute_base(base_dir.as_ref()),
            parameter_schema: schema_for!(GitPushParameters).to_value(),
        }
    }
}

impl Tool for GitAddTool {
    type Input = GitAddParameters;

    fn name(&self) -> &str {
        "git_add"
    }

    fn description(&self) -> &str {
        "Stage all changes in the repository"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn path_arguments(&self) -> &[&str] {
        &["repo_dir"]
    }

    fn execute(
        &self,
        input: GitAddParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        run_git(
            self.base_dir.clone(),
            input.repo_dir,
            vec!["add".to_owned(), ".".to_owned()],
        )
    }
}

impl Tool for GitCommitTool {
    type Input = GitCommitParameters;

    fn name(&self) -> &str {
        "git_commit"
    }

    fn description(&self) -> &str {
        "Commit the staged changes with a message"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn path_arguments(&self) -> &[&str] {
        &["repo_dir"]
    }

    fn execute(
        &self,
        input: GitCommitParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        run_git(
            self.base_dir.clone(),
            input.repo_dir,
            vec!["commit".to_owned(), "-m".to_owned(), input.message],
        )
    }
}

impl Tool for GitPushTool {
    type Input = GitPushParameters;

    fn name(&self) -> &str {
        "git_push"
    }

    fn description(&self) -> &str {
        "Push a branch to the `origin` remote"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn path_arguments(&self) -> &[&str] {
        &["repo_dir"]
    }

    fn execute(
        &self,
        input: GitPushParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        run_git(
            self.base_dir.clone(),
            input.repo_dir,
            vec!["push".to_owned(), "origin".to_owned(), input.branch],
        )
    }
}

async fn run_git(
    base_dir: PathBuf,
    repo_dir: String,
    args: Vec<String>,
) -> ToolResult {
    let repo_dir = sandbox::resolve_path(&base_dir, &repo_dir)?;
    debug!(repo_dir = %repo_dir.display(), "running git {}", args.join(" "));

    let output = Command::new("git")
        .args(&args)
        .current_dir(&repo_dir)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        let reason = if stderr.is_empty() {
            format!("git {} failed with {}", args[0], output.status)
        } else {
            stderr
        };
        return Err(ToolError::execution_error().with_reason(reason));
    }

    let mut result = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.stderr.is_empty() {
        // `git push` reports progress on stderr even when it succeeds.
        result.push_str(&String::from_utf8_lossy(&output.stderr));
    }
    let mut fields = Map::new();
    fields.insert("output".to_owned(), Value::String(result));
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    async fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .status()
            .await
            .unwrap();
        assert!(status.success(), "git {args:?}");
    }

    #[tokio::test]
    async fn test_add_and_commit() {
        let dir = tempfile::tempdir().unwrap();
        git(dir.path(), &["init", "-q"]).await;
        git(dir.path(), &["config", "user.email", "bot@example.com"]).await;
        git(dir.path(), &["config", "user.name", "Bot"]).await;
        fs::write(dir.path().join("index.html"), "<h1>Hi</h1>").unwrap();

        GitAddTool::new(dir.path())
            .execute(GitAddParameters {
                repo_dir: ".".to_owned(),
            })
            .await
            .unwrap();
        let fields = GitCommitTool::new(dir.path())
            .execute(GitCommitParameters {
                repo_dir: ".".to_owned(),
                message: "Update tagline".to_owned(),
            })
            .await
            .unwrap();
        assert!(fields["output"].as_str().unwrap().contains("Update tagline"));
    }

    #[tokio::test]
    async fn test_failure_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        git(dir.path(), &["init", "-q"]).await;

        // Nothing to push to: there is no `origin` remote.
        let err = GitPushTool::new(dir.path())
            .execute(GitPushParameters {
                repo_dir: ".".to_owned(),
                branch: default_branch(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), sitebot_core::tool::ErrorKind::ExecutionError);
        assert!(!err.reason().is_empty());
    }

    #[tokio::test]
    async fn test_repo_dir_outside_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = GitAddTool::new(dir.path().join("site"))
            .execute(GitAddParameters {
                repo_dir: "..".to_owned(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), sitebot_core::tool::ErrorKind::PermissionDenied);
    }
}
