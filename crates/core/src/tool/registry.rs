use std::any::Any;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value, json};
use sitebot_model::ToolDescriptor;
use tracing::Instrument;

use super::object::{ToolObject, ToolObjectImpl};
use super::{Error, Tool, sandbox};

/// An object that owns the toolset and dispatches requests from the
/// conversation partner.
///
/// Every outcome, including a failed or panicking tool, is reported as a
/// JSON object with a `success` flag. Nothing is propagated to the caller.
pub struct Registry {
    base_dir: PathBuf,
    tools: BTreeMap<String, Arc<dyn ToolObject>>,
}

impl Registry {
    /// Creates an empty registry confining path arguments to `base_dir`.
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        let base_dir = base_dir.into();
        let base_dir = match std::path::absolute(&base_dir) {
            Ok(absolute) => sandbox::normalize(&absolute),
            Err(err) => {
                warn!(
                    base_dir = %base_dir.display(),
                    "failed to make base directory absolute: {err}"
                );
                base_dir
            }
        };
        Self {
            base_dir,
            tools: BTreeMap::new(),
        }
    }

    pub(crate) fn with_tools<P: Into<PathBuf>>(
        base_dir: P,
        tools: Vec<Arc<dyn ToolObject>>,
    ) -> Self {
        let mut registry = Self::new(base_dir);
        for tool in tools {
            registry.tools.insert(tool.name().to_owned(), tool);
        }
        registry
    }

    /// Returns the directory path arguments are confined to.
    #[inline]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Registers a tool, replacing any tool with the same name.
    pub fn add_tool<T: Tool>(&mut self, tool: T) {
        let name = tool.name().to_owned();
        if self.tools.insert(name, Arc::new(ToolObjectImpl(tool))).is_some() {
            debug!("replaced a tool with the same name");
        }
    }

    /// Returns the descriptors of the registered tools, sorted by name.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
            })
            .collect()
    }

    /// Returns the parameter schema of the named tool.
    pub fn parameter_schema(&self, name: &str) -> Option<&Value> {
        self.tools.get(name).map(|tool| tool.parameter_schema())
    }

    /// Executes the named tool and reports the outcome.
    ///
    /// The tool runs on its own task, which is awaited right away, so a
    /// panic inside it becomes a failed result.
    pub async fn execute(&self, name: &str, arguments: Value) -> Value {
        let Some(tool) = self.tools.get(name) else {
            warn!("tool not found: {name}");
            return failure(format!("Tool '{name}' not found"));
        };

        let arguments = match self.resolve_paths(tool.as_ref(), arguments) {
            Ok(arguments) => arguments,
            Err(err) => {
                warn!(tool = name, "rejected tool call: {err}");
                return failure(err.reason());
            }
        };
        trace!(tool = name, "executing with args: {arguments:?}");

        let future = tool.execute(arguments);
        let span = debug_span!("tool execute", tool = name);
        let outcome = tokio::spawn(future.instrument(span)).await;
        match outcome {
            Ok(Ok(fields)) => {
                let mut result = fields;
                result.insert("success".to_owned(), Value::Bool(true));
                Value::Object(result)
            }
            Ok(Err(err)) => {
                debug!(tool = name, "tool failed: {err}");
                failure(err.reason())
            }
            Err(err) => {
                let message = if err.is_panic() {
                    panic_message(err.into_panic())
                } else {
                    err.to_string()
                };
                error!(tool = name, "tool panicked: {message}");
                failure(format!("Tool '{name}' panicked: {message}"))
            }
        }
    }

    fn resolve_paths(&self, tool: &dyn ToolObject, arguments: Value) -> Result<Value, Error> {
        let path_arguments = tool.path_arguments();
        if path_arguments.is_empty() {
            return Ok(arguments);
        }
        let Value::Object(mut arguments) = arguments else {
            // Let the input decoder report the wrong shape.
            return Ok(arguments);
        };
        for key in path_arguments {
            if let Some(Value::String(path)) = arguments.get(*key) {
                let resolved = sandbox::resolve_path(&self.base_dir, path)?;
                let resolved = resolved.to_string_lossy().into_owned();
                arguments.insert((*key).to_owned(), Value::String(resolved));
            }
        }
        Ok(Value::Object(arguments))
    }
}

fn failure<S: Into<String>>(message: S) -> Value {
    json!({ "success": false, "message": message.into() })
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}
