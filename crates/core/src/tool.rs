//! Tool call supports.

mod error;
pub(crate) mod object;
mod registry;
pub mod sandbox;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub use error::{Error, ErrorKind};
pub(crate) use registry::panic_message;
pub use registry::Registry;

/// The result of a tool call: the fields of a successful result, or why it
/// failed.
pub type ToolResult = Result<Map<String, Value>, Error>;

/// A tool that can be requested by the conversation partner.
///
/// Implementations of this trait should be stateless, and may not maintain any
/// internal state.
///
/// The tool can be context-aware, meaning it can access additional information
/// about the current execution context, such as the base directory it works
/// in. To do this, make the context an immutable state of the tool, which can
/// be set during initialization, and copy it when executing.
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool.
    fn parameter_schema(&self) -> &Value;

    /// Returns the argument keys that hold filesystem paths.
    ///
    /// The registry resolves those against its base directory before the
    /// tool sees them, and refuses the call when a path escapes it. The
    /// input therefore receives absolute paths.
    fn path_arguments(&self) -> &[&str] {
        &[]
    }

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
