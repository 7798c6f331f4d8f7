pub mod agent;
pub mod compiler;
pub mod composer;
pub mod registry;
pub mod synthesizer;

pub use agent::{AgentError, AgentRunner, TurnOptions, TurnOutcome};
pub use compiler::{CompileError, compile, compile_selected, default_tool_name};
pub use composer::{ComposeError, ComposedTool, ComposedToolset, compose};
pub use registry::{DeployedServer, RegistryError, ServerRegistry};
pub use synthesizer::{ExecuteError, RequestSynthesizer, ToolCallOutput};
