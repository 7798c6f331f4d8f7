pub mod conversation;
pub mod endpoint;
pub mod tool;

pub use conversation::{
    ConversationError, ConversationState, InvocationOutcome, StopReason, TokenUsage,
    ToolInvocation, Turn,
};
pub use endpoint::{EndpointDescriptor, ParameterLocation, ParameterSpec, ValueType};
pub use tool::{ParameterContract, ToolDefinition};
