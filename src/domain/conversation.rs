//! Provider-neutral conversation state.
//!
//! The state is one flat sequence of turns; translation into either wire
//! protocol happens only at the provider adapter boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;
use utoipa::ToSchema;

/// One request by the model to call a specific tool with specific arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ToolInvocation {
    pub id: String,
    pub tool: String,
    #[schema(value_type = Object)]
    pub arguments: Value,
}

/// What came back for one invocation. Failures are payloads, not exceptions:
/// the model always receives a result for every invocation it requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvocationOutcome {
    Success {
        #[schema(value_type = Object)]
        result: Value,
    },
    Error {
        kind: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    User {
        text: String,
    },
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        invocations: Vec<ToolInvocation>,
    },
    ToolResult {
        invocation_id: String,
        outcome: InvocationOutcome,
    },
}

/// Why the provider (or the loop itself) stopped producing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    TurnLimit,
    Unspecified,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("invocation id '{0}' already exists in this conversation")]
    DuplicateInvocationId(String),
    #[error("tool result references unknown invocation id '{0}'")]
    UnknownInvocationId(String),
    #[error("invocation '{0}' already has a result")]
    DuplicateResult(String),
}

/// Ordered turns plus the counter backing synthesized invocation ids for wire
/// protocols that omit them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ConversationState {
    pub turns: Vec<Turn>,
    #[serde(default)]
    next_invocation_seq: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::User { text: text.into() });
    }

    /// Append an assistant turn. Invocation ids must be unique within the
    /// conversation.
    pub fn push_assistant(
        &mut self,
        text: Option<String>,
        invocations: Vec<ToolInvocation>,
    ) -> Result<(), ConversationError> {
        let known = self.invocation_ids();
        let mut fresh = HashSet::new();
        for invocation in &invocations {
            if known.contains(invocation.id.as_str()) || !fresh.insert(invocation.id.as_str()) {
                return Err(ConversationError::DuplicateInvocationId(
                    invocation.id.clone(),
                ));
            }
        }
        drop(known);
        self.turns.push(Turn::Assistant { text, invocations });
        Ok(())
    }

    /// Append a tool-result turn. The referenced invocation must have been
    /// emitted by a preceding assistant turn and must not be answered yet.
    pub fn push_tool_result(
        &mut self,
        invocation_id: &str,
        outcome: InvocationOutcome,
    ) -> Result<(), ConversationError> {
        if !self.invocation_ids().contains(invocation_id) {
            return Err(ConversationError::UnknownInvocationId(
                invocation_id.to_string(),
            ));
        }
        if self.answered_ids().contains(invocation_id) {
            return Err(ConversationError::DuplicateResult(invocation_id.to_string()));
        }
        self.turns.push(Turn::ToolResult {
            invocation_id: invocation_id.to_string(),
            outcome,
        });
        Ok(())
    }

    /// Invocations from assistant turns that have no tool-result turn yet.
    pub fn pending_invocations(&self) -> Vec<&ToolInvocation> {
        let answered = self.answered_ids();
        self.turns
            .iter()
            .flat_map(|turn| match turn {
                Turn::Assistant { invocations, .. } => invocations.iter(),
                _ => [].iter(),
            })
            .filter(|invocation| !answered.contains(invocation.id.as_str()))
            .collect()
    }

    /// Mint the next synthesized invocation id. Monotonic per conversation, so
    /// ids stay unique across turns even when a wire protocol never supplies
    /// any.
    pub fn next_invocation_id(&mut self) -> String {
        self.next_invocation_seq += 1;
        format!("call_{}", self.next_invocation_seq)
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn invocation_ids(&self) -> HashSet<&str> {
        self.turns
            .iter()
            .flat_map(|turn| match turn {
                Turn::Assistant { invocations, .. } => invocations.iter(),
                _ => [].iter(),
            })
            .map(|invocation| invocation.id.as_str())
            .collect()
    }

    fn answered_ids(&self) -> HashSet<&str> {
        self.turns
            .iter()
            .filter_map(|turn| match turn {
                Turn::ToolResult { invocation_id, .. } => Some(invocation_id.as_str()),
                _ => None,
            })
            .collect()
    }
}
