//! Agent loop - the per-turn conversation state machine.
//!
//! One turn: provider call → final answer or pending invocations → execute all
//! invocations → feed results back → repeat, bounded by a round cap and a turn
//! deadline. The loop mutates the caller-owned conversation in place after
//! each completed state, so a dropped (cancelled) turn future retains
//! everything up to the last completed state.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, timeout_at};
use tracing::{info, warn};

use super::composer::ComposedToolset;
use super::synthesizer::RequestSynthesizer;
use crate::domain::conversation::{
    ConversationError, ConversationState, InvocationOutcome, StopReason, TokenUsage,
    ToolInvocation,
};
use crate::infrastructure::provider::{ModelConfig, ProviderAdapter, ProviderError};

pub const DEFAULT_MAX_ROUNDS: usize = 8;
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(600);

const TURN_LIMIT_NOTICE: &str = "Turn limit exceeded: tool execution stopped before the model \
     produced a final answer. Send another message to continue.";

#[derive(Debug, Clone)]
pub struct TurnOptions {
    pub max_rounds: usize,
    pub turn_timeout: Duration,
    /// When false the loop stops after the first provider call and hands
    /// pending invocations back to the caller instead of running them.
    pub run_tools: bool,
    /// Upstream Authorization value forwarded to the request synthesizer.
    pub authorization: Option<String>,
}

impl Default for TurnOptions {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            turn_timeout: DEFAULT_TURN_TIMEOUT,
            run_tools: true,
            authorization: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub assistant_text: Option<String>,
    /// Non-empty only in caller-managed mode.
    pub pending_invocations: Vec<ToolInvocation>,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
    /// Tool-execution rounds this turn used.
    pub rounds: usize,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Conversation(#[from] ConversationError),
}

impl AgentError {
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Provider(err) => err.user_message(),
            AgentError::Conversation(err) => {
                format!("The conversation history is inconsistent: {err}")
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Provider(err) => err.kind(),
            AgentError::Conversation(_) => "conversation_error",
        }
    }
}

#[derive(Clone)]
pub struct AgentRunner {
    synthesizer: Arc<RequestSynthesizer>,
}

impl AgentRunner {
    pub fn new(synthesizer: Arc<RequestSynthesizer>) -> Self {
        Self { synthesizer }
    }

    /// Run one full user turn. Provider errors abort the turn; the
    /// conversation keeps every turn appended before the failure.
    pub async fn run_turn(
        &self,
        adapter: &dyn ProviderAdapter,
        toolset: &ComposedToolset,
        conversation: &mut ConversationState,
        message: String,
        config: &ModelConfig,
        options: &TurnOptions,
    ) -> Result<TurnOutcome, AgentError> {
        info!(
            provider = adapter.id(),
            tools = toolset.len(),
            "Agent turn started"
        );
        conversation.push_user(message);
        let deadline = Instant::now() + options.turn_timeout;
        self.drive(adapter, toolset, conversation, config, options, deadline)
            .await
    }

    /// Resume a caller-managed turn: execute whatever invocations are still
    /// pending, then continue the loop with a provider call.
    pub async fn resume_turn(
        &self,
        adapter: &dyn ProviderAdapter,
        toolset: &ComposedToolset,
        conversation: &mut ConversationState,
        config: &ModelConfig,
        options: &TurnOptions,
    ) -> Result<TurnOutcome, AgentError> {
        let pending: Vec<ToolInvocation> = conversation
            .pending_invocations()
            .into_iter()
            .cloned()
            .collect();
        info!(
            provider = adapter.id(),
            pending = pending.len(),
            "Agent turn resumed"
        );
        let deadline = Instant::now() + options.turn_timeout;
        if !pending.is_empty() {
            let completed = self
                .execute_round(
                    toolset,
                    conversation,
                    &pending,
                    deadline,
                    options.authorization.as_deref(),
                )
                .await?;
            if !completed {
                return Ok(turn_limit_outcome(TokenUsage::default(), 1));
            }
        }
        self.drive(adapter, toolset, conversation, config, options, deadline)
            .await
    }

    async fn drive(
        &self,
        adapter: &dyn ProviderAdapter,
        toolset: &ComposedToolset,
        conversation: &mut ConversationState,
        config: &ModelConfig,
        options: &TurnOptions,
        deadline: Instant,
    ) -> Result<TurnOutcome, AgentError> {
        let mut usage = TokenUsage::default();
        let mut rounds = 0usize;

        loop {
            let reply = adapter.complete(conversation, toolset, config).await?;
            usage.add(reply.usage);
            conversation.push_assistant(reply.text.clone(), reply.invocations.clone())?;

            if reply.invocations.is_empty() {
                info!(rounds, "Agent turn completed with final answer");
                return Ok(TurnOutcome {
                    assistant_text: reply.text,
                    pending_invocations: Vec::new(),
                    stop_reason: reply.stop_reason,
                    usage,
                    rounds,
                });
            }

            if !options.run_tools {
                info!(
                    pending = reply.invocations.len(),
                    "Handing pending invocations back to the caller"
                );
                return Ok(TurnOutcome {
                    assistant_text: reply.text,
                    pending_invocations: reply.invocations,
                    stop_reason: reply.stop_reason,
                    usage,
                    rounds,
                });
            }

            if rounds >= options.max_rounds {
                warn!(rounds, "Agent turn hit the tool round cap");
                self.fail_invocations(
                    conversation,
                    &reply.invocations,
                    "turn_limit",
                    "the turn's tool round cap was reached before this invocation could run",
                )?;
                return Ok(turn_limit_outcome(usage, rounds));
            }
            rounds += 1;

            let completed = self
                .execute_round(
                    toolset,
                    conversation,
                    &reply.invocations,
                    deadline,
                    options.authorization.as_deref(),
                )
                .await?;
            if !completed {
                warn!(rounds, "Agent turn deadline expired during tool execution");
                return Ok(turn_limit_outcome(usage, rounds));
            }
        }
    }

    /// Execute all sibling invocations of one assistant turn concurrently and
    /// append one tool-result turn each; failures become error payloads, never
    /// early returns. Returns false when the turn deadline expired, in which
    /// case every invocation of the round is answered with an
    /// upstream-unavailable error first.
    async fn execute_round(
        &self,
        toolset: &ComposedToolset,
        conversation: &mut ConversationState,
        invocations: &[ToolInvocation],
        deadline: Instant,
        authorization: Option<&str>,
    ) -> Result<bool, AgentError> {
        let batch = join_all(invocations.iter().map(|invocation| {
            let synthesizer = Arc::clone(&self.synthesizer);
            async move {
                let outcome = match synthesizer
                    .execute(&invocation.tool, &invocation.arguments, toolset, authorization)
                    .await
                {
                    Ok(output) => InvocationOutcome::Success {
                        result: output.body,
                    },
                    Err(err) => {
                        warn!(
                            tool = invocation.tool.as_str(),
                            kind = err.kind(),
                            "Tool invocation failed"
                        );
                        InvocationOutcome::Error {
                            kind: err.kind().to_string(),
                            message: err.detail(),
                        }
                    }
                };
                (invocation.id.clone(), outcome)
            }
        }));

        match timeout_at(deadline, batch).await {
            Ok(results) => {
                for (id, outcome) in results {
                    conversation.push_tool_result(&id, outcome)?;
                }
                Ok(true)
            }
            Err(_) => {
                self.fail_invocations(
                    conversation,
                    invocations,
                    "upstream_unavailable",
                    "the turn deadline expired before this call completed",
                )?;
                Ok(false)
            }
        }
    }

    fn fail_invocations(
        &self,
        conversation: &mut ConversationState,
        invocations: &[ToolInvocation],
        kind: &str,
        message: &str,
    ) -> Result<(), AgentError> {
        for invocation in invocations {
            conversation.push_tool_result(
                &invocation.id,
                InvocationOutcome::Error {
                    kind: kind.to_string(),
                    message: message.to_string(),
                },
            )?;
        }
        Ok(())
    }
}

fn turn_limit_outcome(usage: TokenUsage, rounds: usize) -> TurnOutcome {
    TurnOutcome {
        assistant_text: Some(TURN_LIMIT_NOTICE.to_string()),
        pending_invocations: Vec::new(),
        stop_reason: StopReason::TurnLimit,
        usage,
        rounds,
    }
}
