//! The per-message workflow: classify, plan, execute, respond, persist.
//!
//! One instance serves all users; per-user locks serialize concurrent
//! messages for the same athlete so document writes never interleave. Model
//! failures degrade to a fixed fallback reply; only corrupt storage aborts a
//! request outright.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use repfuel_core::{AgentConfig, ConversationTurn, LlmConfig, UserDocument};
use repfuel_db::{DocumentStore, StoreError, UserLocks};

use crate::intent::{parse_intent, parse_plan, parse_reply, ActionPlan, Intent, Recommendation, ToolCallProposal};
use crate::llm::{ChatMessage, CompletionRequest, LlmClient};
use crate::prompts;
use crate::tools::ToolRegistry;

/// Reply used whenever the model pipeline fails mid-request.
pub const FALLBACK_REPLY: &str =
    "I had trouble processing that request. Please try again in a moment.";

const CLARIFY_FALLBACK: &str =
    "I want to get this right. Could you give me a bit more detail about what \
     you'd like me to log or update?";

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
    /// Opaque caller metadata, stored with the conversation turn as-is.
    pub context: BTreeMap<String, Value>,
}

impl ChatRequest {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), message: message.into(), context: BTreeMap::new() }
    }
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub response: String,
    pub recommendations: Vec<Recommendation>,
    /// Names of the tools that actually succeeded this turn.
    pub actions_taken: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Received,
    IntentAnalyzed,
    Planned,
    Executing,
    Responding,
    Done,
    Failed,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::IntentAnalyzed => "intent_analyzed",
            Self::Planned => "planned",
            Self::Executing => "executing",
            Self::Responding => "responding",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Outcome of one executed tool call, as handed to the reply prompt.
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    Success(Value),
    Failure(String),
}

pub struct WorkflowEngine {
    store: Arc<dyn DocumentStore>,
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    locks: UserLocks,
    agent: AgentConfig,
    intent_temperature: f32,
    response_temperature: f32,
}

impl WorkflowEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        llm: Arc<dyn LlmClient>,
        tools: ToolRegistry,
        agent: AgentConfig,
        llm_config: &LlmConfig,
    ) -> Self {
        Self {
            store,
            llm,
            tools,
            locks: UserLocks::new(),
            agent,
            intent_temperature: llm_config.intent_temperature,
            response_temperature: llm_config.response_temperature,
        }
    }

    /// Run one athlete message through the full workflow.
    ///
    /// Always returns a well-formed response unless the stored document is
    /// unreadable; every other failure degrades inside the pipeline.
    pub async fn handle_message(&self, request: ChatRequest) -> Result<ChatResponse, StoreError> {
        let _guard = self.locks.acquire(&request.user_id).await;
        let mut state = WorkflowState::Received;
        info!(
            event_name = "message_received",
            user_id = %request.user_id,
            message_chars = request.message.len(),
            "handling athlete message"
        );

        let document = self.store.get_or_create(&request.user_id).await?;

        let analysis = match self.analyze_intent(&document, &request).await {
            Ok(analysis) => analysis,
            Err(error) => {
                warn!(
                    event_name = "intent_analysis_failed",
                    user_id = %request.user_id,
                    error = %error,
                    "degrading to fallback reply"
                );
                return self.finish_degraded(&request, state).await;
            }
        };
        self.advance(&mut state, WorkflowState::IntentAnalyzed, &request.user_id);
        debug!(
            event_name = "intent_analyzed",
            user_id = %request.user_id,
            intent = ?analysis.intent,
            summary = analysis.summary.as_deref().unwrap_or(""),
        );

        let mut executed: Vec<(ToolCallProposal, ToolOutcome)> = Vec::new();
        let mut actions_taken: Vec<String> = Vec::new();
        let mut clarification: Option<String> = None;

        if analysis.intent == Intent::ToolInvocation {
            match self.plan(&document, &request).await {
                Ok(ActionPlan::Invoke(calls)) => {
                    self.advance(&mut state, WorkflowState::Planned, &request.user_id);
                    // An unknown tool name invalidates the whole plan; nothing
                    // runs on a plan the registry cannot fully honor.
                    if let Some(bad) = calls.iter().find(|call| !self.tools.contains(&call.tool)) {
                        warn!(
                            event_name = "plan_rejected",
                            user_id = %request.user_id,
                            tool = %bad.tool,
                            "plan names an unregistered tool"
                        );
                        clarification = Some(CLARIFY_FALLBACK.to_string());
                    } else {
                        self.advance(&mut state, WorkflowState::Executing, &request.user_id);
                        for call in calls {
                            let outcome = self.execute_call(&request.user_id, &call).await?;
                            if let ToolOutcome::Success(_) = outcome {
                                actions_taken.push(call.tool.clone());
                            }
                            executed.push((call, outcome));
                        }
                    }
                }
                Ok(ActionPlan::Clarify(question)) => {
                    self.advance(&mut state, WorkflowState::Planned, &request.user_id);
                    clarification = Some(question);
                }
                // A proposal we cannot parse means the athlete's request was
                // ambiguous; a failed model call means the pipeline is down.
                Err(crate::llm::LlmError::MalformedOutput(detail)) => {
                    warn!(
                        event_name = "planning_failed",
                        user_id = %request.user_id,
                        error = %detail,
                        "asking the athlete to clarify"
                    );
                    self.advance(&mut state, WorkflowState::Planned, &request.user_id);
                    clarification = Some(CLARIFY_FALLBACK.to_string());
                }
                Err(error) => {
                    warn!(
                        event_name = "planning_call_failed",
                        user_id = %request.user_id,
                        error = %error,
                        "degrading to fallback reply"
                    );
                    return self.finish_degraded(&request, state).await;
                }
            }
        } else {
            // Conversational turns skip planning and execution entirely.
            self.advance(&mut state, WorkflowState::Planned, &request.user_id);
        }

        self.advance(&mut state, WorkflowState::Responding, &request.user_id);
        let (response_text, recommendations) = match clarification {
            Some(question) => (question, Vec::new()),
            None => match self.compose_reply(&request, &executed).await {
                Ok(draft) => (draft.0, draft.1),
                Err(error) => {
                    warn!(
                        event_name = "reply_generation_failed",
                        user_id = %request.user_id,
                        error = %error,
                        "degrading to fallback reply"
                    );
                    let response =
                        self.persist_turn(&request, FALLBACK_REPLY, state, true).await?;
                    return Ok(ChatResponse { actions_taken, ..response });
                }
            },
        };

        let mut response = self.persist_turn(&request, &response_text, state, false).await?;
        response.recommendations = recommendations;
        response.actions_taken = actions_taken;
        Ok(response)
    }

    async fn analyze_intent(
        &self,
        document: &UserDocument,
        request: &ChatRequest,
    ) -> Result<crate::intent::IntentAnalysis, crate::llm::LlmError> {
        let prompt = prompts::intent_prompt(
            document,
            &request.message,
            &request.context,
            self.agent.prompt_recent_turns,
        );
        let raw = self.complete(prompt, self.intent_temperature).await?;
        parse_intent(&raw)
    }

    async fn plan(
        &self,
        document: &UserDocument,
        request: &ChatRequest,
    ) -> Result<ActionPlan, crate::llm::LlmError> {
        let prompt = prompts::planning_prompt(
            &self.tools,
            document,
            &request.message,
            self.agent.prompt_recent_turns,
        );
        let raw = self.complete(prompt, self.intent_temperature).await?;
        parse_plan(&raw)
    }

    /// Execute one planned call. Tool-level failures are folded into the
    /// outcome so the remaining calls still run; corrupt storage aborts.
    async fn execute_call(
        &self,
        user_id: &str,
        call: &ToolCallProposal,
    ) -> Result<ToolOutcome, StoreError> {
        // Presence was checked when the plan was accepted.
        let tool = match self.tools.get(&call.tool) {
            Some(tool) => tool,
            None => return Ok(ToolOutcome::Failure("unknown tool".to_string())),
        };
        match tool.execute(user_id, call.arguments.clone()).await {
            Ok(result) => {
                info!(
                    event_name = "tool_executed",
                    user_id = %user_id,
                    tool = %call.tool,
                );
                Ok(ToolOutcome::Success(result))
            }
            Err(crate::tools::ToolError::Store(store_error))
                if matches!(store_error, StoreError::Corruption { .. }) =>
            {
                Err(store_error)
            }
            Err(error) => {
                warn!(
                    event_name = "tool_failed",
                    user_id = %user_id,
                    tool = %call.tool,
                    error = %error,
                );
                Ok(ToolOutcome::Failure(error.user_message()))
            }
        }
    }

    async fn compose_reply(
        &self,
        request: &ChatRequest,
        executed: &[(ToolCallProposal, ToolOutcome)],
    ) -> Result<(String, Vec<Recommendation>), crate::llm::LlmError> {
        // Reload so the reply sees the document the tools just wrote.
        let document = self
            .store
            .get_or_create(&request.user_id)
            .await
            .map_err(|err| crate::llm::LlmError::Transport(err.to_string()))?;
        let prompt = prompts::response_prompt(
            &document,
            &request.message,
            executed,
            self.agent.prompt_recent_turns,
            self.agent.max_recommendations,
        );
        let raw = self.complete(prompt, self.response_temperature).await?;
        let mut draft = parse_reply(&raw, self.agent.max_recommendations)?;
        draft.response = scrub_identifier(&draft.response, &request.user_id);
        for recommendation in &mut draft.recommendations {
            recommendation.title = scrub_identifier(&recommendation.title, &request.user_id);
            recommendation.message = scrub_identifier(&recommendation.message, &request.user_id);
        }
        Ok((draft.response, draft.recommendations))
    }

    async fn complete(
        &self,
        prompt: String,
        temperature: f32,
    ) -> Result<String, crate::llm::LlmError> {
        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system(prompts::SYSTEM_PROMPT),
                ChatMessage::user(prompt),
            ],
            temperature,
        };
        self.llm.complete(request).await
    }

    async fn finish_degraded(
        &self,
        request: &ChatRequest,
        state: WorkflowState,
    ) -> Result<ChatResponse, StoreError> {
        self.persist_turn(request, FALLBACK_REPLY, state, true).await
    }

    /// Append the turn to the conversation history and save. The turn is
    /// recorded even on the degraded path so the athlete's message survives.
    async fn persist_turn(
        &self,
        request: &ChatRequest,
        response_text: &str,
        mut state: WorkflowState,
        degraded: bool,
    ) -> Result<ChatResponse, StoreError> {
        let mut document = self.store.get_or_create(&request.user_id).await?;
        document.ai_context.push_turn(
            ConversationTurn {
                timestamp: Utc::now(),
                user_message: request.message.clone(),
                agent_response: response_text.to_string(),
                context: request.context.clone(),
            },
            self.agent.conversation_history_cap,
        );
        self.store.save(&mut document).await?;

        let terminal = if degraded { WorkflowState::Failed } else { WorkflowState::Done };
        self.advance(&mut state, terminal, &request.user_id);
        Ok(ChatResponse {
            response: response_text.to_string(),
            recommendations: Vec::new(),
            actions_taken: Vec::new(),
        })
    }

    fn advance(&self, state: &mut WorkflowState, next: WorkflowState, user_id: &str) {
        debug!(
            event_name = "workflow_transition",
            user_id = %user_id,
            from = state.as_str(),
            to = next.as_str(),
        );
        *state = next;
    }
}

/// Internal identifiers never reach the athlete; any echo of the raw user id
/// is rewritten before the reply leaves the engine.
fn scrub_identifier(text: &str, user_id: &str) -> String {
    if user_id.is_empty() || !text.contains(user_id) {
        return text.to_string();
    }
    text.replace(user_id, "you")
}
