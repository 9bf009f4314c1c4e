//! The conversational coaching agent.
//!
//! Turns a free-text athlete message into structured effects on that
//! athlete's document and a grounded natural-language reply. The pipeline is
//! intent analysis, action planning, tool execution, and reply generation,
//! each phase a separate model call with a narrow JSON contract.

pub mod intent;
pub mod llm;
pub mod prompts;
pub mod tools;
pub mod workflow;

pub use intent::{ActionPlan, Intent, IntentAnalysis, Recommendation, ToolCallProposal};
pub use llm::{ChatMessage, CompletionRequest, LlmClient, LlmError, OpenAiCompatClient, Role, ScriptedLlm};
pub use tools::{Tool, ToolError, ToolRegistry};
pub use workflow::{
    ChatRequest, ChatResponse, ToolOutcome, WorkflowEngine, WorkflowState, FALLBACK_REPLY,
};
