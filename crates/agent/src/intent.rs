//! Parsing of the structured JSON the model is asked to emit.
//!
//! Each workflow phase expects a specific shape; anything that does not parse
//! is a hard error at that phase, never silently patched up.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::LlmError;

/// Coarse classification of an incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    ToolInvocation,
    InformationalQuery,
    GeneralConversation,
}

#[derive(Debug, Clone)]
pub struct IntentAnalysis {
    pub intent: Intent,
    pub summary: Option<String>,
}

/// One tool call the model proposes. Arguments stay opaque JSON until the
/// tool itself validates them.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallProposal {
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Planner output: either a batch of tool calls or a request for more detail.
#[derive(Debug, Clone)]
pub enum ActionPlan {
    Invoke(Vec<ToolCallProposal>),
    Clarify(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub message: String,
}

/// The reply phase's parsed output before post-processing.
#[derive(Debug, Clone)]
pub struct ReplyDraft {
    pub response: String,
    pub recommendations: Vec<Recommendation>,
}

/// Models often wrap JSON in markdown fences despite instructions; peel those
/// off before parsing, but never repair the JSON itself.
fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    unfenced.trim()
}

pub fn parse_intent(raw: &str) -> Result<IntentAnalysis, LlmError> {
    #[derive(Deserialize)]
    struct Wire {
        intent: String,
        #[serde(default)]
        summary: Option<String>,
    }

    let wire: Wire = serde_json::from_str(extract_json(raw))
        .map_err(|err| LlmError::MalformedOutput(format!("intent analysis: {err}")))?;

    let intent = match wire.intent.trim() {
        "tool_invocation" => Intent::ToolInvocation,
        "informational_query" => Intent::InformationalQuery,
        "general_conversation" => Intent::GeneralConversation,
        other => {
            return Err(LlmError::MalformedOutput(format!(
                "intent analysis: unknown intent `{other}`"
            )))
        }
    };

    Ok(IntentAnalysis { intent, summary: wire.summary })
}

pub fn parse_plan(raw: &str) -> Result<ActionPlan, LlmError> {
    #[derive(Deserialize)]
    struct Wire {
        #[serde(default)]
        tool_calls: Vec<ToolCallProposal>,
        #[serde(default)]
        clarification: Option<String>,
    }

    let wire: Wire = serde_json::from_str(extract_json(raw))
        .map_err(|err| LlmError::MalformedOutput(format!("action plan: {err}")))?;

    if let Some(question) = wire.clarification {
        if question.trim().is_empty() {
            return Err(LlmError::MalformedOutput(
                "action plan: empty clarification".into(),
            ));
        }
        return Ok(ActionPlan::Clarify(question));
    }
    if wire.tool_calls.is_empty() {
        return Err(LlmError::MalformedOutput(
            "action plan: neither tool_calls nor clarification present".into(),
        ));
    }
    Ok(ActionPlan::Invoke(wire.tool_calls))
}

pub fn parse_reply(raw: &str, max_recommendations: usize) -> Result<ReplyDraft, LlmError> {
    #[derive(Deserialize)]
    struct Wire {
        response: String,
        #[serde(default)]
        recommendations: Vec<Recommendation>,
    }

    let mut wire: Wire = serde_json::from_str(extract_json(raw))
        .map_err(|err| LlmError::MalformedOutput(format!("reply: {err}")))?;

    if wire.response.trim().is_empty() {
        return Err(LlmError::MalformedOutput("reply: empty response text".into()));
    }
    wire.recommendations.truncate(max_recommendations);

    Ok(ReplyDraft { response: wire.response, recommendations: wire.recommendations })
}
