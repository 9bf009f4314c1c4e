//! Prompt assembly for the three model phases.
//!
//! Prompts carry a compact excerpt of the user's document rather than the
//! whole thing, plus the most recent conversation turns. The raw `user_id`
//! is deliberately never placed in any prompt.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use repfuel_core::UserDocument;

use crate::intent::ToolCallProposal;
use crate::tools::ToolRegistry;
use crate::workflow::ToolOutcome;

pub const SYSTEM_PROMPT: &str = "\
You are a friendly, knowledgeable fitness and nutrition coach. You help \
athletes log workouts and meals, set goals, and plan their training. Be \
encouraging and concrete. Ground every statement in the athlete data you are \
given; never invent numbers. When asked to act, you act through the tools \
you are offered and nothing else. Always answer with exactly the JSON shape \
the current instruction asks for, with no surrounding prose.";

/// Compact view of the document for prompting: profile, goals and the most
/// recent logged day, which is what the coach usually needs to reason about.
pub fn document_excerpt(document: &UserDocument) -> Value {
    let latest_day = document
        .nutrition
        .daily_logs
        .iter()
        .max_by_key(|day| day.date)
        .map(|day| {
            json!({
                "date": day.date,
                "totals": day.daily_totals,
                "meals_logged": day.meals.len(),
            })
        });
    let recent_workouts: Vec<Value> = document
        .workouts
        .logged_workouts
        .iter()
        .rev()
        .take(3)
        .map(|entry| {
            json!({
                "type": entry.workout_type,
                "duration_minutes": entry.duration_minutes,
                "date": entry.date,
            })
        })
        .collect();

    json!({
        "profile": document.profile,
        "goals": document.goals,
        "latest_nutrition_day": latest_day,
        "recent_workouts": recent_workouts,
        "upcoming_items": document.calendar.scheduled_items.len(),
    })
}

fn render_history(document: &UserDocument, recent_turns: usize) -> String {
    let turns = document.ai_context.recent_turns(recent_turns);
    if turns.is_empty() {
        return "(no prior conversation)".to_string();
    }
    let mut out = String::new();
    for turn in turns {
        out.push_str(&format!(
            "athlete: {}\ncoach: {}\n",
            turn.user_message, turn.agent_response
        ));
    }
    out
}

fn render_context(context: &BTreeMap<String, Value>) -> String {
    if context.is_empty() {
        return String::new();
    }
    format!(
        "\nCaller-supplied context (treat as opaque metadata):\n{}\n",
        serde_json::to_string(context).unwrap_or_default()
    )
}

pub fn intent_prompt(
    document: &UserDocument,
    message: &str,
    context: &BTreeMap<String, Value>,
    recent_turns: usize,
) -> String {
    format!(
        "Classify the athlete's latest message.\n\n\
         Athlete data:\n{excerpt}\n\n\
         Recent conversation:\n{history}\n{ctx}\n\
         Latest message:\n{message}\n\n\
         Respond with JSON only:\n\
         {{\"intent\": \"tool_invocation\" | \"informational_query\" | \"general_conversation\", \
         \"summary\": \"<one sentence>\"}}\n\
         Use \"tool_invocation\" when the athlete wants something logged, \
         updated, scheduled, or retrieved from their data.",
        excerpt = document_excerpt(document),
        history = render_history(document, recent_turns),
        ctx = render_context(context),
        message = message,
    )
}

pub fn planning_prompt(
    registry: &ToolRegistry,
    document: &UserDocument,
    message: &str,
    recent_turns: usize,
) -> String {
    let mut catalog = String::new();
    for (name, description) in registry.catalog() {
        catalog.push_str(&format!("- {name}: {description}\n"));
    }
    format!(
        "Plan the tool calls needed to fulfil the athlete's request.\n\n\
         Available tools:\n{catalog}\n\
         Athlete data:\n{excerpt}\n\n\
         Recent conversation:\n{history}\n\
         Request:\n{message}\n\n\
         Respond with JSON only, one of:\n\
         {{\"tool_calls\": [{{\"tool\": \"<name>\", \"arguments\": {{...}}}}]}}\n\
         {{\"clarification\": \"<question for the athlete>\"}}\n\
         Ask for clarification instead of guessing missing required fields.",
        catalog = catalog,
        excerpt = document_excerpt(document),
        history = render_history(document, recent_turns),
        message = message,
    )
}

pub fn response_prompt(
    document: &UserDocument,
    message: &str,
    executed: &[(ToolCallProposal, ToolOutcome)],
    recent_turns: usize,
    max_recommendations: usize,
) -> String {
    let outcomes: Vec<Value> = executed
        .iter()
        .map(|(call, outcome)| match outcome {
            ToolOutcome::Success(result) => json!({
                "tool": call.tool,
                "status": "ok",
                "result": result,
            }),
            ToolOutcome::Failure(reason) => json!({
                "tool": call.tool,
                "status": "failed",
                "reason": reason,
            }),
        })
        .collect();

    format!(
        "Write the coach's reply to the athlete.\n\n\
         Athlete data (after any updates):\n{excerpt}\n\n\
         Recent conversation:\n{history}\n\
         Athlete's message:\n{message}\n\n\
         Actions attempted this turn:\n{outcomes}\n\n\
         Acknowledge what succeeded, be honest about anything that failed, \
         and never claim an action happened that did not. Respond with JSON \
         only:\n\
         {{\"response\": \"<reply>\", \"recommendations\": \
         [{{\"title\": \"<short>\", \"message\": \"<concrete suggestion>\"}}]}}\n\
         At most {max_recommendations} recommendations; an empty list is fine.",
        excerpt = document_excerpt(document),
        history = render_history(document, recent_turns),
        message = message,
        outcomes = serde_json::to_string(&outcomes).unwrap_or_default(),
        max_recommendations = max_recommendations,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use repfuel_core::ConversationTurn;

    #[test]
    fn excerpt_carries_profile_and_goals() {
        let mut document = UserDocument::new("u-1");
        document.profile.name = Some("Alex".into());
        let excerpt = document_excerpt(&document);
        assert_eq!(excerpt["profile"]["name"], "Alex");
        assert!(excerpt.get("goals").is_some());
    }

    #[test]
    fn intent_prompt_includes_history_and_message() {
        let mut document = UserDocument::new("u-1");
        document.ai_context.push_turn(
            ConversationTurn {
                timestamp: chrono::Utc::now(),
                user_message: "hi".into(),
                agent_response: "hello!".into(),
                context: Default::default(),
            },
            50,
        );
        let prompt = intent_prompt(&document, "log my run", &Default::default(), 5);
        assert!(prompt.contains("athlete: hi"));
        assert!(prompt.contains("log my run"));
        assert!(prompt.contains("tool_invocation"));
    }

    #[test]
    fn history_placeholder_when_empty() {
        let document = UserDocument::new("u-1");
        let prompt = intent_prompt(&document, "hey", &Default::default(), 5);
        assert!(prompt.contains("(no prior conversation)"));
    }
}
