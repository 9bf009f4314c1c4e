//! End-to-end workflow scenarios against the in-memory store with a scripted
//! model, covering the happy path, clarification, degradation, and failure
//! isolation.

use std::sync::Arc;

use serde_json::json;

use repfuel_agent::{
    ChatRequest, LlmError, ScriptedLlm, ToolRegistry, WorkflowEngine, FALLBACK_REPLY,
};
use repfuel_core::{AppConfig, PrimaryGoal};
use repfuel_db::{DocumentStore, InMemoryDocumentStore, StoreError};

fn engine_with(
    store: Arc<InMemoryDocumentStore>,
    llm: Arc<ScriptedLlm>,
    history_cap: usize,
) -> WorkflowEngine {
    let config = AppConfig::default();
    let mut agent = config.agent;
    agent.conversation_history_cap = history_cap;
    let tools = ToolRegistry::standard(store.clone(), config.macros.clone());
    WorkflowEngine::new(store, llm, tools, agent, &config.llm)
}

fn engine(store: Arc<InMemoryDocumentStore>, llm: Arc<ScriptedLlm>) -> WorkflowEngine {
    engine_with(store, llm, 50)
}

fn intent(kind: &str) -> String {
    json!({"intent": kind}).to_string()
}

fn reply(text: &str) -> String {
    json!({"response": text, "recommendations": []}).to_string()
}

#[tokio::test]
async fn new_athlete_onboarding_sets_profile_and_consistent_targets() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let llm = Arc::new(ScriptedLlm::with_responses([
        intent("tool_invocation"),
        json!({
            "tool_calls": [
                {"tool": "update_profile", "arguments": {
                    "age": 28, "gender": "male", "height_cm": 180.0,
                    "weight_kg": 75.0, "activity_level": "moderately_active"
                }},
                {"tool": "set_goal", "arguments": {"primary_goal": "endurance"}}
            ]
        })
        .to_string(),
        json!({
            "response": "You're all set, alex_1! I built you an endurance plan.",
            "recommendations": [
                {"title": "Fuel your long runs", "message": "Carbs before sessions over an hour."}
            ]
        })
        .to_string(),
    ]));
    let engine = engine(store.clone(), llm);

    let response = engine
        .handle_message(ChatRequest::new(
            "alex_1",
            "I'm 28, male, 180cm, 75kg, moderately active. I want to train for endurance.",
        ))
        .await
        .unwrap();

    assert_eq!(response.actions_taken, vec!["update_profile", "set_goal"]);
    assert_eq!(response.recommendations.len(), 1);
    // The raw user id never leaks into the reply.
    assert!(!response.response.contains("alex_1"));
    assert!(response.response.contains("you"));

    let document = store.get_or_create("alex_1").await.unwrap();
    assert_eq!(document.profile.weight_kg, Some(75.0));
    assert_eq!(document.goals.primary_goal, PrimaryGoal::Endurance);
    // Mifflin-St Jeor at 75 kg / 180 cm / 28 y, moderately active.
    let target = document.goals.daily_calorie_target.unwrap();
    assert_eq!(target, 2697.0);
    let macros = document.goals.macro_targets.unwrap();
    assert!((macros.energy_kcal() - target).abs() / target <= 0.02);

    assert_eq!(document.ai_context.conversation_history.len(), 1);
    let turn = &document.ai_context.conversation_history[0];
    assert!(turn.user_message.contains("endurance"));
    assert_eq!(turn.agent_response, response.response);
}

#[tokio::test]
async fn logged_breakfast_lands_in_daily_totals() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let llm = Arc::new(ScriptedLlm::with_responses([
        intent("tool_invocation"),
        json!({
            "tool_calls": [{"tool": "log_meal", "arguments": {
                "type": "breakfast",
                "foods": [{"name": "oatmeal with banana", "calories": 300.0,
                           "macros": {"protein_g": 8.0, "carbs_g": 55.0, "fat_g": 5.0}}]
            }}]
        })
        .to_string(),
        reply("Breakfast logged: 300 kcal."),
    ]));
    let engine = engine(store.clone(), llm);

    let response = engine
        .handle_message(ChatRequest::new("alex_1", "I had oatmeal with a banana, about 300 calories"))
        .await
        .unwrap();

    assert_eq!(response.actions_taken, vec!["log_meal"]);
    let document = store.get_or_create("alex_1").await.unwrap();
    assert_eq!(document.nutrition.daily_logs.len(), 1);
    assert_eq!(document.nutrition.daily_logs[0].daily_totals.calories, 300.0);
}

#[tokio::test]
async fn model_outage_degrades_but_still_records_the_turn() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let llm = Arc::new(ScriptedLlm::default());
    llm.push_error(LlmError::Timeout { timeout_secs: 30 });
    let engine = engine(store.clone(), llm);

    let response = engine
        .handle_message(ChatRequest::new("alex_1", "log my run"))
        .await
        .unwrap();

    assert_eq!(response.response, FALLBACK_REPLY);
    assert!(response.actions_taken.is_empty());
    assert!(response.recommendations.is_empty());

    let document = store.get_or_create("alex_1").await.unwrap();
    assert_eq!(document.ai_context.conversation_history.len(), 1);
    assert_eq!(document.ai_context.conversation_history[0].agent_response, FALLBACK_REPLY);
}

#[tokio::test]
async fn planning_phase_outage_degrades_instead_of_clarifying() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let llm = Arc::new(ScriptedLlm::default());
    llm.push_response(intent("tool_invocation"));
    llm.push_error(LlmError::Timeout { timeout_secs: 30 });
    let engine = engine(store.clone(), llm);

    let response = engine
        .handle_message(ChatRequest::new("alex_1", "log my run"))
        .await
        .unwrap();

    // A failed model call is an outage, not an ambiguous request.
    assert_eq!(response.response, FALLBACK_REPLY);
    assert!(response.actions_taken.is_empty());

    let document = store.get_or_create("alex_1").await.unwrap();
    assert_eq!(document.ai_context.conversation_history.len(), 1);
    assert_eq!(document.ai_context.conversation_history[0].agent_response, FALLBACK_REPLY);
}

#[tokio::test]
async fn unparseable_plan_asks_the_athlete_to_clarify() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let llm = Arc::new(ScriptedLlm::with_responses([
        intent("tool_invocation"),
        "Sure, I'll log that workout for you!".to_string(),
    ]));
    let engine = engine(store.clone(), llm);

    let response = engine
        .handle_message(ChatRequest::new("alex_1", "log my run"))
        .await
        .unwrap();

    assert!(response.response.contains("more detail"));
    assert!(response.actions_taken.is_empty());
}

#[tokio::test]
async fn recommendations_never_leak_the_user_id() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let llm = Arc::new(ScriptedLlm::with_responses([
        intent("general_conversation"),
        json!({
            "response": "Keep it up!",
            "recommendations": [
                {"title": "For alex_1", "message": "alex_1 should sleep more."}
            ]
        })
        .to_string(),
    ]));
    let engine = engine(store, llm);

    let response = engine
        .handle_message(ChatRequest::new("alex_1", "any tips?"))
        .await
        .unwrap();

    let recommendation = &response.recommendations[0];
    assert_eq!(recommendation.title, "For you");
    assert_eq!(recommendation.message, "you should sleep more.");
}

#[tokio::test]
async fn planner_clarification_short_circuits_reply_generation() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let llm = Arc::new(ScriptedLlm::with_responses([
        intent("tool_invocation"),
        json!({"clarification": "Which meal was that, and roughly how many calories?"}).to_string(),
    ]));
    let llm_handle = llm.clone();
    let engine = engine(store.clone(), llm);

    let response = engine
        .handle_message(ChatRequest::new("alex_1", "log my food"))
        .await
        .unwrap();

    assert_eq!(response.response, "Which meal was that, and roughly how many calories?");
    assert!(response.actions_taken.is_empty());
    // Intent and planning only; no reply call was made.
    assert_eq!(llm_handle.recorded_requests().len(), 2);
}

#[tokio::test]
async fn unknown_tool_in_plan_becomes_a_clarifying_question() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let llm = Arc::new(ScriptedLlm::with_responses([
        intent("tool_invocation"),
        json!({"tool_calls": [{"tool": "order_groceries", "arguments": {}}]}).to_string(),
    ]));
    let engine = engine(store.clone(), llm);

    let before = store.get_or_create("alex_1").await.unwrap();
    let response = engine
        .handle_message(ChatRequest::new("alex_1", "order me groceries"))
        .await
        .unwrap();

    assert!(response.actions_taken.is_empty());
    assert!(response.response.contains("more detail"));

    // Nothing but the conversation turn changed.
    let after = store.get_or_create("alex_1").await.unwrap();
    assert_eq!(after.workouts, before.workouts);
    assert_eq!(after.goals, before.goals);
    assert_eq!(after.ai_context.conversation_history.len(), 1);
}

#[tokio::test]
async fn failed_call_is_isolated_from_the_rest_of_the_batch() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let llm = Arc::new(ScriptedLlm::with_responses([
        intent("tool_invocation"),
        json!({
            "tool_calls": [
                {"tool": "log_workout", "arguments": {"type": "cardio", "duration_minutes": -20.0}},
                {"tool": "log_workout", "arguments": {"type": "strength", "duration_minutes": 40.0}}
            ]
        })
        .to_string(),
        reply("Logged your strength session; the first entry didn't make sense."),
    ]));
    let engine = engine(store.clone(), llm);

    let response = engine
        .handle_message(ChatRequest::new("alex_1", "log both workouts"))
        .await
        .unwrap();

    // Only the valid call counts as an action.
    assert_eq!(response.actions_taken, vec!["log_workout"]);
    let document = store.get_or_create("alex_1").await.unwrap();
    assert_eq!(document.workouts.logged_workouts.len(), 1);
    assert_eq!(document.workouts.logged_workouts[0].duration_minutes, 40.0);
}

#[tokio::test]
async fn conversation_history_is_capped_fifo() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let llm = Arc::new(ScriptedLlm::default());
    let engine = engine_with(store.clone(), llm.clone(), 3);

    for i in 0..7 {
        llm.push_response(intent("general_conversation"));
        llm.push_response(reply(&format!("reply {i}")));
        engine
            .handle_message(ChatRequest::new("alex_1", format!("message {i}")))
            .await
            .unwrap();
    }

    let document = store.get_or_create("alex_1").await.unwrap();
    let history = &document.ai_context.conversation_history;
    assert_eq!(history.len(), 3);
    // Oldest turns were dropped; the newest three remain in order.
    assert_eq!(history[0].user_message, "message 4");
    assert_eq!(history[2].user_message, "message 6");
}

#[tokio::test]
async fn corrupt_document_aborts_the_request() {
    let store = Arc::new(InMemoryDocumentStore::new());
    store.insert_raw("alex_1", "{definitely not json").await;
    let llm = Arc::new(ScriptedLlm::with_responses([intent("general_conversation")]));
    let engine = engine(store, llm);

    let error = engine
        .handle_message(ChatRequest::new("alex_1", "hello"))
        .await
        .unwrap_err();
    assert!(matches!(error, StoreError::Corruption { .. }));
}

#[tokio::test]
async fn informational_query_answers_without_tools() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let llm = Arc::new(ScriptedLlm::with_responses([
        intent("informational_query"),
        reply("You've logged no workouts yet this week."),
    ]));
    let llm_handle = llm.clone();
    let engine = engine(store.clone(), llm);

    let response = engine
        .handle_message(ChatRequest::new("alex_1", "how's my week looking?"))
        .await
        .unwrap();

    assert!(response.actions_taken.is_empty());
    assert_eq!(response.response, "You've logged no workouts yet this week.");
    // Intent then reply; the planning phase never ran.
    assert_eq!(llm_handle.recorded_requests().len(), 2);
}

#[tokio::test]
async fn caller_context_is_stored_with_the_turn() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let llm = Arc::new(ScriptedLlm::with_responses([
        intent("general_conversation"),
        reply("Hey! Ready when you are."),
    ]));
    let engine = engine(store.clone(), llm);

    let mut request = ChatRequest::new("alex_1", "hey coach");
    request.context.insert("client".to_string(), json!("mobile-app"));
    engine.handle_message(request).await.unwrap();

    let document = store.get_or_create("alex_1").await.unwrap();
    let turn = &document.ai_context.conversation_history[0];
    assert_eq!(turn.context["client"], json!("mobile-app"));
}
