use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One exchanged message pair, stored on the document itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub timestamp: DateTime<Utc>,
    pub user_message: String,
    pub agent_response: String,
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LearnedPreferences {
    #[serde(default = "default_communication_style")]
    pub communication_style: String,
    #[serde(default)]
    pub preferred_meal_types: Vec<String>,
    #[serde(default)]
    pub workout_preferences: Vec<String>,
    #[serde(default)]
    pub learning_patterns: BTreeMap<String, Value>,
}

fn default_communication_style() -> String {
    "friendly".to_string()
}

impl Default for LearnedPreferences {
    fn default() -> Self {
        Self {
            communication_style: default_communication_style(),
            preferred_meal_types: Vec::new(),
            workout_preferences: Vec::new(),
            learning_patterns: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AiContext {
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
    #[serde(default)]
    pub preferences_learned: LearnedPreferences,
}

impl AiContext {
    /// Append a turn, evicting from the front once `cap` is exceeded. The
    /// newest entry is never the one dropped.
    pub fn push_turn(&mut self, turn: ConversationTurn, cap: usize) {
        self.conversation_history.push(turn);
        if cap > 0 && self.conversation_history.len() > cap {
            let overflow = self.conversation_history.len() - cap;
            self.conversation_history.drain(..overflow);
        }
    }

    /// The most recent `count` turns, oldest first.
    pub fn recent_turns(&self, count: usize) -> &[ConversationTurn] {
        let start = self.conversation_history.len().saturating_sub(count);
        &self.conversation_history[start..]
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use std::collections::BTreeMap;

    use super::{AiContext, ConversationTurn};

    fn turn(message: &str) -> ConversationTurn {
        ConversationTurn {
            timestamp: Utc::now(),
            user_message: message.to_string(),
            agent_response: "ok".to_string(),
            context: BTreeMap::new(),
        }
    }

    #[test]
    fn history_evicts_oldest_first() {
        let mut context = AiContext::default();
        for index in 0..10 {
            context.push_turn(turn(&format!("message {index}")), 4);
        }

        assert_eq!(context.conversation_history.len(), 4);
        assert_eq!(context.conversation_history[0].user_message, "message 6");
        assert_eq!(context.conversation_history[3].user_message, "message 9");
    }

    #[test]
    fn recent_turns_handles_short_history() {
        let mut context = AiContext::default();
        context.push_turn(turn("only"), 50);
        assert_eq!(context.recent_turns(5).len(), 1);
    }
}
