use herald::conversation::{ConversationState, ConversationTurn};
use serde_json::json;
use std::collections::HashMap;

fn turn(user: &str, assistant: &str) -> ConversationTurn {
    ConversationTurn::new(user, assistant, HashMap::new())
}

#[test]
fn capacity_evicts_oldest_in_order() {
    let mut state = ConversationState::new(3);
    for i in 1..=5 {
        state.add_turn(turn(&format!("user {}", i), &format!("assistant {}", i)));
    }

    assert_eq!(state.len(), 3);
    let users: Vec<&str> = state.turns().map(|t| t.user_text.as_str()).collect();
    assert_eq!(users, vec!["user 3", "user 4", "user 5"]);
}

#[test]
fn capacity_is_at_least_one() {
    let mut state = ConversationState::new(0);
    assert_eq!(state.capacity(), 1);
    state.add_turn(turn("a", "b"));
    state.add_turn(turn("c", "d"));
    assert_eq!(state.len(), 1);
    assert_eq!(state.last_user_text(), Some("c"));
}

#[test]
fn clear_drops_turns_but_keeps_profile() {
    let mut state = ConversationState::new(5);
    state.set_profile("name", "Marc");
    state.add_turn(turn("hello", "hi"));

    state.clear();

    assert!(!state.has_context());
    assert_eq!(state.len(), 0);
    assert_eq!(state.get_profile("name"), Some(&json!("Marc")));
}

#[test]
fn profile_survives_eviction() {
    let mut state = ConversationState::new(1);
    state.set_profile("location", "Dublin");
    state.add_turn(turn("one", "1"));
    state.add_turn(turn("two", "2"));

    assert_eq!(state.get_profile("location"), Some(&json!("Dublin")));
}

#[test]
fn render_context_formats_transcript() {
    let mut state = ConversationState::new(5);
    state.add_turn(turn("hello", "hi there"));
    state.add_turn(ConversationTurn::new(
        "search memory",
        "found nothing",
        HashMap::from([("action".to_string(), json!("search_memory"))]),
    ));

    let plain = state.render_context(false);
    assert!(plain.contains("User: hello"));
    assert!(plain.contains("Assistant: hi there"));
    assert!(plain.contains("\n\n"), "turns are blank-line separated");
    assert!(!plain.contains("Metadata"));

    let with_meta = state.render_context(true);
    assert!(with_meta.contains("[Metadata:"));
    assert!(with_meta.contains("search_memory"));
}

#[test]
fn empty_state_renders_empty_context() {
    let state = ConversationState::new(5);
    assert_eq!(state.render_context(true), "");
    assert!(state.render_context_for_model().is_empty());
    assert!(state.last_user_text().is_none());
    assert!(state.last_assistant_text().is_none());
}

#[test]
fn model_context_leads_with_profile_system_entry() {
    let mut state = ConversationState::new(5);
    state.set_profile("name", "Marc");
    state.add_turn(turn("who am i", "You are Marc"));

    let messages = state.render_context_for_model();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].role, "system");
    assert!(messages[0].content.contains("name: Marc"));
    assert_eq!(messages[1].role, "user");
    assert_eq!(messages[1].content, "who am i");
    assert_eq!(messages[2].role, "assistant");
}

#[test]
fn model_context_without_profile_has_no_system_entry() {
    let mut state = ConversationState::new(5);
    state.add_turn(turn("hello", "hi"));

    let messages = state.render_context_for_model();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, "user");
    assert_eq!(messages[1].role, "assistant");
}

#[test]
fn stats_count_words_and_turns() {
    let mut state = ConversationState::new(5);
    state.set_profile("name", "Marc");
    state.add_turn(turn("one two three", "four five"));
    state.add_turn(turn("six", "seven eight nine"));

    let stats = state.stats();
    assert_eq!(stats.total_turns, 2);
    assert_eq!(stats.total_user_words, 4);
    assert_eq!(stats.total_assistant_words, 5);
    assert_eq!(stats.profile_keys, vec!["name".to_string()]);
    assert!(stats.session_duration_secs >= 0.0);
}

#[test]
fn snapshot_carries_last_turn_and_profile() {
    let mut state = ConversationState::new(5);
    state.set_profile("name", "Marc");
    state.add_turn(turn("older", "older reply"));
    state.add_turn(turn("newest", "newest reply"));

    let snapshot = state.snapshot();
    assert!(snapshot.session_id.starts_with("session-"));
    let last = snapshot.last_turn.unwrap();
    assert_eq!(last.user_text, "newest");
    assert_eq!(snapshot.user_profile.get("name"), Some(&json!("Marc")));

    // The shape is what an external memory store consumes; it must
    // serialize cleanly.
    let rendered = serde_json::to_string(&state.snapshot()).unwrap();
    assert!(rendered.contains("\"session_id\""));
}

#[test]
fn snapshot_of_fresh_session_has_no_turn() {
    let state = ConversationState::new(5);
    let snapshot = state.snapshot();
    assert!(snapshot.last_turn.is_none());
    assert!(snapshot.user_profile.is_empty());
}
