use herald::action::{handler, Action, ParamKind, ParameterSpec};
use herald::conversation::ConversationState;
use herald::dispatcher::{DispatchResult, Dispatcher};
use herald::extractor::ParameterExtractor;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

fn dispatcher() -> Dispatcher {
    Dispatcher::new(ParameterExtractor::heuristic_only())
}

fn session() -> Arc<Mutex<ConversationState>> {
    Arc::new(Mutex::new(ConversationState::new(10)))
}

fn echo_action(name: &str, triggers: &[&str], priority: i32) -> Action {
    Action::new(
        name,
        format!("{} action", name),
        handler(|args| async move { Ok(json!({ "args": args })) }),
    )
    .with_triggers(triggers.iter().copied())
    .with_priority(priority)
}

#[tokio::test]
async fn create_goal_end_to_end() {
    let dispatcher = dispatcher();
    let state = session();

    dispatcher
        .register(
            echo_action("create_goal", &["create goal", "create a goal", "make a goal"], 9)
                .with_param("description", ParameterSpec::required(ParamKind::String)),
        )
        .await
        .unwrap();

    let result = dispatcher
        .dispatch("I want to create a goal to learn Go", state.as_ref())
        .await;

    match result {
        DispatchResult::Matched { action, output, missing_required } => {
            assert_eq!(action, "create_goal");
            assert!(missing_required.is_empty());
            let description = output["args"]["description"].as_str().unwrap();
            assert!(!description.is_empty());
        }
        other => panic!("expected Matched, got {:?}", other),
    }

    // The exchange was recorded with dispatch metadata.
    let session = state.lock().await;
    assert_eq!(session.len(), 1);
    let turn = session.turns().next().unwrap();
    assert_eq!(turn.user_text, "I want to create a goal to learn Go");
    assert_eq!(turn.metadata.get("action"), Some(&json!("create_goal")));
    assert_eq!(turn.metadata.get("match_kind"), Some(&json!("phrase")));
}

#[tokio::test]
async fn no_match_has_no_side_effects() {
    let dispatcher = dispatcher();
    let state = session();

    dispatcher
        .register(echo_action("search_memory", &["search memory"], 8))
        .await
        .unwrap();

    let result = dispatcher
        .dispatch("completely unrelated gibberish", state.as_ref())
        .await;

    assert!(result.is_no_match());
    assert_eq!(result.action(), None);
    assert_eq!(state.lock().await.len(), 0, "no turn recorded on NoMatch");
}

#[tokio::test]
async fn handler_failure_is_captured_not_propagated() {
    let dispatcher = dispatcher();
    let state = session();

    dispatcher
        .register(
            Action::new(
                "broken",
                "always fails",
                handler(|_args| async move { anyhow::bail!("downstream unavailable") }),
            )
            .with_triggers(["break things"]),
        )
        .await
        .unwrap();

    let result = dispatcher.dispatch("break things", state.as_ref()).await;

    match result {
        DispatchResult::MatchedWithError { action, error } => {
            assert_eq!(action, "broken");
            assert!(error.contains("downstream unavailable"));
        }
        other => panic!("expected MatchedWithError, got {:?}", other),
    }

    // Failures still land in the transcript.
    let session = state.lock().await;
    assert_eq!(session.len(), 1);
    assert!(session.last_assistant_text().unwrap().contains("failed"));
}

#[tokio::test]
async fn missing_required_still_invokes_handler() {
    let dispatcher = dispatcher();
    let state = session();

    dispatcher
        .register(
            echo_action("schedule", &["schedule meeting"], 5)
                .with_param("attendee_count", ParameterSpec::required(ParamKind::Boolean)),
        )
        .await
        .unwrap();

    // Nothing in the utterance fills a parameter named "attendee_count".
    let result = dispatcher.dispatch("schedule meeting", state.as_ref()).await;

    match result {
        DispatchResult::Matched { action, missing_required, .. } => {
            assert_eq!(action, "schedule");
            assert_eq!(missing_required, vec!["attendee_count".to_string()]);
        }
        other => panic!("expected Matched with missing params, got {:?}", other),
    }

    let session = state.lock().await;
    let turn = session.turns().next().unwrap();
    assert_eq!(turn.metadata.get("missing_required"), Some(&json!(["attendee_count"])));
}

#[tokio::test]
async fn reregistration_routes_to_the_replacement() {
    let dispatcher = dispatcher();
    let state = session();

    dispatcher
        .register(Action::new(
            "status",
            "first version",
            handler(|_args| async move { Ok(json!("v1")) }),
        ).with_triggers(["check status"]))
        .await
        .unwrap();
    dispatcher
        .register(Action::new(
            "status",
            "second version",
            handler(|_args| async move { Ok(json!("v2")) }),
        ).with_triggers(["check status"]))
        .await
        .unwrap();

    assert_eq!(dispatcher.action_summaries().await.len(), 1);

    let result = dispatcher.dispatch("check status", state.as_ref()).await;
    match result {
        DispatchResult::Matched { output, .. } => assert_eq!(output, json!("v2")),
        other => panic!("expected Matched, got {:?}", other),
    }
}

#[tokio::test]
async fn ambiguous_overlap_resolves_by_registration_order() {
    let dispatcher = dispatcher();
    let state = session();

    dispatcher
        .register(echo_action("goal_a", &["goal"], 5))
        .await
        .unwrap();
    dispatcher
        .register(echo_action("goal_b", &["goal"], 5))
        .await
        .unwrap();

    let result = dispatcher.dispatch("goal", state.as_ref()).await;
    assert_eq!(result.action(), Some("goal_a"));

    let session = state.lock().await;
    let turn = session.turns().next().unwrap();
    assert_eq!(turn.metadata.get("ambiguous"), Some(&json!(true)));
}

#[tokio::test]
async fn should_invoke_reflects_registry() {
    let dispatcher = dispatcher();

    assert!(!dispatcher.should_invoke("search memory").await);
    dispatcher
        .register(echo_action("search_memory", &["search memory"], 8))
        .await
        .unwrap();
    assert!(dispatcher.should_invoke("search memory").await);
    assert!(!dispatcher.should_invoke("zxqv flurble").await);
}

#[tokio::test]
async fn profile_set_by_handler_spans_turns() {
    let dispatcher = dispatcher();
    let state = session();

    let remember_state = Arc::clone(&state);
    dispatcher
        .register(
            Action::new(
                "remember_name",
                "Remember the user's name",
                handler(move |args| {
                    let state = Arc::clone(&remember_state);
                    async move {
                        let name = args["name"].as_str().unwrap_or("friend").to_string();
                        state.lock().await.set_profile("name", name.clone());
                        Ok(json!({ "stored": name }))
                    }
                }),
            )
            .with_triggers(["my name is", "call me"])
            .with_param("name", ParameterSpec::required(ParamKind::String))
            .with_priority(8),
        )
        .await
        .unwrap();

    let result = dispatcher.dispatch("my name is Marc", state.as_ref()).await;
    assert_eq!(result.action(), Some("remember_name"));

    let session = state.lock().await;
    assert_eq!(session.get_profile("name"), Some(&json!("Marc")));
    // And it survives a history reset.
    drop(session);
    state.lock().await.clear();
    assert_eq!(state.lock().await.get_profile("name"), Some(&json!("Marc")));
}

#[tokio::test]
async fn concurrent_dispatches_all_record_turns() {
    let dispatcher = Arc::new(dispatcher());
    let state = session();

    dispatcher
        .register(echo_action("ping", &["ping"], 5))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let d = Arc::clone(&dispatcher);
        let s = Arc::clone(&state);
        handles.push(tokio::spawn(async move { d.dispatch("ping", s.as_ref()).await }));
    }

    for handle in handles {
        let result = handle.await.unwrap();
        assert_eq!(result.action(), Some("ping"));
    }

    assert_eq!(state.lock().await.len(), 8, "no turn may be lost under concurrency");
}

#[tokio::test]
async fn snapshot_passthrough_matches_state() {
    let dispatcher = dispatcher();
    let state = session();

    dispatcher
        .register(echo_action("ping", &["ping"], 5))
        .await
        .unwrap();
    dispatcher.dispatch("ping", state.as_ref()).await;

    let snapshot = dispatcher.snapshot(state.as_ref()).await;
    assert_eq!(snapshot.last_turn.unwrap().user_text, "ping");
}
