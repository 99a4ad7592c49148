use herald::action::{handler, Action, ParamKind, ParameterSpec};
use herald::conversation::ConversationState;
use herald::dispatcher::{DispatchResult, Dispatcher};
use herald::extractor::{LlmClient, ParameterExtractor};

use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

// Demo REPL: registers the stock action set with stub handlers standing in
// for the downstream services (goal store, task store, orchestrator), then
// dispatches stdin lines. The core never knows what handlers talk to.

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("Herald dispatch engine booting...");

    let extractor = match std::env::var("OLLAMA_URL") {
        Ok(url) => {
            let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
            tracing::info!(%url, %model, "completion-assisted extraction enabled");
            ParameterExtractor::with_llm(LlmClient::new(url, model))
        }
        Err(_) => {
            tracing::info!("OLLAMA_URL unset, heuristic extraction only");
            ParameterExtractor::heuristic_only()
        }
    };

    let dispatcher = Dispatcher::new(extractor);
    let state = Arc::new(Mutex::new(ConversationState::default()));

    register_stock_actions(&dispatcher, Arc::clone(&state)).await?;
    tracing::info!(
        actions = dispatcher.action_summaries().await.len(),
        "herald ready, type a command ('quit' to exit)"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let utterance = line.trim();
        if utterance.is_empty() {
            continue;
        }
        if matches!(utterance, "quit" | "exit") {
            break;
        }
        if utterance == "/stats" {
            let stats = state.lock().await.stats();
            println!("{}", serde_json::to_string_pretty(&stats)?);
            continue;
        }
        if utterance == "/clear" {
            state.lock().await.clear();
            println!("history cleared (profile kept)");
            continue;
        }

        match dispatcher.dispatch(utterance, state.as_ref()).await {
            DispatchResult::Matched { action, output, missing_required } => {
                if missing_required.is_empty() {
                    println!("[{}] {}", action, output);
                } else {
                    println!("[{}] {} (missing: {:?})", action, output, missing_required);
                }
            }
            DispatchResult::MatchedWithError { action, error } => {
                println!("[{}] failed: {}", action, error);
            }
            DispatchResult::NoMatch => {
                println!("(no matching action)");
            }
        }
    }

    let snapshot = dispatcher.snapshot(state.as_ref()).await;
    tracing::info!(session = %snapshot.session_id, "session ended");
    Ok(())
}

async fn register_stock_actions(
    dispatcher: &Dispatcher,
    state: Arc<Mutex<ConversationState>>,
) -> Result<()> {
    dispatcher
        .register(
            Action::new(
                "search_memory",
                "Search stored memories for past information",
                handler(|args| async move {
                    let query = args.get("query").cloned().unwrap_or_default();
                    Ok(json!({ "query": query, "results": [], "count": 0 }))
                }),
            )
            .with_triggers([
                "search memory",
                "search my memory",
                "find in memory",
                "remember when",
                "recall when",
                "what do you remember about",
                "look up",
                "find information",
                "search for",
            ])
            .with_param("query", ParameterSpec::required(ParamKind::String))
            .with_priority(8),
        )
        .await?;

    dispatcher
        .register(
            Action::new(
                "create_goal",
                "Create a new goal in the goal store",
                handler(|args| async move {
                    let description = args.get("description").cloned().unwrap_or_default();
                    Ok(json!({ "goal": description, "status": "active" }))
                }),
            )
            .with_triggers([
                "create goal",
                "create a goal",
                "make goal",
                "make a goal",
                "new goal",
                "add goal",
                "set goal",
                "set a goal",
                "i want to create a goal",
            ])
            .with_param("description", ParameterSpec::required(ParamKind::String))
            .with_priority(9),
        )
        .await?;

    dispatcher
        .register(
            Action::new(
                "list_tasks",
                "List pending tasks from the task store",
                handler(|args| async move {
                    let limit = args.get("limit").and_then(|v| v.as_i64()).unwrap_or(5);
                    Ok(json!({ "tasks": [], "limit": limit }))
                }),
            )
            .with_triggers([
                "list tasks",
                "list my tasks",
                "show tasks",
                "show my tasks",
                "what are my tasks",
                "pending tasks",
                "what's on my todo",
            ])
            .with_param(
                "limit",
                ParameterSpec::optional(ParamKind::Integer).with_default(5),
            )
            .with_priority(8),
        )
        .await?;

    dispatcher
        .register(
            Action::new(
                "trigger_consolidation",
                "Run a memory consolidation cycle",
                handler(|_args| async move {
                    Ok(json!({ "status": "completed", "patterns_found": 0 }))
                }),
            )
            .with_triggers([
                "consolidate",
                "consolidate memory",
                "run consolidation",
                "memory consolidation",
                "trigger consolidation",
            ])
            .with_priority(9),
        )
        .await?;

    dispatcher
        .register(
            Action::new(
                "start_research",
                "Start autonomous research on a topic",
                handler(|args| async move {
                    let topic = args.get("topic").cloned().unwrap_or_default();
                    Ok(json!({ "topic": topic, "status": "started" }))
                }),
            )
            .with_triggers([
                "research",
                "start research",
                "do research on",
                "investigate",
                "study",
                "learn about",
                "look into",
            ])
            .with_param("topic", ParameterSpec::required(ParamKind::String))
            .with_priority(8),
        )
        .await?;

    dispatcher
        .register(
            Action::new(
                "check_status",
                "Check overall system status",
                handler(|_args| async move { Ok(json!({ "system": "operational" })) }),
            )
            .with_triggers([
                "status",
                "system status",
                "check status",
                "how are you",
                "system health",
                "are you working",
            ])
            .with_priority(7),
        )
        .await?;

    // The name actions close over the session state: remembering and
    // recalling span turns via the user profile.
    let remember_state = Arc::clone(&state);
    dispatcher
        .register(
            Action::new(
                "remember_name",
                "Remember the user's name",
                handler(move |args| {
                    let state = Arc::clone(&remember_state);
                    async move {
                        let name = args
                            .get("name")
                            .and_then(|v| v.as_str())
                            .unwrap_or("friend")
                            .to_string();
                        state.lock().await.set_profile("name", name.clone());
                        Ok(json!({ "name": name, "stored": true }))
                    }
                }),
            )
            .with_triggers([
                "my name is",
                "i am",
                "call me",
                "remember my name",
                "you can call me",
            ])
            .with_param("name", ParameterSpec::required(ParamKind::String))
            .with_priority(8),
        )
        .await?;

    let recall_state = Arc::clone(&state);
    dispatcher
        .register(
            Action::new(
                "recall_name",
                "Recall the user's name",
                handler(move |_args| {
                    let state = Arc::clone(&recall_state);
                    async move {
                        let name = state.lock().await.get_profile("name").cloned();
                        Ok(json!({ "name": name }))
                    }
                }),
            )
            .with_triggers([
                "what is my name",
                "what's my name",
                "who am i",
                "do you know my name",
                "do you remember me",
            ])
            .with_priority(8),
        )
        .await?;

    dispatcher
        .register(
            Action::new(
                "start_improvement_cycle",
                "Start a self-improvement cycle",
                handler(|args| async move {
                    let metric = args.get("target_metric").cloned().unwrap_or_default();
                    Ok(json!({ "target_metric": metric, "status": "started" }))
                }),
            )
            .with_triggers([
                "improve yourself",
                "self improve",
                "optimize yourself",
                "make faster",
                "improve performance",
            ])
            .with_param(
                "target_metric",
                ParameterSpec::optional(ParamKind::String).with_default("overall_performance"),
            )
            .with_priority(9),
        )
        .await?;

    dispatcher
        .register(
            Action::new(
                "decompose_goal",
                "Break a goal down into tasks",
                handler(|args| async move {
                    let goal = args.get("goal_description").cloned().unwrap_or_default();
                    Ok(json!({ "goal": goal, "tasks": [] }))
                }),
            )
            .with_triggers([
                "decompose goal",
                "break down goal",
                "break into tasks",
                "split goal",
                "plan goal",
            ])
            .with_param("goal_description", ParameterSpec::required(ParamKind::String))
            .with_priority(8),
        )
        .await?;

    Ok(())
}
