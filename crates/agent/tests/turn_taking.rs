//! Turn-taking: barge-in, tool dispatch ordering and turn failures

mod common;

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::broadcast;

use common::*;
use receptionist_agent::{TurnEvent, TurnState};
use receptionist_core::{CallState, Message, Role, ToolArguments, ToolCall, ToolDefinition, TranscriptResult};
use receptionist_tools::{ToolError, ToolHandler, ToolRegistry, ToolSession};

struct DelayedLookup {
    name: &'static str,
    delay: Duration,
}

#[async_trait]
impl ToolHandler for DelayedLookup {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::without_parameters(self.name, "Looks something up slowly")
    }

    async fn call(
        &self,
        _arguments: &ToolArguments,
        session: &dyn ToolSession,
        _context: &[Message],
    ) -> Result<String, ToolError> {
        tokio::time::sleep(self.delay).await;
        session.add_note(&format!("{} finished", self.name));
        Ok(format!("{} result", self.name))
    }
}

fn lookup_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(
        "slow_lookup",
        DelayedLookup {
            name: "slow_lookup",
            delay: Duration::from_millis(300),
        },
    );
    registry.register(
        "fast_lookup",
        DelayedLookup {
            name: "fast_lookup",
            delay: Duration::from_millis(10),
        },
    );
    registry
}

fn drain(events: &mut broadcast::Receiver<TurnEvent>) -> Vec<TurnEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

fn story_model() -> ScriptedModel {
    ScriptedModel::new(|request| match last(request) {
        (Role::System, _) => reply("Hello there"),
        (Role::User, text) if text == "tell me a story" => {
            reply("alpha beta gamma delta epsilon zeta eta theta")
        },
        _ => reply("Okay."),
    })
}

#[tokio::test(start_paused = true)]
async fn test_final_utterance_interrupts_playback() {
    let harness = HarnessBuilder::new(story_model())
        .frame_delay(Duration::from_millis(100))
        .build();
    let session = &harness.session;
    session.start().await.unwrap();
    session.turns().join_active_turn().await;
    let mut events = session.turns().subscribe();

    session.on_transcript(TranscriptResult::final_result("tell me a story")).await;
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(session.turns().state(), TurnState::Speaking);

    session.on_transcript(TranscriptResult::final_result("stop")).await;
    session.turns().join_active_turn().await;

    // Nothing from the interrupted reply after the barge-in
    assert_eq!(
        harness.transport.spoken(),
        vec!["Hello", "there", "alpha", "beta", "Okay."]
    );
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        TurnEvent::BargeIn {
            interrupted: TurnState::Speaking
        }
    )));
    assert_eq!(session.turns().state(), TurnState::Idle);

    let transcript = session.tracker().transcript();
    let story = transcript.find("Caller: tell me a story").unwrap();
    let stop = transcript.find("Caller: stop").unwrap();
    let okay = transcript.find("Receptionist: Okay.").unwrap();
    assert!(story < stop && stop < okay);
}

#[tokio::test(start_paused = true)]
async fn test_final_utterance_interrupts_stalled_send() {
    let harness = HarnessBuilder::new(story_model()).build();
    let session = &harness.session;
    session.start().await.unwrap();
    session.turns().join_active_turn().await;
    let mut events = session.turns().subscribe();

    harness.transport.stall();
    session.on_transcript(TranscriptResult::final_result("tell me a story")).await;
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(session.turns().state(), TurnState::Speaking);

    // Barge-in must not wait for the carrier to accept the pending frame
    tokio::time::timeout(
        Duration::from_secs(1),
        session.on_transcript(TranscriptResult::final_result("stop")),
    )
    .await
    .expect("barge-in blocked on a stalled send");

    harness.transport.resume();
    session.turns().join_active_turn().await;

    assert_eq!(harness.transport.spoken(), vec!["Hello", "there", "Okay."]);
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        TurnEvent::BargeIn {
            interrupted: TurnState::Speaking
        }
    )));
    assert_eq!(session.turns().state(), TurnState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_final_utterance_interrupts_generation() {
    let model = ScriptedModel::new(|request| match last(request) {
        (Role::System, _) => reply("Hi"),
        (Role::User, text) if text == "slow question" => ModelScript::Hang,
        _ => reply("Sure."),
    });
    let harness = HarnessBuilder::new(model).build();
    let session = &harness.session;
    session.start().await.unwrap();
    session.turns().join_active_turn().await;
    let mut events = session.turns().subscribe();

    session.on_transcript(TranscriptResult::final_result("slow question")).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(session.turns().state(), TurnState::Generating);

    session.on_transcript(TranscriptResult::final_result("actually nevermind")).await;
    assert_eq!(session.turns().state(), TurnState::Generating);
    session.turns().join_active_turn().await;

    let drained = drain(&mut events);
    assert!(drained.iter().any(|e| matches!(
        e,
        TurnEvent::BargeIn {
            interrupted: TurnState::Generating
        }
    )));

    // The hung stream produced nothing; both utterances precede the reply
    let snapshot = session.context().snapshot();
    let messages = snapshot.messages();
    let tail: Vec<(Role, String)> = messages[messages.len() - 3..]
        .iter()
        .map(|m| (m.role, m.content.clone()))
        .collect();
    assert_eq!(
        tail,
        vec![
            (Role::User, "slow question".to_string()),
            (Role::User, "actually nevermind".to_string()),
            (Role::Assistant, "Sure.".to_string()),
        ]
    );
    assert_eq!(harness.transport.spoken().last().map(String::as_str), Some("Sure."));
    assert_eq!(session.turns().state(), TurnState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_partial_transcript_barge_in() {
    let harness = HarnessBuilder::new(story_model())
        .frame_delay(Duration::from_millis(100))
        .build();
    let session = &harness.session;
    session.start().await.unwrap();
    session.turns().join_active_turn().await;

    // Nothing to interrupt while idle
    assert!(!session.turns().on_partial_transcript("hey").await);

    session.on_transcript(TranscriptResult::final_result("tell me a story")).await;
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert!(!session.turns().on_partial_transcript("h").await);
    assert!(session.turns().on_partial_transcript("wait").await);
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(
        harness.transport.spoken(),
        vec!["Hello", "there", "alpha", "beta"]
    );
    assert_eq!(session.turns().state(), TurnState::Idle);
    // Partial text is never committed
    assert!(!session
        .context()
        .snapshot()
        .messages()
        .iter()
        .any(|m| m.content == "wait"));
}

#[tokio::test(start_paused = true)]
async fn test_tool_results_follow_request_order() {
    let model = ScriptedModel::new(|request| match last(request) {
        (Role::System, _) => reply("Hi"),
        (Role::User, _) => call_tools(vec![
            ToolCall::new("t1", "slow_lookup"),
            ToolCall::new("t2", "fast_lookup"),
        ]),
        _ => reply("Both done."),
    });
    let harness = HarnessBuilder::new(model).tools(lookup_registry()).build();
    let session = &harness.session;
    session.start().await.unwrap();
    session.turns().join_active_turn().await;

    session.on_transcript(TranscriptResult::final_result("check both")).await;
    session.turns().join_active_turn().await;

    let snapshot = session.context().snapshot();
    assert_eq!(
        tool_messages(snapshot.messages()),
        vec![
            ("t1".to_string(), "slow_lookup result".to_string()),
            ("t2".to_string(), "fast_lookup result".to_string()),
        ]
    );
    assert_eq!(snapshot.last().unwrap().content, "Both done.");

    // The follow-up generation saw both results
    let requests = harness.model.requests();
    let follow_up = requests.last().unwrap();
    assert_eq!(tool_messages(&follow_up.messages).len(), 2);

    // Handlers ran concurrently: the fast one finished first
    let notes = session.tracker().transcript();
    assert!(notes.find("fast_lookup finished").unwrap() < notes.find("slow_lookup finished").unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_started_tools_complete_across_barge_in() {
    let model = ScriptedModel::new(|request| match last(request) {
        (Role::System, _) => reply("Hi"),
        (Role::User, text) if text == "check both" => call_tools(vec![
            ToolCall::new("t1", "slow_lookup"),
            ToolCall::new("t2", "fast_lookup"),
        ]),
        (Role::User, _) => reply("No problem."),
        _ => reply("Both done."),
    });
    let harness = HarnessBuilder::new(model).tools(lookup_registry()).build();
    let session = &harness.session;
    session.start().await.unwrap();
    session.turns().join_active_turn().await;
    let mut events = session.turns().subscribe();

    session.on_transcript(TranscriptResult::final_result("check both")).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.turns().state(), TurnState::AwaitingTool);

    session.on_transcript(TranscriptResult::final_result("never mind")).await;
    session.turns().join_active_turn().await;

    let snapshot = session.context().snapshot();
    let tail: Vec<(Role, String)> = snapshot
        .messages()
        .iter()
        .rev()
        .take(5)
        .rev()
        .map(|m| (m.role, m.content.clone()))
        .collect();
    assert_eq!(
        tail,
        vec![
            (Role::Assistant, String::new()),
            (Role::Tool, "slow_lookup result".to_string()),
            (Role::Tool, "fast_lookup result".to_string()),
            (Role::User, "never mind".to_string()),
            (Role::Assistant, "No problem.".to_string()),
        ]
    );
    assert!(!snapshot.messages().iter().any(|m| m.content == "Both done."));
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        TurnEvent::BargeIn {
            interrupted: TurnState::AwaitingTool
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_tool_recovers_conversationally() {
    let model = ScriptedModel::new(|request| match last(request) {
        (Role::System, _) => reply("Hi"),
        (Role::User, _) => call_tools(vec![ToolCall::new("c1", "fly_to_moon")]),
        _ => reply("Sorry, I can't help with that."),
    });
    let harness = HarnessBuilder::new(model).build();
    let session = &harness.session;
    session.start().await.unwrap();
    session.turns().join_active_turn().await;
    let mut events = session.turns().subscribe();

    session.on_transcript(TranscriptResult::final_result("fly me to the moon")).await;
    session.turns().join_active_turn().await;

    let tools = tool_messages(session.context().snapshot().messages());
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].0, "c1");
    assert!(tools[0].1.starts_with("Error: Unknown tool"));

    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        TurnEvent::ToolDispatched { success: false, .. }
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        TurnEvent::StateChanged {
            old: TurnState::AwaitingTool,
            new: TurnState::Generating
        }
    )));
    assert_eq!(harness.transport.spoken().last().map(String::as_str), Some("that."));
    assert_eq!(session.state(), CallState::Active);
}

#[tokio::test(start_paused = true)]
async fn test_model_timeout_asks_caller_to_repeat() {
    let model = ScriptedModel::new(|request| match last(request) {
        (Role::System, _) => reply("Hi"),
        _ => ModelScript::Hang,
    });
    let harness = HarnessBuilder::new(model)
        .options(|options| options.turn.model_timeout_ms = 1_000)
        .build();
    let session = &harness.session;
    session.start().await.unwrap();
    session.turns().join_active_turn().await;
    let mut events = session.turns().subscribe();
    let started = tokio::time::Instant::now();

    session.on_transcript(TranscriptResult::final_result("hello?")).await;
    session.turns().join_active_turn().await;

    assert!(started.elapsed() >= Duration::from_millis(1_000));
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, TurnEvent::Failed { error } if error.contains("timed out"))));
    let last = session.context().snapshot().last().cloned().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert!(last.content.contains("say that again"));
    assert_eq!(harness.transport.spoken().last().map(String::as_str), Some("again?"));
    assert_eq!(session.turns().state(), TurnState::Idle);
    assert_eq!(session.state(), CallState::Active);
}

#[tokio::test(start_paused = true)]
async fn test_reused_correlation_id_fails_turn_only() {
    let model = ScriptedModel::new(|request| match last(request) {
        (Role::System, _) => reply("Hi"),
        (Role::User, text) if text == "where are you" => {
            call_tools(vec![ToolCall::new("dup", "get_location")])
        },
        (Role::Tool, _) => call_tools(vec![ToolCall::new("dup", "get_business_hours")]),
        _ => reply("Hi again."),
    });
    let harness = HarnessBuilder::new(model).build();
    let session = &harness.session;
    session.start().await.unwrap();
    session.turns().join_active_turn().await;
    let mut events = session.turns().subscribe();

    session.on_transcript(TranscriptResult::final_result("where are you")).await;
    session.turns().join_active_turn().await;

    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, TurnEvent::Failed { error } if error.contains("dup"))));
    let snapshot = session.context().snapshot();
    assert_eq!(tool_messages(snapshot.messages()).len(), 1);
    assert!(session.context().pending_tool_calls().is_empty());
    // The location tool still ran
    assert_eq!(session.tracker().detected_intent(), "location_inquiry");

    session.on_transcript(TranscriptResult::final_result("hello")).await;
    session.turns().join_active_turn().await;
    assert_eq!(harness.transport.spoken().last().map(String::as_str), Some("again."));
    assert_eq!(session.state(), CallState::Active);
}

#[tokio::test(start_paused = true)]
async fn test_tool_round_limit_abandons_turn() {
    let model = ScriptedModel::new(|request| match last(request) {
        (Role::System, _) => reply("Hi"),
        _ => {
            let round = tool_messages(&request.messages).len();
            call_tools(vec![ToolCall::new(format!("loop_{}", round), "get_location")])
        },
    });
    let harness = HarnessBuilder::new(model)
        .options(|options| options.turn.max_tool_rounds = 2)
        .build();
    let session = &harness.session;
    session.start().await.unwrap();
    session.turns().join_active_turn().await;

    session.on_transcript(TranscriptResult::final_result("loop forever")).await;
    session.turns().join_active_turn().await;

    // Greeting plus three generations for the looping turn
    assert_eq!(harness.model.requests().len(), 4);
    assert_eq!(tool_messages(session.context().snapshot().messages()).len(), 2);
    assert!(session.context().pending_tool_calls().is_empty());
    assert_eq!(session.turns().state(), TurnState::Idle);
}
