//! End-to-end loop scenarios with a scripted decision source.

use async_trait::async_trait;
use ratchet_agent::{AgentLoop, Session, TurnOutcome};
use ratchet_capabilities::standard_registry;
use ratchet_core::decision::{Action, Decision, DecisionContext, DecisionSource};
use ratchet_core::error::{DecisionError, Error};
use ratchet_core::history::HistoryStore;
use ratchet_core::scratchpad::ScratchpadEntry;
use ratchet_core::stream::{channel, OverflowPolicy, TokenEvent};
use ratchet_memory::InMemoryHistory;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One scripted step: tokens to stream, then the decision to return.
struct Step {
    tokens: Vec<String>,
    decision: Result<Decision, DecisionError>,
}

/// A decision source that replays a fixed script and records every context
/// it was shown.
struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    seen: Mutex<Vec<DecisionContext>>,
    /// When set, each decision waits for one permit first.
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedSource {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            seen: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    fn gated(steps: Vec<Step>, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(steps)
        }
    }

    fn contexts(&self) -> Vec<DecisionContext> {
        self.seen.lock().unwrap().clone()
    }

    fn next_step(&self, ctx: &DecisionContext) -> Result<Step, DecisionError> {
        self.seen.lock().unwrap().push(ctx.clone());
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DecisionError::Unavailable("script exhausted".into()))
    }
}

#[async_trait]
impl DecisionSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn decide(&self, ctx: &DecisionContext) -> Result<Decision, DecisionError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.map_err(|_| {
                DecisionError::Unavailable("gate closed".into())
            })?.forget();
        }
        self.next_step(ctx)?.decision
    }

    async fn decide_streaming(
        &self,
        ctx: &DecisionContext,
        tokens: &ratchet_core::stream::StreamProducer,
    ) -> Result<Decision, DecisionError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.map_err(|_| {
                DecisionError::Unavailable("gate closed".into())
            })?.forget();
        }
        let step = self.next_step(ctx)?;
        for t in &step.tokens {
            let _ = tokens.token(t.clone());
        }
        step.decision
    }
}

fn step(decision: Decision) -> Step {
    Step {
        tokens: Vec::new(),
        decision: Ok(decision),
    }
}

fn streamed_step(tokens: &[&str], decision: Decision) -> Step {
    Step {
        tokens: tokens.iter().map(|s| s.to_string()).collect(),
        decision: Ok(decision),
    }
}

fn call(name: &str, args: serde_json::Value) -> Decision {
    let serde_json::Value::Object(map) = args else {
        panic!("args must be an object");
    };
    Decision::action(Action::new(name, map))
}

fn terminal(answer: &str) -> Decision {
    call("final_answer", serde_json::json!({ "answer": answer }))
}

fn session() -> Session {
    Session::new(Arc::new(InMemoryHistory::new()))
}

fn agent(source: ScriptedSource) -> (AgentLoop, Arc<ScriptedSource>) {
    let source = Arc::new(source);
    let registry = Arc::new(standard_registry().unwrap());
    (
        AgentLoop::new(Arc::clone(&source) as Arc<dyn DecisionSource>, registry),
        source,
    )
}

fn pairs(entries: &[ScratchpadEntry]) -> Vec<(&str, bool)> {
    // (capability name, paired result is_error) for each action/result pair
    entries
        .chunks(2)
        .filter_map(|chunk| match chunk {
            [ScratchpadEntry::Action(a), ScratchpadEntry::Result(r)] => {
                Some((a.name.as_str(), r.is_error))
            }
            _ => None,
        })
        .collect()
}

// ── Scenario 1: one dispatch, then terminal ───────────────────────────────

#[tokio::test]
async fn single_dispatch_then_terminal() {
    init_tracing();
    let (agent, source) = agent(ScriptedSource::new(vec![
        step(call("add", serde_json::json!({"x": 2, "y": 3}))),
        step(terminal("5")),
    ]));
    let session = session();

    let outcome = agent.run(&session, "what is 2 + 3?").await.unwrap();

    let TurnOutcome::Done { output, iterations } = outcome else {
        panic!("expected Done, got {outcome:?}");
    };
    assert_eq!(iterations, 1);
    assert_eq!(output["answer"], "5");

    // The second decision saw exactly one action/result pair.
    let contexts = source.contexts();
    assert_eq!(contexts.len(), 2);
    assert!(contexts[0].scratchpad.is_empty());
    assert_eq!(pairs(&contexts[1].scratchpad), vec![("add", false)]);
    match &contexts[1].scratchpad[1] {
        ScratchpadEntry::Result(r) => assert_eq!(r.content, serde_json::json!(5.0)),
        other => panic!("expected result entry, got {other:?}"),
    }

    assert_eq!(session.history().len().await.unwrap(), 1);
}

// ── Scenario 2: error result, recovery, terminal ──────────────────────────

#[tokio::test]
async fn handler_error_feeds_back_and_recovers() {
    init_tracing();
    let (agent, source) = agent(ScriptedSource::new(vec![
        step(call("divide", serde_json::json!({"x": 4, "y": 0}))),
        step(call("add", serde_json::json!({"x": 4, "y": 0}))),
        step(terminal("4")),
    ]));
    let session = session();

    let outcome = agent.run(&session, "what is 4 / 0?").await.unwrap();
    assert!(outcome.is_done());
    assert_eq!(outcome.iterations(), 2);

    // Third decision saw: error result for divide, then a clean add result.
    let contexts = source.contexts();
    assert_eq!(pairs(&contexts[2].scratchpad), vec![("divide", true), ("add", false)]);
    match &contexts[2].scratchpad[1] {
        ScratchpadEntry::Result(r) => {
            assert!(r.content.as_str().unwrap().contains("Division by zero"));
        }
        other => panic!("expected result entry, got {other:?}"),
    }
}

// ── Scenario 3: budget exhaustion ─────────────────────────────────────────

#[tokio::test]
async fn budget_forces_exhausted() {
    init_tracing();
    let (agent, _source) = agent(ScriptedSource::new(vec![
        step(call("add", serde_json::json!({"x": 1, "y": 1}))),
        step(call("add", serde_json::json!({"x": 1, "y": 1}))),
    ]));
    let agent = agent.with_max_iterations(1);
    let session = session();

    let outcome = agent.run(&session, "loop forever").await.unwrap();
    assert_eq!(outcome, TurnOutcome::Exhausted { iterations: 1 });

    // An exhausted turn commits nothing.
    assert_eq!(session.history().len().await.unwrap(), 0);
}

// ── Scenario 4: streaming completeness ────────────────────────────────────

#[tokio::test]
async fn streaming_two_steps_then_done() {
    init_tracing();
    let (agent, _source) = agent(ScriptedSource::new(vec![
        streamed_step(&["add", "(2, 3)"], call("add", serde_json::json!({"x": 2, "y": 3}))),
        streamed_step(&["multiply"], call("multiply", serde_json::json!({"x": 5, "y": 4}))),
        streamed_step(&["the answer", " is 20"], terminal("20")),
    ]));
    let session = session();

    let (tx, mut rx) = channel(64, OverflowPolicy::DropOldest);
    let outcome = agent.run_streaming(&session, "what is (2 + 3) * 4?", tx).await.unwrap();
    assert!(outcome.is_done());

    let mut events = Vec::new();
    while let Some(ev) = rx.recv().await {
        events.push(ev);
    }

    let step_ends = events.iter().filter(|e| **e == TokenEvent::StepEnd).count();
    let dones = events.iter().filter(|e| **e == TokenEvent::Done).count();
    assert_eq!(step_ends, 2, "one STEP_END per non-terminal iteration");
    assert_eq!(dones, 1, "DONE exactly once");
    assert_eq!(events.last(), Some(&TokenEvent::Done), "DONE is last");

    // All tokens of the terminal decision precede DONE.
    let done_pos = events.iter().position(|e| *e == TokenEvent::Done).unwrap();
    let answer_pos = events
        .iter()
        .position(|e| matches!(e, TokenEvent::Token { content } if content == " is 20"))
        .unwrap();
    assert!(answer_pos < done_pos);
}

// ── Scenario 5: cancellation mid-turn ─────────────────────────────────────

#[tokio::test]
async fn cancellation_mid_second_iteration() {
    init_tracing();
    let gate = Arc::new(Semaphore::new(0));
    let source = Arc::new(ScriptedSource::gated(
        vec![
            step(call("add", serde_json::json!({"x": 1, "y": 1}))),
            step(call("add", serde_json::json!({"x": 2, "y": 2}))),
            step(terminal("never reached")),
        ],
        Arc::clone(&gate),
    ));
    let registry = Arc::new(standard_registry().unwrap());
    let agent =
        AgentLoop::new(Arc::clone(&source) as Arc<dyn DecisionSource>, registry);

    let history = Arc::new(InMemoryHistory::new());
    let session = Session::new(Arc::clone(&history) as Arc<dyn ratchet_core::HistoryStore>);

    let (tx, mut rx) = channel(64, OverflowPolicy::DropOldest);
    let task = tokio::spawn(async move { agent.run_streaming(&session, "cancel me", tx).await });

    // Let the first iteration complete, then cancel while the second
    // decision is still gated.
    gate.add_permits(1);
    loop {
        match rx.recv().await {
            Some(TokenEvent::StepEnd) => break,
            Some(_) => continue,
            None => panic!("channel ended before first STEP_END"),
        }
    }
    rx.close();
    gate.add_permits(1);

    let outcome = task.await.unwrap().unwrap();
    assert!(matches!(outcome, TurnOutcome::Cancelled { .. }));
    assert_eq!(history.len().await.unwrap(), 0, "cancelled turn commits nothing");
}

// ── Additional properties ─────────────────────────────────────────────────

#[tokio::test]
async fn text_decision_ends_turn_directly() {
    init_tracing();
    let (agent, _source) = agent(ScriptedSource::new(vec![step(Decision::text("just hello"))]));
    let session = session();

    let outcome = agent.run(&session, "say hello").await.unwrap();
    assert_eq!(outcome.output(), Some(&serde_json::json!("just hello")));
    assert_eq!(outcome.iterations(), 0);
    assert_eq!(session.history().len().await.unwrap(), 1);
}

#[tokio::test]
async fn unknown_capability_becomes_error_result() {
    init_tracing();
    let (agent, source) = agent(ScriptedSource::new(vec![
        step(call("teleport", serde_json::json!({"to": "mars"}))),
        step(terminal("stayed home")),
    ]));
    let session = session();

    let outcome = agent.run(&session, "teleport me").await.unwrap();
    assert!(outcome.is_done());

    let contexts = source.contexts();
    assert_eq!(pairs(&contexts[1].scratchpad), vec![("teleport", true)]);
    match &contexts[1].scratchpad[1] {
        ScratchpadEntry::Result(r) => {
            assert!(r.content.as_str().unwrap().contains("Unknown capability"));
        }
        other => panic!("expected result entry, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_arguments_become_error_result_without_execution() {
    init_tracing();
    let (agent, source) = agent(ScriptedSource::new(vec![
        step(call("add", serde_json::json!({"x": "two"}))),
        step(terminal("gave up")),
    ]));
    let session = session();

    let outcome = agent.run(&session, "add badly").await.unwrap();
    assert!(outcome.is_done());

    let contexts = source.contexts();
    match &contexts[1].scratchpad[1] {
        ScratchpadEntry::Result(r) => {
            assert!(r.is_error);
            let msg = r.content.as_str().unwrap();
            assert!(msg.contains("x"), "failing fields listed: {msg}");
            assert!(msg.contains("y"), "failing fields listed: {msg}");
        }
        other => panic!("expected result entry, got {other:?}"),
    }
}

#[tokio::test]
async fn multiple_proposed_actions_dispatch_first_only() {
    init_tracing();
    let mut a1 = serde_json::Map::new();
    a1.insert("x".into(), serde_json::json!(1));
    a1.insert("y".into(), serde_json::json!(2));
    let mut a2 = serde_json::Map::new();
    a2.insert("x".into(), serde_json::json!(3));
    a2.insert("y".into(), serde_json::json!(4));

    let (agent, source) = agent(ScriptedSource::new(vec![
        step(Decision::actions(vec![
            Action::new("add", a1),
            Action::new("multiply", a2),
        ])),
        step(terminal("3")),
    ]));
    let session = session();

    let outcome = agent.run(&session, "do two things").await.unwrap();
    assert_eq!(outcome.iterations(), 1);

    let contexts = source.contexts();
    assert_eq!(pairs(&contexts[1].scratchpad), vec![("add", false)]);
}

#[tokio::test]
async fn adapter_failure_is_fatal_and_uncommitted() {
    init_tracing();
    let (agent, _source) = agent(ScriptedSource::new(vec![
        step(call("add", serde_json::json!({"x": 1, "y": 1}))),
        Step {
            tokens: Vec::new(),
            decision: Err(DecisionError::Unavailable("connection refused".into())),
        },
    ]));
    let session = session();

    let err = agent.run(&session, "flaky").await.unwrap_err();
    assert!(matches!(err, Error::Decision(DecisionError::Unavailable(_))));
    assert_eq!(session.history().len().await.unwrap(), 0);
}

#[tokio::test]
async fn history_view_is_windowed() {
    init_tracing();
    let history = Arc::new(InMemoryHistory::new());
    for i in 0..5 {
        history
            .append(ratchet_core::TurnRecord::new(
                format!("q{i}"),
                serde_json::json!("a"),
            ))
            .await
            .unwrap();
    }
    let session = Session::new(Arc::clone(&history) as Arc<dyn ratchet_core::HistoryStore>);

    let (agent, source) = agent(ScriptedSource::new(vec![step(terminal("done"))]));
    let agent = agent.with_history_window(2);

    agent.run(&session, "windowed").await.unwrap();

    let contexts = source.contexts();
    assert_eq!(contexts[0].history.len(), 2);
    assert_eq!(contexts[0].history[0].input, "q3");
}

#[tokio::test]
async fn completed_turns_accumulate_in_history() {
    init_tracing();
    let (agent, _source) = agent(ScriptedSource::new(vec![
        step(terminal("first")),
        step(terminal("second")),
    ]));
    let session = session();

    agent.run(&session, "turn one").await.unwrap();
    agent.run(&session, "turn two").await.unwrap();

    let view = session.history().context_for(10).await.unwrap();
    assert_eq!(view.len(), 2);
    assert_eq!(view[0].input, "turn one");
    assert_eq!(view[1].output["answer"], "second");
}
