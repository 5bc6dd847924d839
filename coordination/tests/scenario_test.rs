//! End-to-end scenarios against a real on-disk store, one per mode.

use coordination::report::GraphReport;
use coordination::{
    CoordError, Engine, EngineConfig, InitRequest, Mode, NewTask, NextStage, ReadyState,
    RoundAction, RoundPhase, TaskStatus,
};
use tempfile::{tempdir, TempDir};

fn setup() -> (TempDir, Engine) {
    let dir = tempdir().expect("Failed to create temp dir");
    let engine = Engine::new(EngineConfig::default().with_data_dir(dir.path()));
    (dir, engine)
}

fn ready_ids(engine: &Engine, project: &str) -> Vec<String> {
    engine
        .ready(project)
        .unwrap()
        .ready
        .into_iter()
        .map(|t| t.id)
        .collect()
}

fn submit(debater: &str, text: &str) -> RoundAction {
    RoundAction::Submit {
        debater: debater.into(),
        text: text.into(),
    }
}

// ── dag ────────────────────────────────────────────────────────────

#[test]
fn test_dag_scenario() {
    let (_dir, engine) = setup();
    engine.init(InitRequest::new("p", Mode::Dag)).unwrap();
    engine.add_task("p", NewTask::new("A")).unwrap();
    engine
        .add_task("p", NewTask::new("B").depends_on(["A"]))
        .unwrap();

    assert_eq!(ready_ids(&engine, "p"), vec!["A"]);
    engine.update("p", "A", TaskStatus::InProgress).unwrap();
    let outcome = engine.update("p", "A", TaskStatus::Done).unwrap();
    assert_eq!(outcome.unblocked, vec!["B"]);
    assert_eq!(ready_ids(&engine, "p"), vec!["B"]);
}

#[test]
fn test_dag_diamond_to_completion() {
    let (_dir, engine) = setup();
    engine
        .init(InitRequest::new("auth", Mode::Dag).goal("ship login"))
        .unwrap();
    engine
        .add_task("auth", NewTask::new("schema").agent("db-agent"))
        .unwrap();
    engine
        .add_task("auth", NewTask::new("api").depends_on(["schema"]))
        .unwrap();
    engine
        .add_task("auth", NewTask::new("ui").depends_on(["schema"]))
        .unwrap();
    engine
        .add_task(
            "auth",
            NewTask::new("e2e")
                .depends_on(["api", "ui"])
                .description("browser tests"),
        )
        .unwrap();

    for id in ["schema", "api", "ui", "e2e"] {
        assert!(ready_ids(&engine, "auth").contains(&id.to_string()));
        engine.update("auth", id, TaskStatus::InProgress).unwrap();
        engine.update("auth", id, TaskStatus::Done).unwrap();
    }
    assert_eq!(
        engine.ready("auth").unwrap().state,
        ReadyState::AllComplete
    );

    match engine.graph("auth").unwrap() {
        GraphReport::Dag { layers, edges, .. } => {
            assert_eq!(layers, vec![vec!["schema"], vec!["api", "ui"], vec!["e2e"]]);
            assert_eq!(edges.len(), 4);
        }
        other => panic!("expected dag graph, got {:?}", other),
    }
}

#[test]
fn test_dag_failed_task_blocks_until_retried() {
    let (_dir, engine) = setup();
    engine
        .init(InitRequest::new("p", Mode::Dag).members(["a"]))
        .unwrap();
    engine
        .add_task("p", NewTask::new("b").depends_on(["a"]))
        .unwrap();

    engine.update("p", "a", TaskStatus::InProgress).unwrap();
    engine.update("p", "a", TaskStatus::Failed).unwrap();
    let readiness = engine.ready("p").unwrap();
    assert_eq!(readiness.state, ReadyState::Waiting);
    assert!(readiness.ready.is_empty());

    engine.update("p", "a", TaskStatus::Pending).unwrap();
    assert_eq!(ready_ids(&engine, "p"), vec!["a"]);
}

// ── linear ─────────────────────────────────────────────────────────

#[test]
fn test_linear_scenario() {
    let (_dir, engine) = setup();
    engine
        .init(InitRequest::new("p", Mode::Linear).members(["x", "y"]))
        .unwrap();

    assert_eq!(engine.next("p").unwrap().stage_id(), Some("x"));
    engine.update("p", "x", TaskStatus::InProgress).unwrap();
    engine.update("p", "x", TaskStatus::Done).unwrap();
    assert_eq!(engine.next("p").unwrap().stage_id(), Some("y"));
}

#[test]
fn test_linear_out_of_order_start_rejected() {
    let (_dir, engine) = setup();
    engine
        .init(InitRequest::new("p", Mode::Linear).members(["x", "y"]))
        .unwrap();
    let err = engine.update("p", "y", TaskStatus::InProgress).unwrap_err();
    assert!(matches!(err, CoordError::NotCurrentStage { .. }));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_linear_skip_then_advance_to_completion() {
    let (_dir, engine) = setup();
    engine
        .init(InitRequest::new("p", Mode::Linear).members(["plan", "build"]))
        .unwrap();

    engine.update("p", "plan", TaskStatus::InProgress).unwrap();
    engine.update("p", "plan", TaskStatus::Skipped).unwrap();
    assert_eq!(engine.next("p").unwrap().stage_id(), Some("plan"));

    let next = engine.advance("p").unwrap();
    assert_eq!(next.stage_id(), Some("build"));

    engine.update("p", "build", TaskStatus::InProgress).unwrap();
    let outcome = engine.update("p", "build", TaskStatus::Done).unwrap();
    assert!(outcome.pipeline_complete());
    assert!(matches!(
        engine.next("p").unwrap(),
        NextStage::Complete { total: 2 }
    ));
}

#[test]
fn test_linear_rewind_waits_for_running_stage() {
    let (_dir, engine) = setup();
    engine
        .init(InitRequest::new("p", Mode::Linear).members(["x", "y"]))
        .unwrap();
    engine.update("p", "x", TaskStatus::InProgress).unwrap();
    engine.update("p", "x", TaskStatus::Done).unwrap();
    engine.update("p", "y", TaskStatus::InProgress).unwrap();

    let err = engine.update("p", "x", TaskStatus::Pending).unwrap_err();
    assert_eq!(err.exit_code(), 3);
    let project = engine.load("p").unwrap();
    let running = project
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress)
        .count();
    assert_eq!(running, 1);
    assert_eq!(project.current_stage, 1);

    engine.update("p", "y", TaskStatus::Done).unwrap();
    assert!(engine.next("p").unwrap().is_complete());
}

#[test]
fn test_linear_redo_after_rewind_completes_pipeline() {
    let (_dir, engine) = setup();
    engine
        .init(InitRequest::new("p", Mode::Linear).members(["x", "y", "z"]))
        .unwrap();
    for id in ["x", "y"] {
        engine.update("p", id, TaskStatus::InProgress).unwrap();
        engine.update("p", id, TaskStatus::Done).unwrap();
    }

    engine.update("p", "x", TaskStatus::Pending).unwrap();
    assert_eq!(engine.next("p").unwrap().stage_id(), Some("x"));
    engine.update("p", "x", TaskStatus::InProgress).unwrap();
    engine.update("p", "x", TaskStatus::Done).unwrap();
    assert_eq!(engine.next("p").unwrap().stage_id(), Some("z"));

    engine.update("p", "z", TaskStatus::InProgress).unwrap();
    let outcome = engine.update("p", "z", TaskStatus::Done).unwrap();
    assert!(outcome.pipeline_complete());
}

// ── debate ─────────────────────────────────────────────────────────

#[test]
fn test_debate_scenario() {
    let (_dir, engine) = setup();
    engine.init(InitRequest::new("p", Mode::Debate)).unwrap();
    engine.add_debater("p", "d1", "optimist", None).unwrap();
    engine.add_debater("p", "d2", "skeptic", None).unwrap();

    engine.round("p", RoundAction::Start).unwrap();
    engine.round("p", submit("d1", "it works")).unwrap();
    let err = engine.round("p", RoundAction::CrossReview).unwrap_err();
    match &err {
        CoordError::RoundPhase { reason, .. } => assert!(reason.contains("d2")),
        other => panic!("expected round phase error, got {:?}", other),
    }

    engine.round("p", submit("d2", "prove it")).unwrap();
    let outcome = engine.round("p", RoundAction::CrossReview).unwrap();
    assert_eq!(outcome.phase, RoundPhase::CrossReview);
}

#[test]
fn test_debate_two_full_rounds() {
    let (_dir, engine) = setup();
    engine
        .init(InitRequest::new("p", Mode::Debate).goal("monorepo?"))
        .unwrap();
    engine.add_debater("p", "pro", "velocity", None).unwrap();
    engine
        .add_debater("p", "con", "isolation", Some("reviewer-bot".into()))
        .unwrap();

    for round in 1..=2u32 {
        let started = engine.round("p", RoundAction::Start).unwrap();
        assert_eq!(started.round, round);
        engine.round("p", submit("pro", "one build")).unwrap();
        engine.round("p", submit("con", "blast radius")).unwrap();
        engine.round("p", RoundAction::CrossReview).unwrap();

        let prompts = engine.review_prompts("p").unwrap();
        assert_eq!(prompts.prompts[1].agent, "reviewer-bot");
        assert_eq!(prompts.prompts[1].peers[0].text, "one build");

        engine
            .round(
                "p",
                RoundAction::Critique {
                    reviewer: "con".into(),
                    targets: vec!["pro".into()],
                    text: "ignores ownership".into(),
                },
            )
            .unwrap();
        let done = engine
            .round(
                "p",
                RoundAction::Synthesize {
                    text: format!("round {} synthesis", round),
                },
            )
            .unwrap();
        assert_eq!(done.phase, RoundPhase::Synthesized);
    }

    let status = engine.round_status("p").unwrap();
    assert_eq!(status.total_rounds, 2);
    assert_eq!(status.synthesis.as_deref(), Some("round 2 synthesis"));
    assert_eq!(status.debaters[1].critiqued, vec!["pro"]);
}

#[test]
fn test_debate_graph_is_mode_mismatch() {
    let (_dir, engine) = setup();
    engine.init(InitRequest::new("p", Mode::Debate)).unwrap();
    let err = engine.graph("p").unwrap_err();
    assert!(matches!(err, CoordError::ModeMismatch { .. }));
    assert_eq!(err.exit_code(), 4);
}

// ── lifecycle ──────────────────────────────────────────────────────

#[test]
fn test_delete_then_list() {
    let (_dir, engine) = setup();
    engine.init(InitRequest::new("b", Mode::Dag)).unwrap();
    engine.init(InitRequest::new("a", Mode::Debate)).unwrap();
    let names: Vec<String> = engine
        .list()
        .unwrap()
        .projects
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["a", "b"]);

    engine.delete("a").unwrap();
    assert_eq!(engine.list().unwrap().projects.len(), 1);
    assert!(matches!(
        engine.status("a"),
        Err(CoordError::ProjectNotFound { .. })
    ));
}
