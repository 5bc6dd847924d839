//! Invariant checks over generated operation sequences.
//!
//! Sequences come from a fixed-seed generator so failures replay exactly.

use std::path::Path;

use coordination::{
    CoordError, Engine, EngineConfig, InitRequest, Mode, NewTask, Project, RoundAction,
    RoundPhase, TaskStatus,
};
use tempfile::{tempdir, TempDir};

fn setup() -> (TempDir, Engine) {
    let dir = tempdir().expect("Failed to create temp dir");
    let engine = Engine::new(EngineConfig::default().with_data_dir(dir.path()));
    (dir, engine)
}

/// Small deterministic generator (64-bit LCG).
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

fn hash_file(path: &Path) -> blake3::Hash {
    blake3::hash(&std::fs::read(path).expect("record readable"))
}

fn assert_ready_sound(project: &Project, ready: &[String]) {
    for id in ready {
        let task = project.task(id).unwrap();
        assert_eq!(task.status, TaskStatus::Pending, "{id} is ready but not pending");
        for dep in &task.dependencies {
            assert_eq!(
                project.task(dep).unwrap().status,
                TaskStatus::Done,
                "{id} is ready but dependency {dep} is not done"
            );
        }
    }
}

// ── dag readiness ──────────────────────────────────────────────────

#[test]
fn test_ready_set_sound_under_random_updates() {
    let (_dir, engine) = setup();
    engine.init(InitRequest::new("g", Mode::Dag)).unwrap();

    let mut rng = Lcg(7);
    let mut ids: Vec<String> = Vec::new();
    for i in 0..12 {
        let id = format!("t{i}");
        let deps: Vec<String> = ids.iter().filter(|_| rng.below(3) == 0).cloned().collect();
        engine
            .add_task("g", NewTask::new(&id).depends_on(deps))
            .unwrap();
        ids.push(id);
    }

    let statuses = TaskStatus::all();
    for _ in 0..300 {
        let id = &ids[rng.below(ids.len())];
        let to = statuses[rng.below(statuses.len())];
        // Illegal moves must fail without touching the record.
        let _ = engine.update("g", id, to);

        let project = engine.load("g").unwrap();
        let ready: Vec<String> = engine
            .ready("g")
            .unwrap()
            .ready
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_ready_sound(&project, &ready);
    }
}

#[test]
fn test_cycle_rejected_without_mutation() {
    let (dir, engine) = setup();
    engine
        .init(InitRequest::new("g", Mode::Dag).members(["a"]))
        .unwrap();
    engine
        .add_task("g", NewTask::new("b").depends_on(["a"]))
        .unwrap();
    engine
        .add_task("g", NewTask::new("c").depends_on(["b"]))
        .unwrap();

    let record = dir.path().join("g.json");
    let before = hash_file(&record);

    let err = engine
        .add_dependencies("g", "a", &["c".to_string()])
        .unwrap_err();
    assert!(matches!(err, CoordError::DependencyCycle { .. }));
    assert_eq!(err.exit_code(), 3);

    let err = engine
        .add_dependencies("g", "b", &["b".to_string()])
        .unwrap_err();
    assert!(matches!(err, CoordError::DependencyCycle { .. }));

    let err = engine
        .add_task("g", NewTask::new("d").depends_on(["ghost"]))
        .unwrap_err();
    assert!(matches!(err, CoordError::MissingDependency { .. }));

    assert_eq!(hash_file(&record), before);
}

#[test]
fn test_random_edges_never_form_cycle() {
    let (_dir, engine) = setup();
    engine.init(InitRequest::new("g", Mode::Dag)).unwrap();
    let ids: Vec<String> = (0..8).map(|i| format!("n{i}")).collect();
    for id in &ids {
        engine.add_task("g", NewTask::new(id)).unwrap();
    }

    let mut rng = Lcg(42);
    for _ in 0..60 {
        let from = &ids[rng.below(ids.len())];
        let to = ids[rng.below(ids.len())].clone();
        match engine.add_dependencies("g", from, &[to]) {
            Ok(_) | Err(CoordError::DependencyCycle { .. }) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    // Layering only succeeds on an acyclic graph.
    assert!(engine.graph("g").is_ok());
}

// ── linear cursor ──────────────────────────────────────────────────

#[test]
fn test_next_position_ignores_result_calls() {
    let stages = ["a", "b", "c", "d"];
    let mut positions = Vec::new();

    for seed in [1u64, 2, 3] {
        let (_dir, engine) = setup();
        engine
            .init(InitRequest::new("l", Mode::Linear).members(stages))
            .unwrap();
        let mut rng = Lcg(seed);
        let mut trace = Vec::new();

        for stage in &stages[..3] {
            for _ in 0..rng.below(4) {
                let target = stages[rng.below(stages.len())];
                engine.record_result("l", target, "note").unwrap();
            }
            engine.update("l", stage, TaskStatus::InProgress).unwrap();
            engine.update("l", stage, TaskStatus::Done).unwrap();
            trace.push(engine.next("l").unwrap().stage_id().map(String::from));
        }
        positions.push(trace);
    }

    assert!(positions.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(
        positions[0],
        vec![Some("b".to_string()), Some("c".to_string()), Some("d".to_string())]
    );
}

#[test]
fn test_next_never_passes_unfinished_stage() {
    let (_dir, engine) = setup();
    engine
        .init(InitRequest::new("l", Mode::Linear).members(["a", "b", "c"]))
        .unwrap();
    let stages = ["a", "b", "c"];
    let mut rng = Lcg(99);

    for _ in 0..200 {
        let id = stages[rng.below(3)];
        let all = TaskStatus::all();
        let to = all[rng.below(all.len())];
        let _ = engine.update("l", id, to);
        if rng.below(10) == 0 {
            let _ = engine.advance("l");
        }

        let project = engine.load("l").unwrap();
        assert!(project.current_stage <= project.tasks.len());
        for (i, stage) in project.tasks.iter().enumerate() {
            if i < project.current_stage {
                assert!(stage.status.is_terminal(), "stage {i} behind cursor is {}", stage.status);
            } else if i > project.current_stage {
                assert_ne!(stage.status, TaskStatus::InProgress, "stage {i} runs ahead of cursor");
            }
        }
        if project.tasks.iter().all(|s| s.status == TaskStatus::Done) {
            assert!(engine.next("l").unwrap().is_complete());
        }
    }
}

// ── debate phases ──────────────────────────────────────────────────

#[test]
fn test_round_phases_strictly_ordered() {
    let (_dir, engine) = setup();
    engine
        .init(InitRequest::new("d", Mode::Debate).members(["x", "y"]))
        .unwrap();

    let actions = || {
        vec![
            RoundAction::Start,
            RoundAction::Submit {
                debater: "x".into(),
                text: "a".into(),
            },
            RoundAction::Submit {
                debater: "y".into(),
                text: "b".into(),
            },
            RoundAction::CrossReview,
            RoundAction::Synthesize { text: "s".into() },
        ]
    };

    let mut rng = Lcg(5);
    for _ in 0..150 {
        let all = actions();
        let action = all[rng.below(all.len())].clone();
        let _ = engine.round("d", action);

        let project = engine.load("d").unwrap();
        for (i, round) in project.rounds.iter().enumerate() {
            assert_eq!(round.number as usize, i + 1);
            if i + 1 < project.rounds.len() {
                assert_eq!(round.phase, RoundPhase::Synthesized);
            }
            let path: Vec<(RoundPhase, RoundPhase)> =
                round.transitions.iter().map(|t| (t.from, t.to)).collect();
            let expected = [
                (RoundPhase::Open, RoundPhase::CrossReview),
                (RoundPhase::CrossReview, RoundPhase::Synthesized),
            ];
            assert_eq!(path.as_slice(), &expected[..path.len()]);
            if round.phase != RoundPhase::Open {
                assert_eq!(round.submissions.len(), 2);
            }
        }
    }
}

// ── reset ──────────────────────────────────────────────────────────

type Replay = fn(&Engine);

fn replay_dag(engine: &Engine) {
    engine.add_task("p", NewTask::new("a").agent("alpha")).unwrap();
    engine
        .add_task("p", NewTask::new("b").depends_on(["a"]).description("second"))
        .unwrap();
    engine.add_task("p", NewTask::new("c")).unwrap();
    engine
        .add_dependencies("p", "c", &["b".to_string()])
        .unwrap();
}

fn replay_debate(engine: &Engine) {
    engine.add_debater("p", "d1", "for", None).unwrap();
    engine
        .add_debater("p", "d2", "against", Some("bot".into()))
        .unwrap();
}

fn definitions(project: &Project) -> (Vec<(String, String, String, Vec<String>)>, Vec<(String, String, String)>) {
    (
        project
            .tasks
            .iter()
            .map(|t| {
                (
                    t.id.clone(),
                    t.agent.clone(),
                    t.description.clone(),
                    t.dependencies.clone(),
                )
            })
            .collect(),
        project
            .debaters
            .iter()
            .map(|d| (d.id.clone(), d.agent.clone(), d.perspective.clone()))
            .collect(),
    )
}

#[test]
fn test_reset_then_replay_recreates_entities() {
    let cases: [(Mode, Replay); 2] = [(Mode::Dag, replay_dag), (Mode::Debate, replay_debate)];
    for (mode, replay) in cases {
        let (_dir, engine) = setup();
        engine
            .init(InitRequest::new("p", mode).goal("g"))
            .unwrap();
        replay(&engine);
        if mode == Mode::Dag {
            engine.update("p", "a", TaskStatus::InProgress).unwrap();
            engine.record_result("p", "a", "half").unwrap();
        } else {
            engine.round("p", RoundAction::Start).unwrap();
        }
        let original = definitions(&engine.load("p").unwrap());

        let reset = engine.reset("p").unwrap();
        assert!(reset.tasks.is_empty() && reset.debaters.is_empty() && reset.rounds.is_empty());
        replay(&engine);

        let replayed = engine.load("p").unwrap();
        assert_eq!(definitions(&replayed), original);
        assert!(replayed
            .tasks
            .iter()
            .all(|t| t.status == TaskStatus::Pending && t.result.is_none()));
        assert_eq!(replayed.goal, "g");
        assert_eq!(replayed.mode, mode);
    }
}

#[test]
fn test_reset_linear_restores_fresh_pipeline() {
    let (_dir, engine) = setup();
    let fresh = engine
        .init(InitRequest::new("p", Mode::Linear).members(["x", "y"]))
        .unwrap();
    engine.update("p", "x", TaskStatus::InProgress).unwrap();
    engine.update("p", "x", TaskStatus::Done).unwrap();

    let reset = engine.reset("p").unwrap();
    assert_eq!(definitions(&reset), definitions(&fresh));
    assert_eq!(reset.current_stage, 0);
    assert!(reset.tasks.iter().all(|t| t.status == TaskStatus::Pending));
}

// ── queries are read-only ──────────────────────────────────────────

#[test]
fn test_queries_never_change_stored_bytes() {
    let (dir, engine) = setup();

    engine
        .init(InitRequest::new("lin", Mode::Linear).members(["x", "y"]))
        .unwrap();
    engine.update("lin", "x", TaskStatus::InProgress).unwrap();

    engine
        .init(InitRequest::new("dag", Mode::Dag).members(["a"]))
        .unwrap();
    engine
        .add_task("dag", NewTask::new("b").depends_on(["a"]))
        .unwrap();

    engine
        .init(InitRequest::new("deb", Mode::Debate).members(["d1", "d2"]))
        .unwrap();
    engine.round("deb", RoundAction::Start).unwrap();

    let records = ["lin", "dag", "deb"].map(|p| dir.path().join(format!("{p}.json")));
    let before: Vec<blake3::Hash> = records.iter().map(|p| hash_file(p)).collect();

    for project in ["lin", "dag", "deb"] {
        let _ = engine.status(project).unwrap();
        let _ = engine.log(project, None).unwrap();
        let _ = engine.log(project, Some(1)).unwrap();
        let _ = engine.graph(project);
        let _ = engine.next(project);
        let _ = engine.ready(project);
        let _ = engine.round_status(project);
        let _ = engine.review_prompts(project);
    }
    let _ = engine.list().unwrap();

    let after: Vec<blake3::Hash> = records.iter().map(|p| hash_file(p)).collect();
    assert_eq!(before, after);
}

#[test]
fn test_failed_mutations_never_change_stored_bytes() {
    let (dir, engine) = setup();
    engine
        .init(InitRequest::new("p", Mode::Linear).members(["x", "y"]))
        .unwrap();
    let record = dir.path().join("p.json");
    let before = hash_file(&record);

    assert!(engine.update("p", "x", TaskStatus::Done).is_err());
    assert!(engine.update("p", "y", TaskStatus::InProgress).is_err());
    assert!(engine.update("p", "ghost", TaskStatus::InProgress).is_err());
    assert!(engine.advance("p").is_err());
    assert!(engine.add_task("p", NewTask::new("z")).is_err());
    assert!(engine.round("p", RoundAction::Start).is_err());

    assert_eq!(hash_file(&record), before);
}
