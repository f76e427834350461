//! Full planning cycles over the simulated engine.

use dbpilot_core::id::{DbOid, QueryId};
use dbpilot_core::types::{ParamType, ParamValue};
use dbpilot_core::{ActionCatalog, KnobSettings, KnobValue, PilotConfig};
use dbpilot_forecast::{QueryRecord, QueryTrace};
use dbpilot_oracle::LinearCostModel;
use dbpilot_planner::{generate_actions, KnobSpace, Pilot, PlanningOutcome, SkipReason};
use dbpilot_sim::{SimDatabase, SimEngine, SimSettings, Table, KNOB_INDEX_SCAN, KNOB_OUTPUT_BATCH};

fn engine() -> SimEngine {
    let mut db = SimDatabase::new();
    let mut t = Table::new(vec!["id".into(), "grp".into()]);
    t.rows = (0..200).map(|i| vec![i, i % 10]).collect();
    db.create_table("events", t).unwrap();
    SimEngine::new(db)
}

fn trace() -> QueryTrace {
    let mut trace = QueryTrace::new();
    trace
        .register(QueryRecord {
            query_id: QueryId::new(1),
            db_oid: DbOid::new(1),
            text: "SELECT * FROM events WHERE grp = $1".into(),
            param_types: vec![ParamType::Integer],
        })
        .unwrap();
    for ts in 0..30u64 {
        trace
            .record(QueryId::new(1), ts * 10, vec![ParamValue::Int((ts % 3) as i64)])
            .unwrap();
    }
    trace
}

fn knob_space() -> KnobSpace {
    KnobSpace {
        bool_knobs: vec![KNOB_INDEX_SCAN.into()],
        int_knobs: [(KNOB_OUTPUT_BATCH.to_string(), vec![8])].into_iter().collect(),
    }
}

fn live_settings() -> SimSettings {
    SimSettings::new(
        KnobSettings::new()
            .with(KNOB_INDEX_SCAN, KnobValue::Bool(false))
            .with(KNOB_OUTPUT_BATCH, KnobValue::Int(1)),
    )
}

fn config() -> PilotConfig {
    PilotConfig {
        forecast_interval_us: 100,
        rollout_budget: 8,
        seed: Some(17),
        ..PilotConfig::default()
    }
}

#[test]
fn cycle_applies_exactly_one_action_and_reports_it() {
    let mut pilot = Pilot::new(
        config(),
        trace(),
        engine(),
        live_settings(),
        generate_actions(&knob_space()).unwrap(),
        LinearCostModel::uniform(),
    )
    .unwrap();

    let outcome = pilot.perform_planning().unwrap();
    let PlanningOutcome::Applied(manifest) = outcome else {
        panic!("expected an applied action");
    };
    assert_eq!(pilot.num_segments(), 3);
    assert_eq!(manifest.num_segments, 3);
    assert_eq!(manifest.num_candidate_actions, 3);
    assert!(manifest.rollouts >= 1 && manifest.rollouts <= 8);
    assert!(manifest.tree_size > 3);
    assert!(manifest.finished_ms >= manifest.started_ms);

    assert_eq!(pilot.settings().applied(), &[manifest.applied_action]);
    let applied = pilot.catalog().lookup(manifest.applied_action).unwrap();
    let before = live_settings().values().clone();
    let mut expected = before.clone();
    applied.apply(&mut expected).unwrap();
    assert_eq!(pilot.settings().values(), &expected);

    // replays never leave a transaction open or change the data
    assert_eq!(pilot.engine().open_transactions(), 0);
    assert_eq!(pilot.engine().table("events").unwrap().len(), 200);
}

#[test]
fn consecutive_cycles_rebuild_their_forecast() {
    let mut pilot = Pilot::new(
        config(),
        trace(),
        engine(),
        live_settings(),
        generate_actions(&knob_space()).unwrap(),
        LinearCostModel::uniform(),
    )
    .unwrap();
    pilot.perform_planning().unwrap();
    pilot.perform_planning().unwrap();
    assert_eq!(pilot.settings().applied().len(), 2);
    assert_eq!(pilot.num_segments(), 3);
}

#[test]
fn skipped_cycles_are_distinct_from_failures() {
    let mut empty_trace = Pilot::new(
        config(),
        QueryTrace::new(),
        engine(),
        live_settings(),
        generate_actions(&knob_space()).unwrap(),
        LinearCostModel::uniform(),
    )
    .unwrap();
    assert!(matches!(
        empty_trace.perform_planning().unwrap(),
        PlanningOutcome::Skipped(SkipReason::EmptyForecast)
    ));
    assert_eq!(empty_trace.num_segments(), 0);

    let mut no_actions = Pilot::new(
        config(),
        trace(),
        engine(),
        live_settings(),
        ActionCatalog::empty(),
        LinearCostModel::uniform(),
    )
    .unwrap();
    assert!(matches!(
        no_actions.perform_planning().unwrap(),
        PlanningOutcome::Skipped(SkipReason::NoCandidateActions)
    ));
    assert!(no_actions.settings().applied().is_empty());
    assert_eq!(no_actions.engine().begun(), 0);
}

#[test]
fn failed_cycle_leaves_configuration_alone() {
    let engine = engine();
    engine.fail_executions_on("events");
    let mut pilot = Pilot::new(
        config(),
        trace(),
        engine,
        live_settings(),
        generate_actions(&knob_space()).unwrap(),
        LinearCostModel::uniform(),
    )
    .unwrap();
    assert!(pilot.perform_planning().is_err());
    assert!(pilot.settings().applied().is_empty());
    assert_eq!(pilot.settings().values(), live_settings().values());
    assert_eq!(pilot.engine().open_transactions(), 0);
}

#[test]
fn planning_horizon_limits_the_window() {
    let cfg = PilotConfig {
        planning_horizon_segments: Some(1),
        ..config()
    };
    let mut pilot = Pilot::new(
        cfg,
        trace(),
        engine(),
        live_settings(),
        generate_actions(&knob_space()).unwrap(),
        LinearCostModel::uniform(),
    )
    .unwrap();
    let outcome = pilot.perform_planning().unwrap();
    let manifest = outcome.manifest().unwrap();
    // a one-segment window caps the search at depth one: a single expansion
    assert_eq!(manifest.rollouts, 1);
    assert_eq!(manifest.tree_size, 4);
}

#[test]
fn generated_actions_are_reversible() {
    let catalog = generate_actions(&knob_space()).unwrap();
    let start = live_settings().values().clone();
    for action in catalog.iter() {
        let inverse = catalog.lookup(catalog.inverse_of(action.id).unwrap()).unwrap();
        let mut s = start.clone();
        action.apply(&mut s).unwrap();
        inverse.apply(&mut s).unwrap();
        assert_eq!(s, start);

        // toggles: applying twice restores
        if inverse.id == action.id {
            let mut twice = start.clone();
            action.apply(&mut twice).unwrap();
            action.apply(&mut twice).unwrap();
            assert_eq!(twice, start);
        }
    }
}
