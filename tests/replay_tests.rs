//! Replay through the simulated engine: isolation and failure handling.

use std::time::Duration;

use dbpilot_core::features::OperatingUnitType;
use dbpilot_core::id::{DbOid, QueryId};
use dbpilot_core::types::{ParamType, ParamValue};
use dbpilot_core::{KnobSettings, KnobValue};
use dbpilot_forecast::{QueryRecord, QueryTrace, WorkloadForecast};
use dbpilot_oracle::{
    group_features_by_ou, CostOracle, EngineError, LinearCostModel, OracleError, ReplayOracle,
};
use dbpilot_sim::{SimDatabase, SimEngine, Table, KNOB_INDEX_SCAN};

fn engine() -> SimEngine {
    let mut db = SimDatabase::new();
    let mut t = Table::new(vec!["id".into(), "qty".into()]);
    t.rows = (0..32).map(|i| vec![i, 100 - i]).collect();
    db.create_table("stock", t).unwrap();
    SimEngine::new(db)
}

fn mixed_forecast() -> WorkloadForecast {
    let mut trace = QueryTrace::new();
    let queries = [
        (1, "SELECT * FROM stock WHERE id = $1"),
        (2, "UPDATE stock SET qty = 0 WHERE id = $1"),
        (3, "DELETE FROM stock WHERE id = $1"),
        (4, "INSERT INTO stock VALUES ($1, 1)"),
    ];
    for (id, text) in queries {
        trace
            .register(QueryRecord {
                query_id: QueryId::new(id),
                db_oid: DbOid::new(1),
                text: text.into(),
                param_types: vec![ParamType::Integer],
            })
            .unwrap();
    }
    for ts in 0..40u64 {
        let q = ts % 4 + 1;
        trace
            .record(QueryId::new(q), ts * 5, vec![ParamValue::Int((ts % 7) as i64)])
            .unwrap();
    }
    WorkloadForecast::build(&trace, 50, 5).unwrap()
}

#[test]
fn replaying_twice_leaves_tables_untouched() {
    let engine = engine();
    let before = engine.table("stock").unwrap();
    let forecast = mixed_forecast();
    let window = forecast.full_window().unwrap();
    let oracle = ReplayOracle::new(&engine, LinearCostModel::uniform(), Duration::from_secs(1));

    let first = oracle
        .collect_features(&forecast, window, &KnobSettings::new())
        .unwrap();
    let second = oracle
        .collect_features(&forecast, window, &KnobSettings::new())
        .unwrap();

    assert_eq!(engine.table("stock").unwrap(), before);
    assert_eq!(first, second);
    assert_eq!(engine.open_transactions(), 0);
    assert_eq!(engine.begun(), oracle.replay_count());

    // select has one pipeline; update and delete have two; insert has one
    assert_eq!(first.len(), 6);
    let grouped = group_features_by_ou(&first);
    assert!(grouped.batches.contains_key(&OperatingUnitType::Update));
    assert!(grouped.batches.contains_key(&OperatingUnitType::Insert));
}

#[test]
fn hypothetical_settings_change_cost_without_touching_live_state() {
    let engine = engine();
    let forecast = mixed_forecast();
    let window = forecast.full_window().unwrap();
    let oracle = ReplayOracle::new(&engine, LinearCostModel::uniform(), Duration::from_secs(1));

    let seq = oracle
        .evaluate(&forecast, window, &KnobSettings::new())
        .unwrap();
    let idx = oracle
        .evaluate(
            &forecast,
            window,
            &KnobSettings::new().with(KNOB_INDEX_SCAN, KnobValue::Bool(true)),
        )
        .unwrap();
    assert!(idx < seq, "index scans should be cheaper: {idx} vs {seq}");
}

#[test]
fn dropped_table_makes_the_trace_stale() {
    let engine = engine();
    engine.drop_table("stock").unwrap();
    let forecast = mixed_forecast();
    let oracle = ReplayOracle::new(&engine, LinearCostModel::uniform(), Duration::from_secs(1));

    let err = oracle
        .evaluate(&forecast, forecast.full_window().unwrap(), &KnobSettings::new())
        .unwrap_err();
    match err {
        OracleError::StaleTraceReference { query_id, source } => {
            assert_eq!(query_id, QueryId::new(1));
            assert!(matches!(source, EngineError::Bind(_)));
        }
        other => panic!("unexpected {other}"),
    }
    assert_eq!(engine.open_transactions(), 0);
}

#[test]
fn optimizer_timeout_is_a_stale_trace() {
    let engine = engine();
    let forecast = mixed_forecast();
    let oracle = ReplayOracle::new(&engine, LinearCostModel::uniform(), Duration::ZERO);
    let err = oracle
        .collect_features(&forecast, forecast.full_window().unwrap(), &KnobSettings::new())
        .unwrap_err();
    assert!(matches!(
        err,
        OracleError::StaleTraceReference {
            source: EngineError::OptimizeTimeout(_),
            ..
        }
    ));
    assert_eq!(engine.open_transactions(), 0);
}

#[test]
fn execution_failure_aborts_then_fails() {
    let engine = engine();
    engine.fail_executions_on("stock");
    let forecast = mixed_forecast();
    let oracle = ReplayOracle::new(&engine, LinearCostModel::uniform(), Duration::from_secs(1));
    let err = oracle
        .collect_features(&forecast, forecast.full_window().unwrap(), &KnobSettings::new())
        .unwrap_err();
    assert!(matches!(err, OracleError::ReplayExecutionFailure { .. }));
    assert_eq!(engine.begun(), 1);
    assert_eq!(engine.aborted(), 1);
}
