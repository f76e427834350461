//! `QueryEngine` over `SimDatabase`.
//!
//! Writes go to a copy-on-write overlay owned by the transaction; `abort`
//! drops the overlay, so the base tables never change through this engine.
//! Execution emits one feature record per pipeline:
//!
//! | statement | pipeline 0            | pipeline 1    |
//! |-----------|-----------------------|---------------|
//! | select    | scan, output          |               |
//! | call      | projection, output    |               |
//! | insert    | insert                |               |
//! | update    | scan                  | update        |
//! | delete    | scan                  | delete        |
//!
//! A filtered scan is an index scan when `enable_index_scan` is on, else a
//! sequential scan; output cost shrinks with `output_batch_size`.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use tracing::{debug, trace};

use dbpilot_core::features::{OperatingUnitType, OuFeature};
use dbpilot_core::id::{DbOid, PipelineId, ProcOid, TxnId};
use dbpilot_core::knob::KnobSettings;
use dbpilot_core::types::{ParamType, ParamValue};
use dbpilot_oracle::{EngineError, MetricsContext, QueryEngine};

use crate::database::{SimDatabase, Table};
use crate::error::{Result, SimError};
use crate::statement::{Operand, Predicate, Statement};
use crate::{KNOB_INDEX_SCAN, KNOB_OUTPUT_BATCH};

#[derive(Debug)]
pub struct SimTxn {
    id: TxnId,
    // table name -> rows as seen by this transaction
    overlay: BTreeMap<String, Vec<Vec<i64>>>,
}

impl SimTxn {
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Number of tables this transaction has written to.
    pub fn dirty_tables(&self) -> usize {
        self.overlay.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimPlan {
    pub statement: Statement,
    pub function: Option<ProcOid>,
}

#[derive(Debug, Default)]
pub struct SimEngine {
    db: RefCell<SimDatabase>,
    next_txn: Cell<u64>,
    begun: Cell<u64>,
    aborted: Cell<u64>,
    failing: RefCell<BTreeSet<String>>,
}

impl SimEngine {
    pub fn new(db: SimDatabase) -> Self {
        Self {
            db: RefCell::new(db),
            ..Self::default()
        }
    }

    pub fn begun(&self) -> u64 {
        self.begun.get()
    }

    pub fn aborted(&self) -> u64 {
        self.aborted.get()
    }

    pub fn open_transactions(&self) -> u64 {
        self.begun.get() - self.aborted.get()
    }

    /// Make every execution touching `table` fail.
    pub fn fail_executions_on(&self, table: &str) {
        self.failing.borrow_mut().insert(table.to_ascii_lowercase());
    }

    /// Committed contents of `table`.
    pub fn table(&self, name: &str) -> Result<Table> {
        self.db.borrow().table(name).cloned()
    }

    /// Drop a base table, e.g. to make recorded queries stale.
    pub fn drop_table(&self, name: &str) -> Result<Table> {
        self.db.borrow_mut().drop_table(name)
    }

    fn check_bind(
        &self,
        statement: &Statement,
        params: &[ParamValue],
        param_types: &[ParamType],
    ) -> Result<Option<ProcOid>> {
        if params.len() != param_types.len() {
            return Err(SimError::Syntax(format!(
                "{} parameters bound, {} declared",
                params.len(),
                param_types.len()
            )));
        }
        for (i, (v, t)) in params.iter().zip(param_types).enumerate() {
            if !v.fits(*t) {
                return Err(SimError::Syntax(format!(
                    "parameter ${} value {v:?} does not fit {t}",
                    i + 1
                )));
            }
        }
        for op in statement.operands() {
            if let Operand::Param(i) = op {
                if i >= params.len() {
                    return Err(SimError::Syntax(format!("no value for placeholder ${}", i + 1)));
                }
            }
        }

        let db = self.db.borrow();
        match statement {
            Statement::Call { function, args } => {
                let types: Vec<ParamType> = args
                    .iter()
                    .map(|a| match a {
                        Operand::Literal(_) => ParamType::BigInt,
                        Operand::Param(i) => param_types[*i],
                    })
                    .collect();
                let sig = db.functions().lookup(function, &types)?;
                Ok(Some(sig.oid))
            }
            Statement::Select { table, filter } | Statement::Delete { table, filter } => {
                let t = db.table(table)?;
                check_filter(table, t, filter)?;
                Ok(None)
            }
            Statement::Update {
                table,
                column,
                filter,
                ..
            } => {
                let t = db.table(table)?;
                column_of(table, t, column)?;
                check_filter(table, t, filter)?;
                Ok(None)
            }
            Statement::Insert { table, values } => {
                let t = db.table(table)?;
                if values.len() != t.columns.len() {
                    return Err(SimError::Arity {
                        table: table.clone(),
                        expected: t.columns.len(),
                        got: values.len(),
                    });
                }
                Ok(None)
            }
        }
    }

    fn run(
        &self,
        txn: &mut SimTxn,
        plan: &SimPlan,
        params: &[ParamValue],
        settings: &KnobSettings,
        metrics: &mut MetricsContext,
    ) -> std::result::Result<(), EngineError> {
        let resolve = |op: Operand| -> std::result::Result<i64, EngineError> {
            match op {
                Operand::Literal(v) => Ok(v),
                Operand::Param(i) => match params.get(i) {
                    Some(ParamValue::Int(v)) => Ok(*v),
                    Some(ParamValue::Bool(b)) => Ok(*b as i64),
                    Some(ParamValue::Decimal(d)) => Ok(*d as i64),
                    Some(other) => Err(EngineError::Execution(format!(
                        "cannot compare {other:?} with an integer column"
                    ))),
                    None => Err(EngineError::Execution(format!("missing ${}", i + 1))),
                },
            }
        };

        if let Some(table) = plan.statement.table() {
            if self.failing.borrow().contains(table) {
                return Err(EngineError::Execution(format!(
                    "injected failure on relation \"{table}\""
                )));
            }
        }

        let use_index = settings.bool_or(KNOB_INDEX_SCAN, false);
        let batch = settings.int_or(KNOB_OUTPUT_BATCH, 1).max(1) as f64;

        match &plan.statement {
            Statement::Call { args, .. } => {
                for a in args {
                    resolve(*a)?;
                }
                metrics.record_pipeline(
                    PipelineId::new(0),
                    vec![
                        OuFeature::new(OperatingUnitType::Projection, vec![args.len() as f64]),
                        OuFeature::new(OperatingUnitType::Output, vec![(1.0 / batch).ceil()]),
                    ],
                );
            }
            Statement::Select { table, filter } => {
                let (cols, rows) = self.visible(txn, table)?;
                let (matched, scan) = scan(&cols, &rows, filter, use_index, &resolve)?;
                let out = (matched.len() as f64 / batch).ceil();
                metrics.record_pipeline(
                    PipelineId::new(0),
                    vec![scan, OuFeature::new(OperatingUnitType::Output, vec![out])],
                );
            }
            Statement::Insert { table, values } => {
                let row = values
                    .iter()
                    .map(|v| resolve(*v))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                let width = row.len() as f64;
                self.writable(txn, table)?.push(row);
                metrics.record_pipeline(
                    PipelineId::new(0),
                    vec![OuFeature::new(OperatingUnitType::Insert, vec![1.0, width])],
                );
            }
            Statement::Update {
                table,
                column,
                value,
                filter,
            } => {
                let (cols, rows) = self.visible(txn, table)?;
                let (matched, scan) = scan(&cols, &rows, filter, use_index, &resolve)?;
                let idx = cols
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(column))
                    .ok_or_else(|| EngineError::Execution(format!("column {column} vanished")))?;
                let new_value = resolve(*value)?;
                let target = self.writable(txn, table)?;
                for &r in &matched {
                    target[r][idx] = new_value;
                }
                metrics.record_pipeline(PipelineId::new(0), vec![scan]);
                metrics.record_pipeline(
                    PipelineId::new(1),
                    vec![OuFeature::new(OperatingUnitType::Update, vec![matched.len() as f64])],
                );
            }
            Statement::Delete { table, filter } => {
                let (cols, rows) = self.visible(txn, table)?;
                let (matched, scan) = scan(&cols, &rows, filter, use_index, &resolve)?;
                let doomed: BTreeSet<usize> = matched.iter().copied().collect();
                let target = self.writable(txn, table)?;
                let mut i = 0;
                target.retain(|_| {
                    let keep = !doomed.contains(&i);
                    i += 1;
                    keep
                });
                metrics.record_pipeline(PipelineId::new(0), vec![scan]);
                metrics.record_pipeline(
                    PipelineId::new(1),
                    vec![OuFeature::new(OperatingUnitType::Delete, vec![matched.len() as f64])],
                );
            }
        }
        Ok(())
    }

    /// Column names and rows of `table` as `txn` sees them.
    fn visible(
        &self,
        txn: &SimTxn,
        table: &str,
    ) -> std::result::Result<(Vec<String>, Vec<Vec<i64>>), EngineError> {
        let db = self.db.borrow();
        let base = db.table(table).map_err(|e| EngineError::Execution(e.to_string()))?;
        let rows = txn
            .overlay
            .get(table)
            .cloned()
            .unwrap_or_else(|| base.rows.clone());
        Ok((base.columns.clone(), rows))
    }

    fn writable<'t>(
        &self,
        txn: &'t mut SimTxn,
        table: &str,
    ) -> std::result::Result<&'t mut Vec<Vec<i64>>, EngineError> {
        if !txn.overlay.contains_key(table) {
            let db = self.db.borrow();
            let base = db.table(table).map_err(|e| EngineError::Execution(e.to_string()))?;
            txn.overlay.insert(table.to_string(), base.rows.clone());
        }
        txn.overlay
            .get_mut(table)
            .ok_or_else(|| EngineError::Execution(format!("overlay for {table} missing")))
    }
}

fn column_of(table: &str, t: &Table, column: &str) -> Result<usize> {
    t.column_index(column).ok_or_else(|| SimError::UnknownColumn {
        table: table.to_string(),
        column: column.to_string(),
    })
}

fn check_filter(table: &str, t: &Table, filter: &Option<Predicate>) -> Result<()> {
    if let Some(p) = filter {
        column_of(table, t, &p.column)?;
    }
    Ok(())
}

/// Row indices matching `filter` plus the scan's feature.
fn scan<F>(
    cols: &[String],
    rows: &[Vec<i64>],
    filter: &Option<Predicate>,
    use_index: bool,
    resolve: &F,
) -> std::result::Result<(Vec<usize>, OuFeature), EngineError>
where
    F: Fn(Operand) -> std::result::Result<i64, EngineError>,
{
    let n = rows.len() as f64;
    let Some(pred) = filter else {
        let feature = OuFeature::new(OperatingUnitType::SeqScan, vec![n, cols.len() as f64]);
        return Ok(((0..rows.len()).collect(), feature));
    };

    let idx = cols
        .iter()
        .position(|c| c.eq_ignore_ascii_case(&pred.column))
        .ok_or_else(|| EngineError::Execution(format!("column {} vanished", pred.column)))?;
    let key = resolve(pred.value)?;
    let matched: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| r[idx] == key)
        .map(|(i, _)| i)
        .collect();

    let feature = if use_index {
        OuFeature::new(
            OperatingUnitType::IdxScan,
            vec![(n + 1.0).log2().ceil(), matched.len() as f64],
        )
    } else {
        OuFeature::new(OperatingUnitType::SeqScan, vec![n, cols.len() as f64])
    };
    Ok((matched, feature))
}

impl QueryEngine for SimEngine {
    type Txn = SimTxn;
    type Bound = SimPlan;
    type Plan = SimPlan;

    fn begin(&self) -> SimTxn {
        let id = self.next_txn.get();
        self.next_txn.set(id + 1);
        self.begun.set(self.begun.get() + 1);
        trace!(txn = id, "begin");
        SimTxn {
            id: TxnId::new(id),
            overlay: BTreeMap::new(),
        }
    }

    fn abort(&self, txn: SimTxn) {
        self.aborted.set(self.aborted.get() + 1);
        trace!(txn = %txn.id, dirty = txn.dirty_tables(), "abort");
    }

    fn bind(
        &self,
        _txn: &mut SimTxn,
        db_oid: DbOid,
        text: &str,
        params: &[ParamValue],
        param_types: &[ParamType],
    ) -> std::result::Result<SimPlan, EngineError> {
        let bound = Statement::parse(text).and_then(|statement| {
            let function = self.check_bind(&statement, params, param_types)?;
            Ok(SimPlan {
                statement,
                function,
            })
        });
        bound.map_err(|e| {
            debug!(db = %db_oid, error = %e, "bind failed");
            EngineError::Bind(e.to_string())
        })
    }

    fn optimize(
        &self,
        _txn: &mut SimTxn,
        bound: SimPlan,
        timeout: Duration,
    ) -> std::result::Result<SimPlan, EngineError> {
        if timeout.is_zero() {
            return Err(EngineError::OptimizeTimeout(timeout));
        }
        Ok(bound)
    }

    fn compile_and_run(
        &self,
        txn: &mut SimTxn,
        plan: &SimPlan,
        params: &[ParamValue],
        settings: &KnobSettings,
        metrics: &mut MetricsContext,
    ) -> std::result::Result<(), EngineError> {
        self.run(txn, plan, params, settings, metrics)
    }
}
