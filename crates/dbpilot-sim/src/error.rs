use thiserror::Error;

use dbpilot_core::types::ParamType;

#[derive(Debug, Error, PartialEq)]
pub enum LookupError {
    #[error("function {name}({}) does not exist", fmt_types(.args))]
    NotFound { name: String, args: Vec<ParamType> },

    #[error("function {name}({}) is ambiguous: {candidates} candidates", fmt_types(.args))]
    Ambiguous {
        name: String,
        args: Vec<ParamType>,
        candidates: usize,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("relation \"{0}\" already exists")]
    DuplicateTable(String),

    #[error("relation \"{0}\" does not exist")]
    UnknownTable(String),

    #[error("column \"{column}\" of relation \"{table}\" does not exist")]
    UnknownColumn { table: String, column: String },

    #[error("row has {got} values, relation \"{table}\" has {expected} columns")]
    Arity {
        table: String,
        expected: usize,
        got: usize,
    },

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

pub type Result<T> = std::result::Result<T, SimError>;

fn fmt_types(args: &[ParamType]) -> String {
    args.iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
