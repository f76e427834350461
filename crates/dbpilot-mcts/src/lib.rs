#![forbid(unsafe_code)]
//! dbpilot-mcts: search the space of action sequences for the best next
//! configuration change.
//!
//! Responsibilities:
//! - Keep the search tree as an arena of nodes addressed by `NodeId` (`tree`).
//! - Grow it one expansion at a time under a rollout budget, costing every new
//!   leaf through a `CostOracle` on a cloned knob snapshot (`search`).
//! - Provide debug-time verification helpers (`verify`).
//!
//! Live configuration is never touched here; the planner applies the result.

pub mod error;
pub mod node;
pub mod search;
pub mod tree;
pub mod verify;

pub use error::{Result, SearchError};
pub use node::{NodeId, SearchNode};
pub use search::{MonteCarloTreeSearch, SearchConfig, SearchResult};
pub use tree::SearchTree;
