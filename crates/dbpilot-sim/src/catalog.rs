//! Function resolution by name and argument types.
//!
//! A signature matches when every declared argument type equals the call's
//! type at that position; a trailing `Variadic` absorbs one or more remaining
//! arguments. More than one match is reported as `LookupError::Ambiguous`
//! rather than picking one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use dbpilot_core::id::ProcOid;
use dbpilot_core::types::ParamType;

use crate::error::LookupError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub oid: ProcOid,
    pub args: Vec<ParamType>,
    pub returns: ParamType,
}

impl FunctionSignature {
    fn matches(&self, call: &[ParamType]) -> bool {
        match self.args.split_last() {
            Some((ParamType::Variadic, fixed)) => {
                call.len() > fixed.len() && fixed.iter().zip(call).all(|(d, c)| d == c)
            }
            _ => self.args.as_slice() == call,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FunctionCatalog {
    functions: BTreeMap<String, Vec<FunctionSignature>>,
}

impl FunctionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, signature: FunctionSignature) {
        self.functions
            .entry(name.into().to_ascii_lowercase())
            .or_default()
            .push(signature);
    }

    pub fn lookup(&self, name: &str, args: &[ParamType]) -> Result<&FunctionSignature, LookupError> {
        let name = name.to_ascii_lowercase();
        let mut found = self
            .functions
            .get(&name)
            .into_iter()
            .flatten()
            .filter(|sig| sig.matches(args));

        let first = found.next();
        let rest = found.count();
        match first {
            Some(sig) if rest == 0 => Ok(sig),
            Some(_) => Err(LookupError::Ambiguous {
                name,
                args: args.to_vec(),
                candidates: rest + 1,
            }),
            None => Err(LookupError::NotFound {
                name,
                args: args.to_vec(),
            }),
        }
    }
}
