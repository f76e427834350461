//! Reversible configuration actions and the validated candidate catalog.
//!
//! An action changes exactly one knob. Boolean toggles are self-inverse; a
//! numeric delta is undone by the delta of opposite sign. The catalog is
//! validated once at construction so duplicate or ambiguous definitions never
//! surface during planning.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::ActionId;
use crate::knob::{KnobSettings, KnobValue};

/// Closed set of knob effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    ToggleBoolean,
    DeltaNumeric(i64),
}

impl ActionKind {
    /// Effect that undoes this one, if it is representable.
    pub fn reverse(self) -> Option<ActionKind> {
        match self {
            ActionKind::ToggleBoolean => Some(ActionKind::ToggleBoolean),
            ActionKind::DeltaNumeric(d) => d.checked_neg().map(ActionKind::DeltaNumeric),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub knob: String,
    pub kind: ActionKind,
}

impl Action {
    pub fn toggle(id: u64, knob: impl Into<String>) -> Self {
        Self {
            id: ActionId::new(id),
            knob: knob.into(),
            kind: ActionKind::ToggleBoolean,
        }
    }

    pub fn delta(id: u64, knob: impl Into<String>, delta: i64) -> Self {
        Self {
            id: ActionId::new(id),
            knob: knob.into(),
            kind: ActionKind::DeltaNumeric(delta),
        }
    }

    /// Apply the effect to a settings snapshot.
    pub fn apply(&self, settings: &mut KnobSettings) -> Result<()> {
        let next = self.next_value(settings)?;
        settings.set(self.knob.clone(), next);
        Ok(())
    }

    /// Whether `other` undoes this action.
    pub fn is_reverse_of(&self, other: &Action) -> bool {
        self.knob == other.knob && self.kind.reverse() == Some(other.kind)
    }

    /// Statement that would apply this action on top of `settings`.
    pub fn to_command(&self, settings: &KnobSettings) -> Result<String> {
        Ok(match self.next_value(settings)? {
            KnobValue::Bool(b) => format!("set {} '{}';", self.knob, b),
            KnobValue::Int(v) => format!("set {} {};", self.knob, v),
        })
    }

    fn next_value(&self, settings: &KnobSettings) -> Result<KnobValue> {
        match self.kind {
            ActionKind::ToggleBoolean => Ok(KnobValue::Bool(!settings.get_bool(&self.knob)?)),
            ActionKind::DeltaNumeric(d) => {
                let cur = settings.get_int(&self.knob)?;
                let next = cur.checked_add(d).ok_or_else(|| {
                    Error::Config(format!("knob '{}' overflows applying {d:+}", self.knob))
                })?;
                Ok(KnobValue::Int(next))
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ActionKind::ToggleBoolean => write!(f, "{} toggle {}", self.id, self.knob),
            ActionKind::DeltaNumeric(d) => write!(f, "{} {} {:+}", self.id, self.knob, d),
        }
    }
}

/// Candidate action set for planning. Iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct ActionCatalog {
    actions: Vec<Action>,
    by_id: BTreeMap<ActionId, usize>,
}

impl ActionCatalog {
    /// Validate and index `actions`.
    ///
    /// Rejects a repeated id (`Duplicate`), two ids with the same knob and
    /// effect (`Ambiguous`), and deltas that are zero or have no negation
    /// (`Config`).
    pub fn new(actions: Vec<Action>) -> Result<Self> {
        let mut by_id = BTreeMap::new();
        let mut by_effect: HashMap<(&str, ActionKind), ActionId> = HashMap::new();

        for (idx, action) in actions.iter().enumerate() {
            if action.kind == ActionKind::DeltaNumeric(0) {
                return Err(Error::Config(format!(
                    "action {} on '{}' has a zero delta",
                    action.id, action.knob
                )));
            }
            if action.kind == ActionKind::DeltaNumeric(i64::MIN) {
                return Err(Error::Config(format!(
                    "action {} on '{}' has an irreversible delta {}",
                    action.id,
                    action.knob,
                    i64::MIN
                )));
            }
            if by_id.insert(action.id, idx).is_some() {
                return Err(Error::Duplicate(format!("action id {}", action.id)));
            }
            if let Some(prev) = by_effect.insert((action.knob.as_str(), action.kind), action.id) {
                return Err(Error::Ambiguous(format!(
                    "actions {prev} and {} both apply {:?} to '{}'",
                    action.id, action.kind, action.knob
                )));
            }
        }
        drop(by_effect);

        Ok(Self { actions, by_id })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ActionId) -> Option<&Action> {
        self.by_id.get(&id).map(|&i| &self.actions[i])
    }

    pub fn lookup(&self, id: ActionId) -> Result<&Action> {
        self.get(id)
            .ok_or_else(|| Error::NotFound(format!("action {id}")))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Catalog action that undoes `id`, if any. Toggles are their own inverse.
    pub fn inverse_of(&self, id: ActionId) -> Option<ActionId> {
        let action = self.get(id)?;
        self.actions
            .iter()
            .find(|other| action.is_reverse_of(other))
            .map(|other| other.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> KnobSettings {
        KnobSettings::new()
            .with("compiled_mode", KnobValue::Bool(false))
            .with("batch_size", KnobValue::Int(100))
    }

    #[test]
    fn toggle_twice_restores_value() {
        let mut s = settings();
        let a = Action::toggle(1, "compiled_mode");
        a.apply(&mut s).unwrap();
        assert!(s.get_bool("compiled_mode").unwrap());
        a.apply(&mut s).unwrap();
        assert_eq!(s, settings());
    }

    #[test]
    fn delta_pair_restores_value() {
        let mut s = settings();
        Action::delta(1, "batch_size", 25).apply(&mut s).unwrap();
        assert_eq!(s.get_int("batch_size").unwrap(), 125);
        Action::delta(2, "batch_size", -25).apply(&mut s).unwrap();
        assert_eq!(s, settings());
    }

    #[test]
    fn apply_checks_knob_type() {
        let mut s = settings();
        let err = Action::toggle(1, "batch_size").apply(&mut s).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
        let err = Action::delta(1, "nope", 1).apply(&mut s).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn commands_render_the_resulting_value() {
        let s = settings();
        assert_eq!(
            Action::toggle(1, "compiled_mode").to_command(&s).unwrap(),
            "set compiled_mode 'true';"
        );
        assert_eq!(
            Action::delta(2, "batch_size", -10).to_command(&s).unwrap(),
            "set batch_size 90;"
        );
    }

    #[test]
    fn catalog_rejects_duplicate_ids() {
        let err = ActionCatalog::new(vec![
            Action::toggle(1, "compiled_mode"),
            Action::delta(1, "batch_size", 5),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Duplicate(_)));
    }

    #[test]
    fn catalog_rejects_ambiguous_effects() {
        let err = ActionCatalog::new(vec![
            Action::delta(1, "batch_size", 5),
            Action::delta(2, "batch_size", 5),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Ambiguous(_)));
    }

    #[test]
    fn catalog_rejects_zero_delta() {
        let err = ActionCatalog::new(vec![Action::delta(1, "batch_size", 0)]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn catalog_rejects_delta_without_negation() {
        let err = ActionCatalog::new(vec![Action::delta(1, "batch_size", i64::MIN)]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(ActionKind::DeltaNumeric(i64::MIN).reverse(), None);
        assert!(!Action::delta(1, "batch_size", i64::MIN)
            .is_reverse_of(&Action::delta(2, "batch_size", i64::MIN)));

        let catalog = ActionCatalog::new(vec![
            Action::delta(1, "batch_size", i64::MAX),
            Action::delta(2, "batch_size", -i64::MAX),
        ])
        .unwrap();
        assert_eq!(catalog.inverse_of(ActionId::new(1)), Some(ActionId::new(2)));
    }

    #[test]
    fn inverse_lookup() {
        let catalog = ActionCatalog::new(vec![
            Action::toggle(1, "compiled_mode"),
            Action::delta(2, "batch_size", 5),
            Action::delta(3, "batch_size", -5),
            Action::delta(4, "batch_size", 50),
        ])
        .unwrap();
        assert_eq!(catalog.inverse_of(ActionId::new(1)), Some(ActionId::new(1)));
        assert_eq!(catalog.inverse_of(ActionId::new(2)), Some(ActionId::new(3)));
        assert_eq!(catalog.inverse_of(ActionId::new(4)), None);
        assert_eq!(
            catalog.iter().map(|a| a.id.get()).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }
}
