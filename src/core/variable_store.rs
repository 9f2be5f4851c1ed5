use std::collections::HashMap;

use serde_json::Value;

/// Variable bindings of a single flow run.
///
/// Contextual variables keep their insertion order (stat templates first,
/// then `segment`, then the caller's seed). Local variables are written only
/// by nodes that declare a saved variable.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    contextual: Vec<(String, Value)>,
    local: HashMap<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite an existing contextual variable or append a new one.
    pub fn set_contextual(&mut self, id: impl Into<String>, value: Value) {
        let id = id.into();
        match self.contextual.iter_mut().find(|(k, _)| *k == id) {
            Some((_, slot)) => *slot = value,
            None => self.contextual.push((id, value)),
        }
    }

    pub fn contextual(&self, id: &str) -> Option<&Value> {
        self.contextual
            .iter()
            .find(|(k, _)| k == id)
            .map(|(_, v)| v)
    }

    pub fn contextual_vars(&self) -> &[(String, Value)] {
        &self.contextual
    }

    pub fn set_local(&mut self, name: impl Into<String>, value: Value) {
        self.local.insert(name.into(), value);
    }

    pub fn local(&self, name: &str) -> Option<&Value> {
        self.local.get(name)
    }

    pub fn locals(&self) -> &HashMap<String, Value> {
        &self.local
    }

    pub fn take_locals(&mut self) -> HashMap<String, Value> {
        std::mem::take(&mut self.local)
    }

    /// Contextual variables overlaid with local variables, as one object.
    pub fn merged_view(&self) -> Vec<(String, Value)> {
        let mut merged = self.contextual.clone();
        for (name, value) in &self.local {
            match merged.iter_mut().find(|(k, _)| k == name) {
                Some((_, slot)) => *slot = value.clone(),
                None => merged.push((name.clone(), value.clone())),
            }
        }
        merged
    }

    pub fn clear(&mut self) {
        self.contextual.clear();
        self.local.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.contextual.is_empty() && self.local.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_contextual_overwrite_or_append() {
        let mut store = VariableStore::new();
        store.set_contextual("level", json!(1));
        store.set_contextual("coins", json!(10));
        store.set_contextual("level", json!(2));

        assert_eq!(store.contextual("level"), Some(&json!(2)));
        let ids: Vec<&str> = store.contextual_vars().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(ids, vec!["level", "coins"]);
    }

    #[test]
    fn test_locals_are_separate() {
        let mut store = VariableStore::new();
        store.set_contextual("x", json!("ctx"));
        store.set_local("x", json!("local"));
        assert_eq!(store.contextual("x"), Some(&json!("ctx")));
        assert_eq!(store.local("x"), Some(&json!("local")));
    }

    #[test]
    fn test_merged_view_prefers_locals() {
        let mut store = VariableStore::new();
        store.set_contextual("x", json!(1));
        store.set_contextual("y", json!(2));
        store.set_local("x", json!(10));
        store.set_local("z", json!(30));

        let merged = store.merged_view();
        assert_eq!(merged[0], ("x".to_string(), json!(10)));
        assert_eq!(merged[1], ("y".to_string(), json!(2)));
        assert!(merged.contains(&("z".to_string(), json!(30))));
    }

    #[test]
    fn test_take_and_clear() {
        let mut store = VariableStore::new();
        store.set_local("a", json!(1));
        store.set_contextual("b", json!(2));
        let taken = store.take_locals();
        assert_eq!(taken.get("a"), Some(&json!(1)));
        assert!(store.locals().is_empty());
        store.clear();
        assert!(store.is_empty());
    }
}
