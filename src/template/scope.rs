//! Variable scopes for template resolution.
//!
//! A root scope wraps the caller's variables. Each loop iteration gets a
//! child scope layered over the root: the item's fields (or the item itself
//! under `item`) plus `index` and `index1`. Lookups check the child layer
//! first, so item fields shadow outer names, and the outer mapping is only
//! ever borrowed.

use std::collections::BTreeMap;

use super::value::Value;

/// Reserved key for a non-mapping loop item.
pub const ITEM_KEY: &str = "item";
/// Reserved key for the 0-based loop index.
pub const INDEX_KEY: &str = "index";
/// Reserved key for the 1-based loop index.
pub const INDEX1_KEY: &str = "index1";

/// A layer of bound names with an optional enclosing scope.
#[derive(Debug, Clone, Default)]
pub struct Scope<'p> {
    vars: BTreeMap<String, Value>,
    parent: Option<&'p Scope<'p>>,
}

impl Scope<'static> {
    /// Build a root scope. Non-mapping variables bind nothing.
    pub fn root(variables: impl Into<Value>) -> Self {
        let vars = match variables.into() {
            Value::Mapping(map) => map,
            _ => BTreeMap::new(),
        };
        Scope { vars, parent: None }
    }

    /// A root scope with no bindings.
    pub fn empty() -> Self {
        Scope::default()
    }
}

impl<'p> Scope<'p> {
    /// Create the scope for one loop iteration.
    pub fn for_item<'a>(&'a self, item: &Value, index: usize) -> Scope<'a> {
        let mut vars = match item {
            Value::Mapping(fields) => fields.clone(),
            other => {
                let mut vars = BTreeMap::new();
                vars.insert(ITEM_KEY.to_string(), other.clone());
                vars
            }
        };
        vars.insert(INDEX_KEY.to_string(), Value::from(index));
        vars.insert(INDEX1_KEY.to_string(), Value::from(index + 1));
        Scope {
            vars,
            parent: Some(self),
        }
    }

    /// Resolve a dotted path such as `customer.address.city`.
    pub fn lookup(&self, path: &str) -> &Value {
        let mut segments = path.split('.');
        let head = segments.next().unwrap_or_default();
        match self.binding(head) {
            Some(value) => value.get_path(segments),
            None => &ABSENT,
        }
    }

    fn binding(&self, name: &str) -> Option<&Value> {
        match self.vars.get(name) {
            Some(v) => Some(v),
            None => self.parent.and_then(|p| p.binding(name)),
        }
    }
}

static ABSENT: Value = Value::Absent;
