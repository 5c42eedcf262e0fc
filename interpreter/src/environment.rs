use std::collections::BTreeMap;

use crate::runtime_value::RuntimeValue;

/// The one variable scope shared by every fragment of a run. Later
/// assignments shadow earlier ones; nothing is ever scoped to a frame.
#[derive(Debug, Default, Clone)]
pub struct Environment {
    variables: BTreeMap<String, RuntimeValue>,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    pub fn get(&self, name: &str) -> Option<&RuntimeValue> {
        self.variables.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: RuntimeValue) {
        self.variables.insert(name.into(), value);
    }
}
