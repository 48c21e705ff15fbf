use super::TemplateError;
use serde::Serialize;
use serde_json::{Map, Value};

/// Variables visible to one render call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    vars: Map<String, Value>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a variable
    pub fn insert<T>(&mut self, key: &str, value: &T) -> Result<&mut Self, TemplateError>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(value).map_err(|source| TemplateError::Context {
            key: key.to_string(),
            source,
        })?;
        self.vars.insert(key.to_string(), value);
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub(crate) fn vars(&self) -> &Map<String, Value> {
        &self.vars
    }
}
