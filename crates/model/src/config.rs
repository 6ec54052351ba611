use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ToolChoice;

/// Keys that belong to the request envelope and never come from a
/// [`RequestConfig`].
pub const RESERVED_KEYS: [&str; 3] = ["messages", "tools", "stream"];

/// Model parameters of a request, excluding `messages` and `tools`.
///
/// The record is deliberately opaque: any key the provider understands can
/// be set, and the typed helpers below only cover the common ones. Two
/// configs combine with [`RequestConfig::merge`], a shallow merge where the
/// other side wins.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestConfig(Map<String, Value>);

impl RequestConfig {
    /// Creates an empty config.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `key`.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Sets `key`, returning the previous value.
    #[inline]
    pub fn insert<K: Into<String>, V: Into<Value>>(
        &mut self,
        key: K,
        value: V,
    ) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Removes `key`, returning its value.
    #[inline]
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Returns `true` if `key` is set.
    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no key is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the key-value pairs.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Shallow-merges `other` into `self`; keys of `other` win.
    pub fn merge(&mut self, other: &RequestConfig) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Returns the model identifier, if set to a non-empty string.
    #[inline]
    pub fn model(&self) -> Option<&str> {
        self.0
            .get("model")
            .and_then(Value::as_str)
            .filter(|model| !model.is_empty())
    }

    /// Sets the model identifier.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.insert("model", model.into());
        self
    }

    /// Sets the sampling temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.insert("temperature", temperature);
        self
    }

    /// Sets the maximum number of generated tokens.
    #[inline]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.insert("max_tokens", max_tokens);
        self
    }

    /// Sets the tool choice.
    #[inline]
    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.set_tool_choice(choice);
        self
    }

    /// Sets the tool choice in place.
    #[inline]
    pub fn set_tool_choice(&mut self, choice: ToolChoice) {
        self.insert("tool_choice", choice);
    }

    /// Allows or forbids parallel tool calls.
    #[inline]
    pub fn with_parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.insert("parallel_tool_calls", enabled);
        self
    }

    /// Returns a copy without the reserved envelope keys.
    pub fn without_reserved(&self) -> Self {
        let mut config = self.clone();
        for key in RESERVED_KEYS {
            config.0.remove(key);
        }
        config
    }
}

impl From<Map<String, Value>> for RequestConfig {
    #[inline]
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<RequestConfig> for Value {
    #[inline]
    fn from(config: RequestConfig) -> Self {
        Value::Object(config.0)
    }
}
