//! The configuration manager.

use parley_model::RequestConfig;
use serde_json::Value;

use crate::StateError;
use crate::conversation::ConversationStore;
use crate::tool::ToolRegistry;

/// Default sampling temperature seeded by [`ConfigManager::with_defaults`].
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
/// Default completion limit seeded by [`ConfigManager::with_defaults`].
pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// A mutable, lockable bag of request parameters.
///
/// Keys are the top-level keys of the chat-completion request body. The
/// agent never forwards `messages`, `tools` or `stream` from here, it
/// always composes them itself.
#[derive(Clone, Debug, Default)]
pub struct ConfigManager {
    config: RequestConfig,
    locked: bool,
}

impl ConfigManager {
    /// Creates a manager seeded with `defaults`.
    #[inline]
    pub fn new(defaults: RequestConfig) -> Self {
        Self {
            config: defaults,
            locked: false,
        }
    }

    /// Creates a manager seeded with a temperature of 0.7 and a limit of
    /// 500 completion tokens.
    pub fn with_defaults() -> Self {
        Self::new(
            RequestConfig::new()
                .with_temperature(DEFAULT_TEMPERATURE)
                .with_max_tokens(DEFAULT_MAX_TOKENS),
        )
    }

    /// Creates a manager seeded with `defaults` plus a one-time snapshot of
    /// the messages and tools currently held by `store` and `registry`.
    pub fn with_context(
        defaults: RequestConfig,
        store: &ConversationStore,
        registry: &ToolRegistry,
    ) -> Self {
        let mut config = defaults;
        config.insert("messages", to_array(store.get()));
        config.insert("tools", to_array(&registry.definitions()));
        Self::new(config)
    }

    /// Returns the value of `key`.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    /// Returns `true` if `key` is set.
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.config.contains_key(key)
    }

    /// Returns the configured model.
    #[inline]
    pub fn model(&self) -> Option<&str> {
        self.config.model()
    }

    /// Sets `key` to `value`.
    pub fn set<K: Into<String>, V: Into<Value>>(
        &mut self,
        key: K,
        value: V,
    ) -> Result<(), StateError> {
        self.check_writable()?;
        self.config.insert(key, value);
        Ok(())
    }

    /// Removes `key` and returns its previous value.
    pub fn remove(&mut self, key: &str) -> Result<Option<Value>, StateError> {
        self.check_writable()?;
        Ok(self.config.remove(key))
    }

    /// Replaces the whole configuration.
    pub fn replace(&mut self, config: RequestConfig) -> Result<(), StateError> {
        self.check_writable()?;
        self.config = config;
        Ok(())
    }

    /// Returns a copy of the configuration.
    #[inline]
    pub fn all(&self) -> RequestConfig {
        self.config.clone()
    }

    /// Locks the configuration.
    ///
    /// Calling this on a locked manager returns
    /// [`StateError::AlreadyLocked`].
    pub fn lock(&mut self) -> Result<(), StateError> {
        if self.locked {
            return Err(StateError::AlreadyLocked);
        }
        self.locked = true;
        Ok(())
    }

    /// Returns `true` if the configuration is locked.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    #[inline]
    fn check_writable(&self) -> Result<(), StateError> {
        if self.locked {
            return Err(StateError::Locked);
        }
        Ok(())
    }
}

fn to_array<T: serde::Serialize>(items: &[T]) -> Value {
    // Messages and definitions are plain data, serializing them can't fail.
    Value::Array(
        items
            .iter()
            .filter_map(|item| serde_json::to_value(item).ok())
            .collect(),
    )
}
