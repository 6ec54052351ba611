use std::fmt::{self, Debug};
use std::sync::Arc;

use parley_model::ToolDefinition;

use super::{AnyTool, Tool, ToolHandler};
use crate::StateError;

type ChangeListener = Box<dyn Fn(&[ToolDefinition]) + Send + Sync>;

struct Entry {
    definition: ToolDefinition,
    handler: Option<Arc<dyn ToolHandler>>,
}

/// How the agent answers a call to a registered tool.
pub(crate) enum Resolution {
    /// Run the handler locally.
    Local(Arc<dyn ToolHandler>),
    /// Hand the call back to the caller of `send`.
    External,
}

/// The set of tools advertised to the model.
///
/// A tool is either registered with a local handler, or declared without
/// one. Calls to declared tools are not executed by the agent; they are
/// left for whoever called `send`, typically a decorator.
///
/// Tools are listed in registration order. Like the conversation store,
/// the registry can be locked permanently.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<Entry>,
    locked: bool,
    listeners: Vec<ChangeListener>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool with a local handler.
    pub fn register<H: ToolHandler>(
        &mut self,
        definition: ToolDefinition,
        handler: H,
    ) -> Result<(), StateError> {
        self.register_shared(definition, Arc::new(handler))
    }

    /// Registers a tool with a shared handler.
    pub fn register_shared(
        &mut self,
        definition: ToolDefinition,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), StateError> {
        self.insert(Entry {
            definition,
            handler: Some(handler),
        })
    }

    /// Registers a typed tool.
    pub fn register_tool<T: Tool>(&mut self, tool: T) -> Result<(), StateError> {
        let tool = AnyTool(tool);
        let definition = tool.definition();
        self.register(definition, tool)
    }

    /// Declares a tool whose calls are answered outside of the agent.
    pub fn declare(
        &mut self,
        definition: ToolDefinition,
    ) -> Result<(), StateError> {
        self.insert(Entry {
            definition,
            handler: None,
        })
    }

    /// Removes a tool and returns its definition.
    pub fn unregister(
        &mut self,
        name: &str,
    ) -> Result<ToolDefinition, StateError> {
        self.check_writable()?;
        let Some(index) = self.position(name) else {
            return Err(StateError::NotFound(name.to_owned()));
        };
        let entry = self.entries.remove(index);
        self.notify();
        Ok(entry.definition)
    }

    /// Removes all tools.
    pub fn clear(&mut self) -> Result<(), StateError> {
        self.check_writable()?;
        self.entries.clear();
        self.notify();
        Ok(())
    }

    /// Returns the definition of a tool.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.entry(name).map(|entry| &entry.definition)
    }

    /// Returns `true` if a tool with this name exists.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Returns `true` if the tool is declared without a local handler.
    #[inline]
    pub fn is_external(&self, name: &str) -> bool {
        self.entry(name).is_some_and(|entry| entry.handler.is_none())
    }

    /// Returns the definitions of all tools, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.entries
            .iter()
            .map(|entry| entry.definition.clone())
            .collect()
    }

    /// Returns the number of tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no tools.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Locks the registry.
    ///
    /// Calling this on a locked registry returns
    /// [`StateError::AlreadyLocked`].
    pub fn lock(&mut self) -> Result<(), StateError> {
        if self.locked {
            return Err(StateError::AlreadyLocked);
        }
        self.locked = true;
        Ok(())
    }

    /// Returns `true` if the registry is locked.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Registers a listener called with the definitions after every
    /// successful mutation.
    pub fn on_change<F>(&mut self, listener: F)
    where
        F: Fn(&[ToolDefinition]) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub(crate) fn resolve(&self, name: &str) -> Option<Resolution> {
        self.entry(name).map(|entry| match &entry.handler {
            Some(handler) => Resolution::Local(Arc::clone(handler)),
            None => Resolution::External,
        })
    }

    fn insert(&mut self, entry: Entry) -> Result<(), StateError> {
        self.check_writable()?;
        let name = &entry.definition.name;
        if self.contains(name) {
            return Err(StateError::DuplicateTool(name.clone()));
        }
        trace!("registering tool: {name}");
        self.entries.push(entry);
        self.notify();
        Ok(())
    }

    #[inline]
    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.definition.name == name)
    }

    #[inline]
    fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|entry| entry.definition.name == name)
    }

    #[inline]
    fn check_writable(&self) -> Result<(), StateError> {
        if self.locked {
            return Err(StateError::Locked);
        }
        Ok(())
    }

    fn notify(&self) {
        if self.listeners.is_empty() {
            return;
        }
        let definitions = self.definitions();
        for listener in &self.listeners {
            listener(&definitions);
        }
    }
}

impl Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self
            .entries
            .iter()
            .map(|entry| entry.definition.name.as_str())
            .collect();
        f.debug_struct("ToolRegistry")
            .field("tools", &names)
            .field("locked", &self.locked)
            .finish_non_exhaustive()
    }
}
