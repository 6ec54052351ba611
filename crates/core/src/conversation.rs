//! The conversation store.

use std::fmt::{self, Debug};

use parley_model::Message;

use crate::StateError;

type ChangeListener = Box<dyn Fn(&[Message]) + Send + Sync>;

/// An ordered sequence of the non-system messages of a conversation.
///
/// Every successful mutation calls the change listeners with the resulting
/// sequence, in registration order, before it returns. A rejected mutation
/// leaves the sequence untouched and notifies nobody.
///
/// Once locked, the store rejects all mutations for the rest of its life.
#[derive(Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
    locked: bool,
    listeners: Vec<ChangeListener>,
}

impl ConversationStore {
    /// Creates an empty store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored messages.
    #[inline]
    pub fn get(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the oldest message.
    #[inline]
    pub fn first(&self) -> Option<&Message> {
        self.messages.first()
    }

    /// Returns the newest message.
    #[inline]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Returns the number of stored messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if there are no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Appends a message.
    pub fn append(&mut self, message: Message) -> Result<(), StateError> {
        self.check_writable()?;
        check_not_system(&message)?;
        self.messages.push(message);
        self.notify();
        Ok(())
    }

    /// Inserts a message before all others.
    pub fn prepend(&mut self, message: Message) -> Result<(), StateError> {
        self.insert(0, message)
    }

    /// Inserts a message at `index`, shifting the later ones.
    pub fn insert(
        &mut self,
        index: usize,
        message: Message,
    ) -> Result<(), StateError> {
        self.check_writable()?;
        check_not_system(&message)?;
        let len = self.messages.len();
        if index > len {
            return Err(StateError::OutOfBounds { index, len });
        }
        self.messages.insert(index, message);
        self.notify();
        Ok(())
    }

    /// Removes and returns the message at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Message, StateError> {
        self.check_writable()?;
        let len = self.messages.len();
        if index >= len {
            return Err(StateError::OutOfBounds { index, len });
        }
        let removed = self.messages.remove(index);
        self.notify();
        Ok(removed)
    }

    /// Replaces the message at `index` and returns the old one.
    pub fn replace(
        &mut self,
        index: usize,
        message: Message,
    ) -> Result<Message, StateError> {
        self.check_writable()?;
        check_not_system(&message)?;
        let len = self.messages.len();
        let Some(slot) = self.messages.get_mut(index) else {
            return Err(StateError::OutOfBounds { index, len });
        };
        let replaced = std::mem::replace(slot, message);
        self.notify();
        Ok(replaced)
    }

    /// Keeps the first `len` messages and drops the rest.
    ///
    /// Nothing happens, and nobody is notified, if the store holds no more
    /// than `len` messages.
    pub fn truncate(&mut self, len: usize) -> Result<(), StateError> {
        self.check_writable()?;
        if len >= self.messages.len() {
            return Ok(());
        }
        self.messages.truncate(len);
        self.notify();
        Ok(())
    }

    /// Replaces the whole sequence.
    pub fn set(&mut self, messages: Vec<Message>) -> Result<(), StateError> {
        self.check_writable()?;
        if messages.iter().any(Message::is_system) {
            return Err(StateError::SystemMessage);
        }
        self.messages = messages;
        self.notify();
        Ok(())
    }

    /// Removes all messages.
    pub fn clear(&mut self) -> Result<(), StateError> {
        self.check_writable()?;
        self.messages.clear();
        self.notify();
        Ok(())
    }

    /// Locks the store.
    ///
    /// Locking is permanent. Calling this on a locked store returns
    /// [`StateError::AlreadyLocked`].
    pub fn lock(&mut self) -> Result<(), StateError> {
        if self.locked {
            return Err(StateError::AlreadyLocked);
        }
        self.locked = true;
        Ok(())
    }

    /// Returns `true` if the store is locked.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Registers a listener called after every successful mutation.
    pub fn on_change<F>(&mut self, listener: F)
    where
        F: Fn(&[Message]) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    #[inline]
    fn check_writable(&self) -> Result<(), StateError> {
        if self.locked {
            return Err(StateError::Locked);
        }
        Ok(())
    }

    fn notify(&self) {
        for listener in &self.listeners {
            listener(&self.messages);
        }
    }
}

#[inline]
fn check_not_system(message: &Message) -> Result<(), StateError> {
    if message.is_system() {
        return Err(StateError::SystemMessage);
    }
    Ok(())
}

impl Debug for ConversationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationStore")
            .field("messages", &self.messages)
            .field("locked", &self.locked)
            .finish_non_exhaustive()
    }
}
