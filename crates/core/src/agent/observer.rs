use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use parley_model::{ChatRequest, ChatResponse};

type Callback = Arc<dyn Fn(&ChatRequest, &ChatResponse) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    callbacks: Vec<(u64, Callback)>,
}

/// Callbacks observing the request/response pairs of an agent.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    registry: Arc<Mutex<Registry>>,
}

impl Observers {
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ChatRequest, &ChatResponse) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.callbacks.push((id, Arc::new(callback)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn notify(&self, req: &ChatRequest, resp: &ChatResponse) {
        // Callbacks may unsubscribe, so run them without holding the lock.
        let snapshot: Vec<Callback> = lock(&self.registry)
            .callbacks
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(req, resp);
        }
    }
}

/// A handle to remove a callback registered with
/// [`Agent::on_request`](crate::Agent::on_request).
#[derive(Clone, Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Removes the callback. Calling this more than once, or after the
    /// agent is dropped, does nothing.
    pub fn unsubscribe(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        lock(&registry).callbacks.retain(|(id, _)| *id != self.id);
    }
}

#[inline]
fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}
