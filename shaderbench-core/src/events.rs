//! Typed notification channels.
//!
//! Collaborators (log views, status bars, title indicators) subscribe to the channel they care
//! about. Delivery is synchronous, on the thread that emits, in emission order.

use crate::{
    error::{CompileError, LinkError, MeshLoadError},
    shader::ShaderStage,
};

/// Outcome of compiling or linking the shader program.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileEvent {
    Compiled(ShaderStage),
    CompileFailed(CompileError),
    Linked,
    LinkFailed(LinkError),
}

/// Progress of mesh loading.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshEvent {
    Loading(String),
    Loaded(String),
    Failed { name: String, error: MeshLoadError },
}

/// Session level state transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    /// The project gained unsaved changes.
    Modified,
    /// The project was saved to or loaded from disk.
    Saved,
    /// A free-form status line.
    Status(String),
}

/// Handle returned by [`Notifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

type Callback<E> = Box<dyn FnMut(&E)>;

/// A single typed channel with any number of subscribers.
pub struct Notifier<E> {
    subscribers: Vec<(SubscriptionId, Callback<E>)>,
    next_id: usize,
}

impl<E> Default for Notifier<E> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }
}

impl<E> Notifier<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Delivers `event` to every subscriber, in subscription order.
    pub fn emit(&mut self, event: E) {
        for (_, callback) in &mut self.subscribers {
            callback(&event);
        }
    }
}

impl<E> std::fmt::Debug for Notifier<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
