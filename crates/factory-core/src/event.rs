//! Event channels
//!
//! A channel is a named, ordered list of subscribers. Notification fans out
//! to every subscriber present when `notify` starts, in insertion order;
//! subscribers added during a pass are first invoked on the next pass.
//! Handler errors never short-circuit the pass: every subscriber runs, and
//! the first error is returned to the notifier once the pass completes.

use crate::value::Value;
use crate::FactoryResult;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Event handler
pub type Handler = Rc<dyn Fn(&[Value]) -> FactoryResult<()>>;

struct ChannelInner {
    name: String,
    handlers: RefCell<Vec<Handler>>,
}

/// Named multi-subscriber notification channel
#[derive(Clone)]
pub struct EventChannel(Rc<ChannelInner>);

impl EventChannel {
    /// Create a detached channel
    pub fn new(name: impl Into<String>) -> Self {
        EventChannel(Rc::new(ChannelInner {
            name: name.into(),
            handlers: RefCell::new(Vec::new()),
        }))
    }

    /// Channel name
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Append a subscriber
    pub fn subscribe<F>(&self, handler: F) -> &Self
    where
        F: Fn(&[Value]) -> FactoryResult<()> + 'static,
    {
        self.0.handlers.borrow_mut().push(Rc::new(handler));
        self
    }

    /// Check if the channel has subscribers
    pub fn any(&self) -> bool {
        !self.0.handlers.borrow().is_empty()
    }

    /// Check if the channel has no subscribers
    pub fn empty(&self) -> bool {
        self.0.handlers.borrow().is_empty()
    }

    /// Number of subscribers
    pub fn len(&self) -> usize {
        self.0.handlers.borrow().len()
    }

    /// Same as [`EventChannel::empty`]
    pub fn is_empty(&self) -> bool {
        self.empty()
    }

    /// Invoke every current subscriber with `args`, in insertion order
    ///
    /// Returns the first handler error after all subscribers have run.
    pub fn notify(&self, args: &[Value]) -> FactoryResult<()> {
        // Snapshot so handlers may subscribe or notify re-entrantly.
        let handlers: Vec<Handler> = self.0.handlers.borrow().clone();
        tracing::trace!(channel = %self.0.name, subscribers = handlers.len(), "notify");

        let mut first_error = None;
        for handler in handlers {
            if let Err(err) = handler(args) {
                tracing::debug!(channel = %self.0.name, error = %err, "handler failed");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Check whether both handles refer to the same channel
    pub fn ptr_eq(&self, other: &EventChannel) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("name", &self.0.name)
            .field("subscribers", &self.len())
            .finish()
    }
}

/// The `events` namespace of an object
#[derive(Default)]
pub struct EventTable {
    channels: RefCell<IndexMap<String, EventChannel>>,
}

impl EventTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Install one channel per name
    ///
    /// Names that already have a channel keep it, along with its subscribers.
    pub fn define(&self, names: &[&str]) -> &Self {
        for name in names {
            self.define_one(name);
        }
        self
    }

    /// Install a single channel and return it
    pub fn define_one(&self, name: &str) -> EventChannel {
        self.channels
            .borrow_mut()
            .entry(name.to_string())
            .or_insert_with(|| EventChannel::new(name))
            .clone()
    }

    /// Install an existing channel under its own name unless one is present
    pub(crate) fn adopt(&self, channel: EventChannel) {
        self.channels
            .borrow_mut()
            .entry(channel.name().to_string())
            .or_insert(channel);
    }

    /// Get a channel by name
    pub fn channel(&self, name: &str) -> Option<EventChannel> {
        self.channels.borrow().get(name).cloned()
    }

    /// Check if a channel exists
    pub fn contains(&self, name: &str) -> bool {
        self.channels.borrow().contains_key(name)
    }

    /// Channel names in definition order
    pub fn names(&self) -> Vec<String> {
        self.channels.borrow().keys().cloned().collect()
    }
}

impl fmt::Debug for EventTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.channels.borrow().values()).finish()
    }
}
