//! Render-lifecycle scope for surrogate registrations.
//!
//! # Responsibility
//! - Tie every surrogate's listeners to the lifetime of its fragment.
//! - Run host teardown callbacks when the fragment is discarded.
//!
//! # Invariants
//! - Each registration is released exactly once, by `unload` or on drop.
//! - Registrations made after unload are released immediately.

use crate::render::dom::{Fragment, ListenerId, NodeId};
use log::debug;
use uuid::Uuid;

/// Stable identifier of one render-child registration.
pub type RegistrationId = Uuid;

/// Listeners owned by one surrogate element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderChild {
    pub id: RegistrationId,
    pub element: NodeId,
    pub listeners: Vec<ListenerId>,
}

/// Scope owning all registrations of one rendered fragment.
#[derive(Default)]
pub struct RenderScope {
    children: Vec<RenderChild>,
    teardowns: Vec<Box<dyn FnOnce()>>,
    unloaded: bool,
}

impl RenderScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listeners` as owned by `element`.
    ///
    /// Returns `None` (and removes the listeners) if the scope is unloaded.
    pub fn register(
        &mut self,
        fragment: &mut Fragment,
        element: NodeId,
        listeners: Vec<ListenerId>,
    ) -> Option<RegistrationId> {
        if self.unloaded {
            for listener in listeners {
                fragment.remove_listener(listener);
            }
            return None;
        }
        let id = Uuid::new_v4();
        self.children.push(RenderChild {
            id,
            element,
            listeners,
        });
        Some(id)
    }

    /// Adds a callback run once when the scope is unloaded or dropped.
    pub fn on_unload(&mut self, teardown: impl FnOnce() + 'static) {
        if self.unloaded {
            teardown();
            return;
        }
        self.teardowns.push(Box::new(teardown));
    }

    pub fn is_loaded(&self) -> bool {
        !self.unloaded
    }

    pub fn children(&self) -> &[RenderChild] {
        &self.children
    }

    /// Releases every registration. Returns the number of listeners removed.
    ///
    /// Calling this again is a no-op.
    pub fn unload(&mut self, fragment: &mut Fragment) -> usize {
        if self.unloaded {
            return 0;
        }
        self.unloaded = true;

        let mut removed = 0;
        for child in self.children.drain(..) {
            for listener in child.listeners {
                if fragment.remove_listener(listener) {
                    removed += 1;
                }
            }
        }
        self.run_teardowns();
        debug!(
            "event=render_unload module=render status=ok listeners_removed={}",
            removed
        );
        removed
    }

    fn run_teardowns(&mut self) {
        for teardown in self.teardowns.drain(..) {
            teardown();
        }
    }
}

impl Drop for RenderScope {
    fn drop(&mut self) {
        self.unloaded = true;
        self.run_teardowns();
    }
}
