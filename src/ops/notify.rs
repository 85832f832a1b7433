//! Change notification for operator callers.
//!
//! Operators do not know who caches derived data from the mesh (render
//! buffers, undo snapshots, dependency graphs). They report what kind of
//! change happened through a callback and leave invalidation to the host.
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicU8, Ordering};
//! use std::sync::Arc;
//! use editmesh::ops::{Changes, Notifier};
//!
//! let seen = Arc::new(AtomicU8::new(0));
//! let sink = seen.clone();
//! let notifier = Notifier::new(move |changes| {
//!     sink.fetch_or(changes.bits(), Ordering::Relaxed);
//! });
//! notifier.notify(Changes::TOPOLOGY | Changes::SELECTION);
//! assert_eq!(seen.load(Ordering::Relaxed), (Changes::TOPOLOGY | Changes::SELECTION).bits());
//! ```

use bitflags::bitflags;

bitflags! {
    /// What an operator changed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Changes: u8 {
        /// Elements were created or killed.
        const TOPOLOGY = 1 << 0;
        /// Vertex positions moved.
        const GEOMETRY = 1 << 1;
        /// Selection bits changed.
        const SELECTION = 1 << 2;
    }
}

/// A callback that receives the change set of every successful operator.
pub struct Notifier {
    callback: Box<dyn Fn(Changes) + Send + Sync>,
}

impl Notifier {
    /// Create a notifier with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(Changes) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Signal a change set. Empty sets are not forwarded.
    #[inline]
    pub fn notify(&self, changes: Changes) {
        if !changes.is_empty() {
            (self.callback)(changes);
        }
    }

    /// Create a notifier that discards everything.
    pub fn none() -> Self {
        Self::new(|_| {})
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_empty_changes_are_dropped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let notifier = Notifier::new(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        notifier.notify(Changes::empty());
        notifier.notify(Changes::GEOMETRY);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}
