//! Shared navigation stack.
//!
//! Every screen on the stack is tagged with the coordinator that pushed it,
//! so a coordinator's screens can be removed when it is torn down.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::controller::{DetailController, ListController};
use crate::coordinator::NodeId;

/// A screen presented on the navigation surface.
#[derive(Clone)]
pub enum Screen {
    List(Arc<ListController>),
    Detail(Arc<DetailController>),
}

impl Screen {
    pub fn kind(&self) -> &'static str {
        match self {
            Screen::List(_) => "list",
            Screen::Detail(_) => "detail",
        }
    }
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

#[derive(Debug, Clone)]
pub struct ScreenEntry {
    pub owner: NodeId,
    pub screen: Screen,
}

/// Cloneable handle to one navigation stack.
#[derive(Debug, Clone, Default)]
pub struct NavigationSurface {
    stack: Arc<Mutex<Vec<ScreenEntry>>>,
}

impl NavigationSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ScreenEntry>> {
        self.stack.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, owner: NodeId, screen: Screen) {
        tracing::debug!(owner = %owner, screen = screen.kind(), "push screen");
        self.lock().push(ScreenEntry { owner, screen });
    }

    /// Pop the top screen, as a back gesture would.
    ///
    /// The bottom screen cannot be popped. A popped detail screen is
    /// dismissed, so its coordinator leaves the tree.
    pub fn pop(&self) -> Option<ScreenEntry> {
        let entry = {
            let mut stack = self.lock();
            if stack.len() <= 1 {
                tracing::debug!("pop ignored; root screen stays");
                return None;
            }
            stack.pop()
        }?;

        tracing::debug!(owner = %entry.owner, screen = entry.screen.kind(), "pop screen");
        if let Screen::Detail(detail) = &entry.screen {
            detail.dismiss();
        }
        Some(entry)
    }

    /// Remove every screen pushed by `owner`. Returns how many were removed;
    /// zero when they were already popped.
    pub fn pop_owned_by(&self, owner: NodeId) -> usize {
        let mut stack = self.lock();
        let before = stack.len();
        stack.retain(|entry| entry.owner != owner);
        before - stack.len()
    }

    pub fn top(&self) -> Option<ScreenEntry> {
        self.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Owners of the stacked screens, bottom first.
    pub fn owners(&self) -> Vec<NodeId> {
        self.lock().iter().map(|entry| entry.owner).collect()
    }
}
