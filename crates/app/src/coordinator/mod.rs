//! Navigation coordinator tree.
//!
//! Each coordinator owns its children through strong references and knows
//! its parent only through a `Weak` back-reference. A child leaves the tree
//! exclusively through its parent's [`CoordinatorNode::remove_child`], so the
//! parent's child list is the single source of truth for liveness.

mod app;
mod detail;
mod list;

pub use app::AppCoordinator;
pub use detail::{DetailCoordinator, DetailParams};
pub use list::ListCoordinator;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use rebrowse_client::{FetchCache, RepositoryQueryClient};
use rebrowse_core::Error;

use crate::navigation::NavigationSurface;

/// Identity of one coordinator node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Collaborators handed down the tree to every flow.
#[derive(Clone)]
pub struct Services {
    pub query: Arc<dyn RepositoryQueryClient>,
    pub images: FetchCache,
}

/// A unit of navigation that owns a screen and any child flows.
pub trait Coordinator: Send + Sync {
    fn node(&self) -> &CoordinatorNode;

    /// Present this coordinator's screen on the shared surface.
    fn start(&self);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tree bookkeeping shared by every coordinator.
pub struct CoordinatorNode {
    id: NodeId,
    surface: NavigationSurface,
    me: Weak<dyn Coordinator>,
    children: Mutex<Vec<Arc<dyn Coordinator>>>,
    parent: Mutex<Option<Weak<dyn Coordinator>>>,
}

impl CoordinatorNode {
    /// `me` must point at the coordinator embedding this node; build it
    /// inside `Arc::new_cyclic`.
    pub fn new(surface: NavigationSurface, me: Weak<dyn Coordinator>) -> Self {
        Self { id: NodeId::next(), surface, me, children: Mutex::new(Vec::new()), parent: Mutex::new(None) }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn surface(&self) -> &NavigationSurface {
        &self.surface
    }

    /// Snapshot of the owned children in presentation order.
    pub fn children(&self) -> Vec<Arc<dyn Coordinator>> {
        lock(&self.children).clone()
    }

    pub fn child_ids(&self) -> Vec<NodeId> {
        lock(&self.children).iter().map(|c| c.node().id()).collect()
    }

    pub fn child_count(&self) -> usize {
        lock(&self.children).len()
    }

    /// The owning coordinator, if this node is attached and it is alive.
    pub fn parent(&self) -> Option<Arc<dyn Coordinator>> {
        lock(&self.parent).as_ref().and_then(Weak::upgrade)
    }

    pub fn is_attached(&self) -> bool {
        lock(&self.parent).is_some()
    }

    /// Take ownership of `child`.
    ///
    /// A child already owned by another coordinator is a programming error:
    /// debug builds panic, release builds log, leave the tree unchanged and
    /// return [`Error::InvariantViolation`].
    pub fn add_child(&self, child: Arc<dyn Coordinator>) -> Result<(), Error> {
        let child_id = child.node().id();
        {
            let mut parent = lock(&child.node().parent);
            if parent.is_some() || child_id == self.id {
                let err = Error::InvariantViolation(format!(
                    "{child_id} is already owned by a coordinator; cannot add it to {}",
                    self.id
                ));
                if cfg!(debug_assertions) {
                    panic!("{err}");
                }
                tracing::error!(error = %err, "add_child rejected");
                return Err(err);
            }
            *parent = Some(self.me.clone());
        }

        lock(&self.children).push(child);
        tracing::debug!(parent = %self.id, child = %child_id, "child coordinator added");
        Ok(())
    }

    /// Drop the child with the given identity and tear its screens off the
    /// surface. Returns `false`, changing nothing, when no such child exists.
    pub fn remove_child(&self, id: NodeId) -> bool {
        let removed = {
            let mut children = lock(&self.children);
            children
                .iter()
                .position(|c| c.node().id() == id)
                .map(|index| children.remove(index))
        };

        let Some(child) = removed else {
            tracing::debug!(parent = %self.id, child = %id, "remove_child ignored; not a child");
            return false;
        };

        let node = child.node();
        *lock(&node.parent) = None;
        node.teardown();
        tracing::debug!(parent = %self.id, child = %id, "child coordinator removed");
        true
    }

    /// Report that this node's screen is finished.
    ///
    /// The parent removes this node. A node without a live parent, for
    /// example one already torn down by a back navigation, is ignored.
    pub fn complete(&self) {
        match self.parent() {
            Some(parent) => {
                parent.node().remove_child(self.id);
            }
            None => tracing::debug!(node = %self.id, "complete ignored; node is detached"),
        }
    }

    fn teardown(&self) {
        let children = std::mem::take(&mut *lock(&self.children));
        for child in children.iter().rev() {
            let node = child.node();
            *lock(&node.parent) = None;
            node.teardown();
        }
        self.surface.pop_owned_by(self.id);
    }
}

impl fmt::Debug for CoordinatorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatorNode")
            .field("id", &self.id)
            .field("children", &self.child_ids())
            .field("attached", &self.is_attached())
            .finish()
    }
}
