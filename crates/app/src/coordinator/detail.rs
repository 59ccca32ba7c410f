//! Detail flow coordinator.

use std::sync::{Arc, OnceLock, Weak};

use rebrowse_client::FetchCache;
use rebrowse_core::ResultRecord;

use super::{Coordinator, CoordinatorNode};
use crate::controller::{DetailController, DetailDelegate};
use crate::navigation::{NavigationSurface, Screen};

/// Everything a detail screen needs to be built.
#[derive(Debug, Clone)]
pub struct DetailParams {
    pub record: ResultRecord,
    pub images: FetchCache,
}

/// Presents one record and completes when its screen is dismissed.
pub struct DetailCoordinator {
    node: CoordinatorNode,
    me: Weak<DetailCoordinator>,
    params: DetailParams,
    controller: OnceLock<Arc<DetailController>>,
}

impl DetailCoordinator {
    pub fn new(surface: NavigationSurface, params: DetailParams) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<DetailCoordinator>| DetailCoordinator {
            node: CoordinatorNode::new(surface, me.clone()),
            me: me.clone(),
            params,
            controller: OnceLock::new(),
        })
    }

    pub fn controller(&self) -> Option<Arc<DetailController>> {
        self.controller.get().cloned()
    }
}

impl Coordinator for DetailCoordinator {
    fn node(&self) -> &CoordinatorNode {
        &self.node
    }

    fn start(&self) {
        if self.controller.get().is_some() {
            tracing::warn!(node = %self.node.id(), "detail flow already started");
            return;
        }

        let delegate: Weak<dyn DetailDelegate> = self.me.clone();
        let controller = Arc::new(DetailController::new(
            self.params.record.clone(),
            self.params.images.clone(),
            delegate,
        ));
        let _ = self.controller.set(controller.clone());
        self.node.surface().push(self.node.id(), Screen::Detail(controller));
    }
}

impl DetailDelegate for DetailCoordinator {
    fn detail_dismissed(&self) {
        self.node.complete();
    }
}
