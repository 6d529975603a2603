//! Owned layout state handle and the storage boundary.
//!
//! The store is an explicitly owned value: construct one per window or
//! per test; nothing here is global. Every mutation is one atomic
//! read-modify-write over the whole snapshot: read the current tree,
//! compute the replacement through a pure transform, publish it with a
//! single assignment, then persist best-effort. Callers on a
//! single-threaded host get atomicity for free; a multi-threaded host
//! must keep each method call exclusive (one owning actor, or a
//! compare-and-swap on the snapshot value).
//!
//! Persistence is fire-and-forget: a failed write is swallowed with a
//! warning and never rolls back the in-memory state.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::drop::resolve_drop;
use crate::ops::{all_panel_ids, find_panel, remove_panel, resize_group};
use crate::snapshot::{LayoutSnapshot, restore};
use crate::tree::{LayoutNode, NodeId, NodeIdGen, PanelId, normalize_sizes};
use crate::visibility::{VisibilityMap, reduce_visible};

/// Best-effort key/value storage collaborator.
///
/// No durability or latency guarantees beyond "best effort"; a missing
/// key is not an error and implementors swallow write failures.
pub trait LayoutStorage {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn set(&mut self, key: &str, bytes: Vec<u8>);
}

/// In-memory storage for tests and embedding hosts without durable
/// storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: FxHashMap<String, Vec<u8>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LayoutStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, bytes: Vec<u8>) {
        self.entries.insert(key.to_owned(), bytes);
    }
}

/// The owned layout state of one workspace window.
pub struct LayoutStore {
    snapshot: LayoutSnapshot,
    ids: NodeIdGen,
    storage: Box<dyn LayoutStorage>,
    key: String,
}

impl LayoutStore {
    /// Open the layout stored under `key`, falling back to the default
    /// layout when nothing usable is stored. `live_dynamic` names the
    /// dynamic panel ids that currently have a live external owner.
    #[must_use]
    pub fn open(
        storage: Box<dyn LayoutStorage>,
        key: impl Into<String>,
        live_dynamic: &FxHashSet<PanelId>,
    ) -> Self {
        let key = key.into();
        let mut ids = NodeIdGen::new();
        let bytes = storage.get(&key);
        let snapshot = restore(bytes.as_deref(), live_dynamic, &mut ids);
        Self {
            snapshot,
            ids,
            storage,
            key,
        }
    }

    /// The stored (unreduced) tree.
    #[must_use]
    pub fn tree(&self) -> &LayoutNode {
        &self.snapshot.tree
    }

    /// The tree the renderer should draw, after visibility reduction.
    #[must_use]
    pub fn visible_tree(&self) -> Option<LayoutNode> {
        reduce_visible(&self.snapshot.tree, &self.snapshot.visibility)
    }

    /// Every hosted panel id, for the sidebar's toggle list.
    #[must_use]
    pub fn all_panel_ids(&self) -> Vec<PanelId> {
        all_panel_ids(&self.snapshot.tree)
    }

    #[must_use]
    pub fn visibility(&self) -> &VisibilityMap {
        &self.snapshot.visibility
    }

    /// Panel order for the small-screen single-column mode.
    #[must_use]
    pub fn panel_order(&self) -> &[PanelId] {
        &self.snapshot.panel_order
    }

    /// Resolve a completed drag gesture. Returns whether the tree
    /// changed; ignored drops leave everything untouched.
    pub fn apply_drop(&mut self, dragged: &PanelId, zone: &str) -> bool {
        let Some(tree) = resolve_drop(&self.snapshot.tree, dragged, zone, &mut self.ids) else {
            return false;
        };
        self.snapshot.tree = tree;
        self.persist();
        true
    }

    /// Replace one group's sizes (divider drag). The input is
    /// normalized here so the tree invariants hold regardless of
    /// rounding in the caller's resize observer.
    pub fn resize(&mut self, group_id: &NodeId, sizes: &[f64]) -> bool {
        let mut sizes = sizes.to_vec();
        normalize_sizes(&mut sizes);
        let tree = resize_group(&self.snapshot.tree, group_id, &sizes);
        if tree == self.snapshot.tree {
            return false;
        }
        self.snapshot.tree = tree;
        self.persist();
        true
    }

    /// Close a panel (tab close button). Refused for the last panel in
    /// the tree and for panels that are not hosted.
    pub fn close_panel(&mut self, panel: &PanelId) -> bool {
        if find_panel(&self.snapshot.tree, panel).is_none() {
            return false;
        }
        let Some(tree) = remove_panel(&self.snapshot.tree, panel) else {
            return false;
        };
        self.snapshot.tree = tree;
        self.snapshot.visibility.retain_panels(|p| p != panel);
        self.snapshot.panel_order.retain(|p| p != panel);
        self.persist();
        true
    }

    /// Flip a panel's visibility. Touches only the map, never the tree,
    /// and returns the new visibility.
    pub fn toggle_visibility(&mut self, panel: PanelId) -> bool {
        let visible = self.snapshot.visibility.toggle(panel);
        self.persist();
        visible
    }

    /// Replace the whole state with the snapshot stored under `key`
    /// (switching to a different named workspace session). `remap`
    /// translates the incoming snapshot's dynamic ids to freshly minted
    /// live ones; `live_dynamic` prunes whatever the table misses.
    pub fn load_session(
        &mut self,
        key: impl Into<String>,
        live_dynamic: &FxHashSet<PanelId>,
        remap: &FxHashMap<PanelId, PanelId>,
    ) {
        self.key = key.into();
        let bytes = self.storage.get(&self.key);
        let snapshot = match bytes {
            Some(bytes) => match crate::snapshot::LayoutSnapshot::from_bytes(&bytes) {
                Ok(snapshot) => {
                    let mut snapshot = snapshot.remap_dynamic(remap);
                    if snapshot.prune_dangling(live_dynamic) {
                        self.ids.observe_tree(&snapshot.tree);
                        snapshot
                    } else {
                        tracing::warn!(key = %self.key, "session layout held only stale panes");
                        LayoutSnapshot::new_default(&mut self.ids)
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, key = %self.key, "discarding session layout");
                    LayoutSnapshot::new_default(&mut self.ids)
                }
            },
            None => LayoutSnapshot::new_default(&mut self.ids),
        };
        self.snapshot = snapshot;
    }

    /// Best-effort write-through. Encode failures are logged and
    /// swallowed; the in-memory state is already published.
    fn persist(&mut self) {
        match self.snapshot.to_bytes() {
            Ok(bytes) => self.storage.set(&self.key, bytes),
            Err(error) => {
                tracing::warn!(%error, key = %self.key, "failed to persist layout");
            }
        }
    }
}
