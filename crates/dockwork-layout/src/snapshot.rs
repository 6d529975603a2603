//! Versioned persistence of the layout state.
//!
//! A [`LayoutSnapshot`] bundles the tree with the visibility map and
//! the auxiliary small-screen panel ordering, tagged with a schema
//! version. The codec is a direct structural copy (the tree is made of
//! serializable primitives), so the interesting work is on the restore
//! side.
//!
//! # Schema Versioning Policy
//!
//! Breaking changes bump [`SNAPSHOT_SCHEMA_VERSION`]; a snapshot
//! carrying any other version is discarded wholesale rather than
//! partially migrated, and the caller falls back to the default layout.
//!
//! # Failure Modes
//!
//! Decoding rejects malformed bytes, unknown schema versions, and
//! structurally invalid trees with a [`SnapshotError`]. [`restore`]
//! never fails: every rejection degrades to the default snapshot with a
//! warning, because a corrupt layout must never strand the user.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::ops::{all_panel_ids, remove_panel};
use crate::tree::{
    LayoutNode, NodeIdGen, PanelId, TreeError, default_panel_order, default_tree,
};
use crate::visibility::VisibilityMap;

/// Current snapshot schema version.
pub const SNAPSHOT_SCHEMA_VERSION: u16 = 1;

/// The persisted unit: tree + visibility + auxiliary ordering lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub schema_version: u16,
    pub tree: LayoutNode,
    #[serde(default)]
    pub visibility: VisibilityMap,
    /// Panel order for the small-screen single-column rendering mode.
    #[serde(default)]
    pub panel_order: Vec<PanelId>,
}

impl LayoutSnapshot {
    /// The hard-coded first-use state.
    #[must_use]
    pub fn new_default(ids: &mut NodeIdGen) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            tree: default_tree(ids),
            visibility: VisibilityMap::new(),
            panel_order: default_panel_order(),
        }
    }

    /// Serialize for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        serde_json::to_vec(self).map_err(|source| SnapshotError::Encode {
            detail: source.to_string(),
        })
    }

    /// Strict decode: structure, version, and tree invariants.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self =
            serde_json::from_slice(bytes).map_err(|source| SnapshotError::Malformed {
                detail: source.to_string(),
            })?;
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                version: snapshot.schema_version,
            });
        }
        snapshot.tree.validate().map_err(SnapshotError::Invalid)?;
        Ok(snapshot)
    }

    /// Apply a dynamic-id substitution table tree-wide, covering the
    /// visibility map and ordering list as well. Used when a snapshot
    /// from another session is adopted and the editor-tab manager has
    /// re-minted its tab ids.
    #[must_use]
    pub fn remap_dynamic(&self, table: &FxHashMap<PanelId, PanelId>) -> Self {
        fn remap_tree(node: &LayoutNode, table: &FxHashMap<PanelId, PanelId>) -> LayoutNode {
            match node {
                LayoutNode::Panel(leaf) => {
                    let mut leaf = leaf.clone();
                    for panel in &mut leaf.panel_ids {
                        if let Some(mapped) = table.get(panel) {
                            *panel = mapped.clone();
                        }
                    }
                    LayoutNode::Panel(leaf)
                }
                LayoutNode::Group(group) => {
                    let mut group = group.clone();
                    for child in &mut group.children {
                        *child = remap_tree(child, table);
                    }
                    LayoutNode::Group(group)
                }
            }
        }
        Self {
            schema_version: self.schema_version,
            tree: remap_tree(&self.tree, table),
            visibility: self.visibility.remap(|panel| table.get(panel).cloned()),
            panel_order: self
                .panel_order
                .iter()
                .map(|panel| table.get(panel).cloned().unwrap_or_else(|| panel.clone()))
                .collect(),
        }
    }

    /// Drop dynamic panels with no live external owner, collapsing the
    /// tree exactly as an interactive close would. Returns `false` when
    /// pruning would empty the tree (the caller should fall back to the
    /// default layout).
    #[must_use]
    pub fn prune_dangling(&mut self, live_dynamic: &FxHashSet<PanelId>) -> bool {
        let dangling: Vec<PanelId> = all_panel_ids(&self.tree)
            .into_iter()
            .filter(|panel| panel.is_dynamic() && !live_dynamic.contains(panel))
            .collect();
        for panel in &dangling {
            match remove_panel(&self.tree, panel) {
                Some(tree) => self.tree = tree,
                // The only way removal of a hosted panel fails is that
                // it was the last one.
                None => return false,
            }
        }
        self.visibility
            .retain_panels(|panel| !panel.is_dynamic() || live_dynamic.contains(panel));
        self.panel_order
            .retain(|panel| !panel.is_dynamic() || live_dynamic.contains(panel));
        true
    }
}

/// Decode/encode failures at the storage boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotError {
    Malformed { detail: String },
    UnsupportedVersion { version: u16 },
    Invalid(TreeError),
    Encode { detail: String },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { detail } => write!(f, "malformed layout snapshot: {detail}"),
            Self::UnsupportedVersion { version } => write!(
                f,
                "unsupported snapshot schema version {version} (expected {SNAPSHOT_SCHEMA_VERSION})"
            ),
            Self::Invalid(source) => write!(f, "snapshot tree failed validation: {source}"),
            Self::Encode { detail } => write!(f, "failed to encode layout snapshot: {detail}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Best-effort restore: decode `bytes` and prune dangling dynamic ids,
/// degrading to the default snapshot on any rejection.
#[must_use]
pub fn restore(
    bytes: Option<&[u8]>,
    live_dynamic: &FxHashSet<PanelId>,
    ids: &mut NodeIdGen,
) -> LayoutSnapshot {
    let Some(bytes) = bytes else {
        return LayoutSnapshot::new_default(ids);
    };
    let mut snapshot = match LayoutSnapshot::from_bytes(bytes) {
        Ok(snapshot) => snapshot,
        Err(error) => {
            tracing::warn!(%error, "discarding stored layout snapshot");
            return LayoutSnapshot::new_default(ids);
        }
    };
    if !snapshot.prune_dangling(live_dynamic) {
        tracing::warn!("stored layout held only stale panes, using default layout");
        return LayoutSnapshot::new_default(ids);
    }
    // A fresh generator must not re-mint a restored id.
    ids.observe_tree(&snapshot.tree);
    snapshot
}
