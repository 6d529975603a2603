//! Drop-target resolution for drag gestures.
//!
//! The rendering layer names each active drop zone with a string token
//! from a closed vocabulary; the resolver maps `(dragged, zone)` onto
//! exactly one tree operation. Zone ids are re-validated against the
//! *current* tree at drop time, not against whatever the tree looked
//! like at drag start; a target that vanished mid-drag makes the drop
//! a silent no-op ("last validator wins").

use std::fmt;
use std::str::FromStr;

use crate::ops::{contains_node, find_panel, insert_as_tab, insert_as_split, insert_at_edge,
    remove_panel, swap_panels};
use crate::tree::{Edge, LayoutNode, NodeId, NodeIdGen, PanelId};

/// A drop zone token.
///
/// Wire vocabulary: `edge-left`, `edge-right`,
/// `split-{top|bottom|left|right}-<nodeId>`, `merge-<nodeId>`,
/// `panel-<panelId>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropZone {
    /// Left window edge.
    EdgeLeft,
    /// Right window edge.
    EdgeRight,
    /// One edge of an existing pane.
    Split { edge: Edge, node: NodeId },
    /// Center of an existing pane: join as a tab.
    Merge(NodeId),
    /// Another panel's body: exchange places (single-tab legacy zones).
    Panel(PanelId),
}

/// Token outside the drop-zone vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDropZoneError {
    pub zone: String,
}

impl fmt::Display for ParseDropZoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown drop zone {:?}", self.zone)
    }
}

impl std::error::Error for ParseDropZoneError {}

impl FromStr for DropZone {
    type Err = ParseDropZoneError;

    fn from_str(zone: &str) -> Result<Self, Self::Err> {
        let err = || ParseDropZoneError {
            zone: zone.to_owned(),
        };
        if zone == "edge-left" {
            return Ok(Self::EdgeLeft);
        }
        if zone == "edge-right" {
            return Ok(Self::EdgeRight);
        }
        for (prefix, edge) in [
            ("split-top-", Edge::Top),
            ("split-bottom-", Edge::Bottom),
            ("split-left-", Edge::Left),
            ("split-right-", Edge::Right),
        ] {
            if let Some(node) = zone.strip_prefix(prefix) {
                if node.is_empty() {
                    return Err(err());
                }
                return Ok(Self::Split {
                    edge,
                    node: NodeId::from_raw(node),
                });
            }
        }
        if let Some(node) = zone.strip_prefix("merge-") {
            if node.is_empty() {
                return Err(err());
            }
            return Ok(Self::Merge(NodeId::from_raw(node)));
        }
        if let Some(panel) = zone.strip_prefix("panel-") {
            return panel.parse().map(Self::Panel).map_err(|_| err());
        }
        Err(err())
    }
}

/// Resolve a completed drag gesture against the current tree.
///
/// Returns the new tree, or `None` when the drop must be ignored: an
/// unknown zone token, a stale target, a self-drop, or a relocation
/// that cannot be carried out. `None` always leaves the caller's tree
/// untouched.
#[must_use]
pub fn resolve_drop(
    tree: &LayoutNode,
    dragged: &PanelId,
    zone: &str,
    ids: &mut NodeIdGen,
) -> Option<LayoutNode> {
    let Ok(zone) = zone.parse::<DropZone>() else {
        tracing::debug!(zone, "ignoring drop on unknown zone");
        return None;
    };
    match zone {
        DropZone::EdgeLeft => insert_at_edge(tree, dragged.clone(), Edge::Left, ids),
        DropZone::EdgeRight => insert_at_edge(tree, dragged.clone(), Edge::Right, ids),
        DropZone::Split { edge, node } => {
            if !contains_node(tree, &node) {
                tracing::debug!(node = %node, "ignoring drop on stale split target");
                return None;
            }
            insert_as_split(tree, dragged.clone(), &node, edge, ids)
        }
        DropZone::Merge(node) => resolve_merge(tree, dragged, &node),
        DropZone::Panel(panel) => {
            if panel == *dragged {
                return None;
            }
            let swapped = swap_panels(tree, dragged, &panel);
            (swapped != *tree).then_some(swapped)
        }
    }
}

/// Relocate `dragged` into the leaf `node` as its new active tab.
fn resolve_merge(tree: &LayoutNode, dragged: &PanelId, node: &NodeId) -> Option<LayoutNode> {
    if let Some(own_leaf) = find_panel(tree, dragged) {
        // Merging a single-panel pane into itself is meaningless; the
        // renderer suppresses the zone, the resolver enforces it.
        if own_leaf.id == *node && own_leaf.panel_ids.len() == 1 {
            return None;
        }
    }
    let detached = if find_panel(tree, dragged).is_some() {
        remove_panel(tree, dragged)?
    } else {
        tree.clone()
    };
    // The removal may have collapsed ancestors, but never deletes an
    // unrelated leaf; still, re-check before dispatching.
    if !contains_node(&detached, node) {
        tracing::debug!(node = %node, "ignoring drop on stale merge target");
        return None;
    }
    Some(insert_as_tab(&detached, dragged.clone(), node))
}
