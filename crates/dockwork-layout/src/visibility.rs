//! Visibility-aware tree reduction.
//!
//! The visibility map lives *outside* the tree: hiding a panel never
//! mutates the layout, it only changes what the reducer hands to the
//! renderer. Hidden panes always reclaim their space, and because the
//! reduction renormalizes from the original stored sizes, re-showing a
//! panel restores the exact pre-hide proportions.
//!
//! # Invariants
//!
//! 1. The reduced tree never contains a group with fewer than two
//!    children (single survivors collapse in place).
//! 2. Surviving sibling sizes sum to [`crate::tree::SIZE_TOTAL`] within
//!    [`crate::tree::SIZE_EPSILON`].
//! 3. A leaf's reduced tab list keeps only visible ids; the active tab
//!    is re-pointed to the first visible id when the stored one is
//!    hidden.
//!
//! # Failure Modes
//!
//! None. Reduction is infallible; an all-hidden tree reduces to `None`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tree::{LayoutNode, PanelId, normalize_sizes};

/// Per-panel visibility, keyed by panel id.
///
/// Panels absent from the map are visible; entries for panels that are
/// not in the tree contribute nothing. `BTreeMap` keeps the serialized
/// form canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisibilityMap {
    entries: BTreeMap<PanelId, bool>,
}

impl VisibilityMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `panel` should be rendered. Unlisted panels are visible.
    #[must_use]
    pub fn is_visible(&self, panel: &PanelId) -> bool {
        self.entries.get(panel).copied().unwrap_or(true)
    }

    pub fn set(&mut self, panel: PanelId, visible: bool) {
        self.entries.insert(panel, visible);
    }

    /// Flip one panel and return its new visibility.
    pub fn toggle(&mut self, panel: PanelId) -> bool {
        let visible = !self.is_visible(&panel);
        self.entries.insert(panel, visible);
        visible
    }

    /// Drop entries for panels that no longer exist anywhere.
    pub fn retain_panels(&mut self, keep: impl Fn(&PanelId) -> bool) {
        self.entries.retain(|panel, _| keep(panel));
    }

    /// Re-key entries through a substitution table (session restore).
    #[must_use]
    pub fn remap(&self, subst: impl Fn(&PanelId) -> Option<PanelId>) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|(panel, &visible)| (subst(panel).unwrap_or_else(|| panel.clone()), visible))
            .collect();
        Self { entries }
    }
}

/// Reduce the stored tree to the subtree that should actually render,
/// or `None` when every panel is hidden.
#[must_use]
pub fn reduce_visible(tree: &LayoutNode, visibility: &VisibilityMap) -> Option<LayoutNode> {
    match tree {
        LayoutNode::Panel(leaf) => {
            let visible: Vec<PanelId> = leaf
                .panel_ids
                .iter()
                .filter(|panel| visibility.is_visible(panel))
                .cloned()
                .collect();
            if visible.is_empty() {
                return None;
            }
            let mut reduced = leaf.clone();
            let active = leaf
                .panel_ids
                .get(leaf.active_index)
                .filter(|panel| visibility.is_visible(panel));
            reduced.active_index = match active {
                Some(panel) => visible.iter().position(|p| p == panel).unwrap_or(0),
                None => 0,
            };
            reduced.panel_ids = visible;
            Some(LayoutNode::Panel(reduced))
        }
        LayoutNode::Group(group) => {
            let mut survivors = Vec::new();
            let mut survivor_sizes = Vec::new();
            for (child, &size) in group.children.iter().zip(&group.sizes) {
                if let Some(reduced) = reduce_visible(child, visibility) {
                    survivors.push(reduced);
                    survivor_sizes.push(size);
                }
            }
            match survivors.len() {
                0 => None,
                // No wrapper around a single survivor, matching the
                // collapse semantics of the tree operations.
                1 => survivors.pop(),
                _ => {
                    normalize_sizes(&mut survivor_sizes);
                    let mut reduced = group.clone();
                    reduced.children = survivors;
                    reduced.sizes = survivor_sizes;
                    Some(LayoutNode::Group(reduced))
                }
            }
        }
    }
}
