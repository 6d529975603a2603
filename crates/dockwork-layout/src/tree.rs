//! Canonical pane layout tree model.
//!
//! The tree is an arbitrarily nested grid: internal nodes ([`GroupNode`])
//! split their space among ordered children along one orientation, and
//! leaves ([`PanelNode`]) host an ordered set of panel tabs. The model is
//! host-agnostic: it never inspects panel content, only opaque
//! [`PanelId`] tokens.
//!
//! # Invariants
//!
//! 1. A leaf's `panel_ids` is never empty; emptying a leaf deletes it.
//! 2. `active_index` always indexes into `panel_ids`.
//! 3. `children.len() == sizes.len()` for every group.
//! 4. Group sizes sum to [`SIZE_TOTAL`] within [`SIZE_EPSILON`] after
//!    every operation, and every entry stays at or above
//!    [`MIN_SIZE_PCT`] (enforced by scaling, not truncation).
//! 5. A group keeps at least two children; a group reduced to one child
//!    is collapsed into that child by the operations that shrink it.
//! 6. A `PanelId` lives in at most one leaf.
//!
//! Nested groups sharing their parent's orientation are legal: the
//! sibling-splice optimization avoids creating them at insertion time,
//! but removal sequences may leave them behind and nothing flattens
//! them globally.
//!
//! # Failure Modes
//!
//! Construction helpers are infallible. [`LayoutNode::validate`] is the
//! strict gate used at the persistence boundary; it reports the first
//! violation as a [`TreeError`].

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use rustc_hash::FxHashSet;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Total of a group's size entries, in percent.
pub const SIZE_TOTAL: f64 = 100.0;

/// Tolerance for size-sum comparisons.
pub const SIZE_EPSILON: f64 = 1e-6;

/// Floor for a single size entry, in percent.
pub const MIN_SIZE_PCT: f64 = 5.0;

/// Share granted to a pane spliced into an existing group as a sibling.
pub const SPLIT_SHARE_PCT: f64 = 25.0;

/// The fixed panel surfaces of the workspace shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StaticPanel {
    Chat,
    Files,
    Editor,
    Terminal,
    Preview,
}

impl StaticPanel {
    /// Wire token for this panel.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Files => "files",
            Self::Editor => "editor",
            Self::Terminal => "terminal",
            Self::Preview => "preview",
        }
    }
}

/// Identity of *what* a pane hosts.
///
/// Static panels form a small closed set; dynamic panels are minted at
/// runtime by the editor-tab manager and carry the owning tab id. The
/// wire form is an opaque string token: `"terminal"`, `"editor:tab-7"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PanelId {
    Static(StaticPanel),
    /// Detached editor pane, wire form `editor:<tab_id>`.
    EditorTab(String),
}

impl PanelId {
    /// Shorthand for a detached editor panel.
    #[must_use]
    pub fn editor_tab(tab_id: impl Into<String>) -> Self {
        Self::EditorTab(tab_id.into())
    }

    /// Whether this id is runtime-minted and owned by an external
    /// collaborator (so it may not survive a session boundary).
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        matches!(self, Self::EditorTab(_))
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(panel) => f.write_str(panel.as_str()),
            Self::EditorTab(tab_id) => write!(f, "editor:{tab_id}"),
        }
    }
}

/// Unknown panel token in the wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePanelIdError {
    pub token: String,
}

impl fmt::Display for ParsePanelIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown panel token {:?}", self.token)
    }
}

impl std::error::Error for ParsePanelIdError {}

impl FromStr for PanelId {
    type Err = ParsePanelIdError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        if let Some(tab_id) = token.strip_prefix("editor:") {
            if tab_id.is_empty() {
                return Err(ParsePanelIdError {
                    token: token.to_owned(),
                });
            }
            return Ok(Self::EditorTab(tab_id.to_owned()));
        }
        match token {
            "chat" => Ok(Self::Static(StaticPanel::Chat)),
            "files" => Ok(Self::Static(StaticPanel::Files)),
            "editor" => Ok(Self::Static(StaticPanel::Editor)),
            "terminal" => Ok(Self::Static(StaticPanel::Terminal)),
            "preview" => Ok(Self::Static(StaticPanel::Preview)),
            _ => Err(ParsePanelIdError {
                token: token.to_owned(),
            }),
        }
    }
}

impl Serialize for PanelId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PanelId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(D::Error::custom)
    }
}

/// Structural identity of a tree node, independent of hosted panels.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Wrap a previously minted id (e.g. read back from a snapshot).
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mints [`NodeId`]s from a monotonically increasing counter plus a
/// millisecond timestamp. Ids are never reused within a process, and
/// the timestamp keeps fresh ids distinct from ids restored out of an
/// older session's snapshot.
///
/// Owned by the state handle and passed down explicitly; there is no
/// global generator.
#[derive(Debug, Default)]
pub struct NodeIdGen {
    counter: u64,
}

impl NodeIdGen {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint the next unique id.
    pub fn mint(&mut self) -> NodeId {
        self.counter += 1;
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or(0);
        NodeId(format!("n{}-{millis}", self.counter))
    }

    /// Advance the counter past every id already minted into `tree`.
    ///
    /// Ids restored from a snapshot may share a millisecond with ids a
    /// fresh generator would mint; seeding from the restored tree keeps
    /// the counter component disjoint so the two can never collide. Ids
    /// that do not carry a counter prefix are ignored.
    pub fn observe_tree(&mut self, tree: &LayoutNode) {
        fn counter_of(id: &NodeId) -> Option<u64> {
            let rest = id.as_str().strip_prefix('n')?;
            let (digits, _) = rest.split_once('-')?;
            digits.parse().ok()
        }
        fn walk(node: &LayoutNode, max: &mut u64) {
            if let Some(counter) = counter_of(node.node_id()) {
                *max = (*max).max(counter);
            }
            if let LayoutNode::Group(group) = node {
                for child in &group.children {
                    walk(child, max);
                }
            }
        }
        walk(tree, &mut self.counter);
    }
}

/// Split orientation of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Children laid out left-to-right.
    Horizontal,
    /// Children laid out top-to-bottom.
    Vertical,
}

/// Which edge of a pane (or of the whole window) a drop lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

impl Edge {
    /// Orientation of the group a split on this edge produces.
    #[must_use]
    pub const fn orientation(self) -> Orientation {
        match self {
            Self::Top | Self::Bottom => Orientation::Vertical,
            Self::Left | Self::Right => Orientation::Horizontal,
        }
    }

    /// Whether the new pane lands before the anchor in child order.
    #[must_use]
    pub const fn places_before(self) -> bool {
        matches!(self, Self::Top | Self::Left)
    }
}

/// Leaf node: one rendering slot hosting an ordered set of tabs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelNode {
    pub id: NodeId,
    /// Tab order is insertion order; never empty while the node exists.
    pub panel_ids: Vec<PanelId>,
    /// Index of the rendered tab.
    pub active_index: usize,
}

impl PanelNode {
    /// Build a single-tab leaf.
    #[must_use]
    pub fn new(id: NodeId, panel: PanelId) -> Self {
        Self {
            id,
            panel_ids: vec![panel],
            active_index: 0,
        }
    }
}

/// Internal node: an oriented split among two or more children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    pub id: NodeId,
    pub orientation: Orientation,
    pub children: Vec<LayoutNode>,
    /// Percent shares, parallel to `children`, summing to [`SIZE_TOTAL`].
    pub sizes: Vec<f64>,
}

/// A node in the layout tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutNode {
    Panel(PanelNode),
    Group(GroupNode),
}

impl LayoutNode {
    /// Structural identity of this node.
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        match self {
            Self::Panel(panel) => &panel.id,
            Self::Group(group) => &group.id,
        }
    }

    /// Strict structural validation, used at the persistence boundary.
    ///
    /// The hot operation path maintains the invariants by construction
    /// and never pays for this walk.
    pub fn validate(&self) -> Result<(), TreeError> {
        let mut seen_panels = FxHashSet::default();
        let mut seen_nodes = FxHashSet::default();
        self.validate_inner(&mut seen_panels, &mut seen_nodes)
    }

    fn validate_inner(
        &self,
        seen_panels: &mut FxHashSet<PanelId>,
        seen_nodes: &mut FxHashSet<NodeId>,
    ) -> Result<(), TreeError> {
        if !seen_nodes.insert(self.node_id().clone()) {
            return Err(TreeError::DuplicateNodeId {
                node_id: self.node_id().clone(),
            });
        }
        match self {
            Self::Panel(panel) => {
                if panel.panel_ids.is_empty() {
                    return Err(TreeError::EmptyLeaf {
                        node_id: panel.id.clone(),
                    });
                }
                if panel.active_index >= panel.panel_ids.len() {
                    return Err(TreeError::ActiveIndexOutOfRange {
                        node_id: panel.id.clone(),
                        active_index: panel.active_index,
                        tab_count: panel.panel_ids.len(),
                    });
                }
                for panel_id in &panel.panel_ids {
                    if !seen_panels.insert(panel_id.clone()) {
                        return Err(TreeError::DuplicatePanel {
                            panel_id: panel_id.clone(),
                        });
                    }
                }
                Ok(())
            }
            Self::Group(group) => {
                if group.children.len() != group.sizes.len() {
                    return Err(TreeError::SizeCountMismatch {
                        node_id: group.id.clone(),
                        children: group.children.len(),
                        sizes: group.sizes.len(),
                    });
                }
                if group.children.len() < 2 {
                    return Err(TreeError::DegenerateGroup {
                        node_id: group.id.clone(),
                        children: group.children.len(),
                    });
                }
                let sum: f64 = group.sizes.iter().sum();
                if (sum - SIZE_TOTAL).abs() > SIZE_EPSILON {
                    return Err(TreeError::SizeSumDrift {
                        node_id: group.id.clone(),
                        sum,
                    });
                }
                // More children than fit at the floor degrade to an
                // even split, so the effective floor shrinks with them.
                let floor = MIN_SIZE_PCT.min(SIZE_TOTAL / group.children.len() as f64);
                for &size in &group.sizes {
                    if size < floor - SIZE_EPSILON {
                        return Err(TreeError::UndersizedChild {
                            node_id: group.id.clone(),
                            size,
                        });
                    }
                }
                for child in &group.children {
                    child.validate_inner(seen_panels, seen_nodes)?;
                }
                Ok(())
            }
        }
    }
}

/// Structural validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeError {
    EmptyLeaf {
        node_id: NodeId,
    },
    ActiveIndexOutOfRange {
        node_id: NodeId,
        active_index: usize,
        tab_count: usize,
    },
    SizeCountMismatch {
        node_id: NodeId,
        children: usize,
        sizes: usize,
    },
    DegenerateGroup {
        node_id: NodeId,
        children: usize,
    },
    SizeSumDrift {
        node_id: NodeId,
        sum: f64,
    },
    UndersizedChild {
        node_id: NodeId,
        size: f64,
    },
    DuplicatePanel {
        panel_id: PanelId,
    },
    DuplicateNodeId {
        node_id: NodeId,
    },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyLeaf { node_id } => write!(f, "leaf {node_id} has no tabs"),
            Self::ActiveIndexOutOfRange {
                node_id,
                active_index,
                tab_count,
            } => write!(
                f,
                "leaf {node_id} active index {active_index} out of range for {tab_count} tabs"
            ),
            Self::SizeCountMismatch {
                node_id,
                children,
                sizes,
            } => write!(
                f,
                "group {node_id} has {children} children but {sizes} sizes"
            ),
            Self::DegenerateGroup { node_id, children } => {
                write!(f, "group {node_id} has {children} children (minimum 2)")
            }
            Self::SizeSumDrift { node_id, sum } => {
                write!(f, "group {node_id} sizes sum to {sum}, expected {SIZE_TOTAL}")
            }
            Self::UndersizedChild { node_id, size } => write!(
                f,
                "group {node_id} has size entry {size} below floor {MIN_SIZE_PCT}"
            ),
            Self::DuplicatePanel { panel_id } => {
                write!(f, "panel {panel_id} appears in more than one leaf")
            }
            Self::DuplicateNodeId { node_id } => {
                write!(f, "node id {node_id} appears more than once")
            }
        }
    }
}

impl std::error::Error for TreeError {}

/// Scale `sizes` so they sum to [`SIZE_TOTAL`], then lift entries below
/// [`MIN_SIZE_PCT`] up to the floor, taking the difference from the
/// remaining entries proportionally.
///
/// With more entries than fit at the floor this degrades to an even
/// split; callers never create such groups through the public surface.
pub fn normalize_sizes(sizes: &mut [f64]) {
    if sizes.is_empty() {
        return;
    }
    if sizes.len() as f64 * MIN_SIZE_PCT >= SIZE_TOTAL {
        let even = SIZE_TOTAL / sizes.len() as f64;
        sizes.fill(even);
        return;
    }
    let sum: f64 = sizes.iter().sum();
    if sum <= 0.0 {
        let even = SIZE_TOTAL / sizes.len() as f64;
        sizes.fill(even);
    } else {
        let scale = SIZE_TOTAL / sum;
        for size in sizes.iter_mut() {
            *size *= scale;
        }
    }

    // Lift floored entries; the pass re-runs because lifting one entry
    // shrinks the others, which can push another below the floor.
    loop {
        let mut deficit = 0.0;
        let mut headroom = 0.0;
        for &size in sizes.iter() {
            if size < MIN_SIZE_PCT {
                deficit += MIN_SIZE_PCT - size;
            } else {
                headroom += size - MIN_SIZE_PCT;
            }
        }
        if deficit <= SIZE_EPSILON {
            return;
        }
        let shrink = deficit / headroom;
        for size in sizes.iter_mut() {
            if *size < MIN_SIZE_PCT {
                *size = MIN_SIZE_PCT;
            } else {
                *size -= (*size - MIN_SIZE_PCT) * shrink;
            }
        }
    }
}

/// The hard-coded first-use layout: chat | (editor / terminal) | files+preview,
/// columns sized 25/50/25.
#[must_use]
pub fn default_tree(ids: &mut NodeIdGen) -> LayoutNode {
    let chat = LayoutNode::Panel(PanelNode::new(ids.mint(), PanelId::Static(StaticPanel::Chat)));
    let editor = LayoutNode::Panel(PanelNode::new(
        ids.mint(),
        PanelId::Static(StaticPanel::Editor),
    ));
    let terminal = LayoutNode::Panel(PanelNode::new(
        ids.mint(),
        PanelId::Static(StaticPanel::Terminal),
    ));
    let center = LayoutNode::Group(GroupNode {
        id: ids.mint(),
        orientation: Orientation::Vertical,
        children: vec![editor, terminal],
        sizes: vec![70.0, 30.0],
    });
    let side = LayoutNode::Panel(PanelNode {
        id: ids.mint(),
        panel_ids: vec![
            PanelId::Static(StaticPanel::Files),
            PanelId::Static(StaticPanel::Preview),
        ],
        active_index: 0,
    });
    LayoutNode::Group(GroupNode {
        id: ids.mint(),
        orientation: Orientation::Horizontal,
        children: vec![chat, center, side],
        sizes: vec![25.0, 50.0, 25.0],
    })
}

/// Default sidebar ordering for the small-screen single-column mode.
#[must_use]
pub fn default_panel_order() -> Vec<PanelId> {
    vec![
        PanelId::Static(StaticPanel::Chat),
        PanelId::Static(StaticPanel::Editor),
        PanelId::Static(StaticPanel::Terminal),
        PanelId::Static(StaticPanel::Files),
        PanelId::Static(StaticPanel::Preview),
    ]
}
