//! Pure transforms over the layout tree.
//!
//! Every operation takes the current tree by reference and returns a
//! brand-new tree; the input is never mutated. Operations are total:
//! unknown identifiers yield either an unchanged clone or `None`, never
//! a panic. `None` always means "not applicable, keep the old tree";
//! callers branch on it before publishing anything.
//!
//! The only non-referentially-transparent input is the [`NodeIdGen`]
//! passed to the operations that create leaves.

use crate::tree::{
    Edge, GroupNode, LayoutNode, NodeId, NodeIdGen, PanelId, PanelNode, SIZE_TOTAL,
    SPLIT_SHARE_PCT, normalize_sizes,
};

/// Depth-first search for the leaf hosting `panel`.
#[must_use]
pub fn find_panel<'a>(tree: &'a LayoutNode, panel: &PanelId) -> Option<&'a PanelNode> {
    match tree {
        LayoutNode::Panel(leaf) => leaf.panel_ids.contains(panel).then_some(leaf),
        LayoutNode::Group(group) => {
            group.children.iter().find_map(|child| find_panel(child, panel))
        }
    }
}

/// Look up a group by structural id.
#[must_use]
pub fn find_group<'a>(tree: &'a LayoutNode, id: &NodeId) -> Option<&'a GroupNode> {
    match tree {
        LayoutNode::Panel(_) => None,
        LayoutNode::Group(group) => {
            if group.id == *id {
                Some(group)
            } else {
                group.children.iter().find_map(|child| find_group(child, id))
            }
        }
    }
}

/// Whether any node (leaf or group) carries `id`.
#[must_use]
pub fn contains_node(tree: &LayoutNode, id: &NodeId) -> bool {
    match tree {
        LayoutNode::Panel(leaf) => leaf.id == *id,
        LayoutNode::Group(group) => {
            group.id == *id || group.children.iter().any(|child| contains_node(child, id))
        }
    }
}

/// All hosted panel ids in preorder. Free of duplicates for any tree
/// reachable through the public operations.
#[must_use]
pub fn all_panel_ids(tree: &LayoutNode) -> Vec<PanelId> {
    fn walk(node: &LayoutNode, out: &mut Vec<PanelId>) {
        match node {
            LayoutNode::Panel(leaf) => out.extend(leaf.panel_ids.iter().cloned()),
            LayoutNode::Group(group) => {
                for child in &group.children {
                    walk(child, out);
                }
            }
        }
    }
    let mut out = Vec::new();
    walk(tree, &mut out);
    out
}

/// Outcome of removing a panel from a subtree.
enum Removal {
    /// Panel not hosted in this subtree.
    Absent,
    /// Panel removed; the subtree survives in reduced form.
    Replaced(LayoutNode),
    /// Panel removed and the whole subtree vanished with it.
    Emptied,
}

/// Remove `panel` from the tree.
///
/// A multi-tab leaf drops the tab and clamps its active index; a
/// single-tab leaf is deleted, its size reclaimed by the siblings, and
/// groups left with one child collapse into that child, recursively up
/// the ancestor chain.
///
/// Returns `None` when `panel` is absent, and also when removal would
/// empty the entire tree: the last panel cannot be closed.
#[must_use]
pub fn remove_panel(tree: &LayoutNode, panel: &PanelId) -> Option<LayoutNode> {
    match remove_inner(tree, panel) {
        Removal::Replaced(new_tree) => Some(new_tree),
        Removal::Absent | Removal::Emptied => None,
    }
}

fn remove_inner(node: &LayoutNode, panel: &PanelId) -> Removal {
    match node {
        LayoutNode::Panel(leaf) => {
            let Some(tab_index) = leaf.panel_ids.iter().position(|id| id == panel) else {
                return Removal::Absent;
            };
            if leaf.panel_ids.len() == 1 {
                return Removal::Emptied;
            }
            let mut leaf = leaf.clone();
            leaf.panel_ids.remove(tab_index);
            leaf.active_index = leaf.active_index.min(leaf.panel_ids.len() - 1);
            Removal::Replaced(LayoutNode::Panel(leaf))
        }
        LayoutNode::Group(group) => {
            for (child_index, child) in group.children.iter().enumerate() {
                match remove_inner(child, panel) {
                    Removal::Absent => {}
                    Removal::Replaced(new_child) => {
                        let mut group = group.clone();
                        group.children[child_index] = new_child;
                        return Removal::Replaced(LayoutNode::Group(group));
                    }
                    Removal::Emptied => {
                        let mut group = group.clone();
                        group.children.remove(child_index);
                        group.sizes.remove(child_index);
                        return match group.children.len() {
                            0 => Removal::Emptied,
                            1 => Removal::Replaced(group.children.pop().expect("one child left")),
                            _ => {
                                normalize_sizes(&mut group.sizes);
                                Removal::Replaced(LayoutNode::Group(group))
                            }
                        };
                    }
                }
            }
            Removal::Absent
        }
    }
}

/// Append `panel` as the new active tab of the leaf `target`.
///
/// Unchanged clone when `target` does not name a leaf in the tree.
#[must_use]
pub fn insert_as_tab(tree: &LayoutNode, panel: PanelId, target: &NodeId) -> LayoutNode {
    match tree {
        LayoutNode::Panel(leaf) if leaf.id == *target => {
            let mut leaf = leaf.clone();
            leaf.active_index = leaf.panel_ids.len();
            leaf.panel_ids.push(panel);
            LayoutNode::Panel(leaf)
        }
        LayoutNode::Panel(_) => tree.clone(),
        LayoutNode::Group(group) => {
            let mut group = group.clone();
            for child in &mut group.children {
                *child = insert_as_tab(child, panel.clone(), target);
            }
            LayoutNode::Group(group)
        }
    }
}

/// Split the leaf `target`, placing `panel` on the given edge of it.
///
/// When the target's parent group already runs in the matching
/// orientation the new pane is spliced in as a direct sibling at a
/// fixed [`SPLIT_SHARE_PCT`] share, shrinking the others proportionally
/// (never below the size floor). Otherwise the target is replaced by a
/// new two-child group split 50/50.
///
/// A panel already hosted in the tree is relocated: it is removed from
/// its old position first. Returns `None` when that removal fails, or
/// when `target` is not a leaf of the (post-removal) tree.
#[must_use]
pub fn insert_as_split(
    tree: &LayoutNode,
    panel: PanelId,
    target: &NodeId,
    edge: Edge,
    ids: &mut NodeIdGen,
) -> Option<LayoutNode> {
    let tree = detach_for_move(tree, &panel)?;
    let new_leaf = LayoutNode::Panel(PanelNode::new(ids.mint(), panel));
    if tree.node_id() == target {
        return Some(wrap_split(tree, new_leaf, edge, ids));
    }
    split_in_group(&tree, target, new_leaf, edge, ids)
}

/// Same placement as [`insert_as_split`], anchored at the tree root.
/// Used for drops on the window edge.
#[must_use]
pub fn insert_at_edge(
    tree: &LayoutNode,
    panel: PanelId,
    edge: Edge,
    ids: &mut NodeIdGen,
) -> Option<LayoutNode> {
    let tree = detach_for_move(tree, &panel)?;
    let new_leaf = LayoutNode::Panel(PanelNode::new(ids.mint(), panel));
    match tree {
        LayoutNode::Group(ref group) if group.orientation == edge.orientation() => {
            let mut group = group.clone();
            let insert_index = if edge.places_before() { 0 } else { group.children.len() };
            splice_sibling(&mut group, insert_index, new_leaf);
            Some(LayoutNode::Group(group))
        }
        other => Some(wrap_split(other, new_leaf, edge, ids)),
    }
}

/// Remove a relocating panel from its old position.
///
/// A panel not present in the tree (a freshly minted dynamic id) skips
/// the removal step; one that is present but cannot be removed (it is
/// the last panel) aborts the whole operation.
fn detach_for_move(tree: &LayoutNode, panel: &PanelId) -> Option<LayoutNode> {
    if find_panel(tree, panel).is_some() {
        remove_panel(tree, panel)
    } else {
        Some(tree.clone())
    }
}

/// Replace `old` with a new group holding `new_leaf` and `old` 50/50.
fn wrap_split(old: LayoutNode, new_leaf: LayoutNode, edge: Edge, ids: &mut NodeIdGen) -> LayoutNode {
    let children = if edge.places_before() {
        vec![new_leaf, old]
    } else {
        vec![old, new_leaf]
    };
    LayoutNode::Group(GroupNode {
        id: ids.mint(),
        orientation: edge.orientation(),
        children,
        sizes: vec![SIZE_TOTAL / 2.0, SIZE_TOTAL / 2.0],
    })
}

/// Insert `new_child` into `group` at `index` with the fixed split
/// share, shrinking the existing siblings proportionally.
fn splice_sibling(group: &mut GroupNode, index: usize, new_child: LayoutNode) {
    let shrink = (SIZE_TOTAL - SPLIT_SHARE_PCT) / SIZE_TOTAL;
    for size in &mut group.sizes {
        *size *= shrink;
    }
    group.children.insert(index, new_child);
    group.sizes.insert(index, SPLIT_SHARE_PCT);
    normalize_sizes(&mut group.sizes);
}

fn split_in_group(
    node: &LayoutNode,
    target: &NodeId,
    new_leaf: LayoutNode,
    edge: Edge,
    ids: &mut NodeIdGen,
) -> Option<LayoutNode> {
    let LayoutNode::Group(group) = node else {
        return None;
    };
    for (child_index, child) in group.children.iter().enumerate() {
        let is_target = match child {
            LayoutNode::Panel(leaf) => leaf.id == *target,
            LayoutNode::Group(_) => false,
        };
        if is_target {
            let mut group = group.clone();
            if group.orientation == edge.orientation() {
                let insert_index = if edge.places_before() { child_index } else { child_index + 1 };
                splice_sibling(&mut group, insert_index, new_leaf);
            } else {
                let old = group.children[child_index].clone();
                group.children[child_index] = wrap_split(old, new_leaf, edge, ids);
            }
            return Some(LayoutNode::Group(group));
        }
        if let Some(new_child) = split_in_group(child, target, new_leaf.clone(), edge, ids) {
            let mut group = group.clone();
            group.children[child_index] = new_child;
            return Some(LayoutNode::Group(group));
        }
    }
    None
}

/// Exchange two single-tab panes, trading both tab membership and leaf
/// node ids so the grid geometry stays put.
///
/// Legacy variant kept for the `panel-` drop zone. Unchanged clone when
/// `a == b`, when either panel is missing, or when either leaf hosts
/// more than one tab.
#[must_use]
pub fn swap_panels(tree: &LayoutNode, a: &PanelId, b: &PanelId) -> LayoutNode {
    if a == b {
        return tree.clone();
    }
    let single_tab_leaf = |panel: &PanelId| {
        find_panel(tree, panel).filter(|leaf| leaf.panel_ids.len() == 1).cloned()
    };
    let (Some(leaf_a), Some(leaf_b)) = (single_tab_leaf(a), single_tab_leaf(b)) else {
        return tree.clone();
    };

    fn exchange(node: &LayoutNode, leaf_a: &PanelNode, leaf_b: &PanelNode) -> LayoutNode {
        match node {
            LayoutNode::Panel(leaf) if leaf.id == leaf_a.id => LayoutNode::Panel(leaf_b.clone()),
            LayoutNode::Panel(leaf) if leaf.id == leaf_b.id => LayoutNode::Panel(leaf_a.clone()),
            LayoutNode::Panel(_) => node.clone(),
            LayoutNode::Group(group) => {
                let mut group = group.clone();
                for child in &mut group.children {
                    *child = exchange(child, leaf_a, leaf_b);
                }
                LayoutNode::Group(group)
            }
        }
    }
    exchange(tree, &leaf_a, &leaf_b)
}

/// Replace a group's sizes wholesale. The caller supplies a normalized
/// (sum-to-[`SIZE_TOTAL`]) array; a missing group or a length mismatch
/// yields an unchanged clone.
#[must_use]
pub fn resize_group(tree: &LayoutNode, group_id: &NodeId, sizes: &[f64]) -> LayoutNode {
    match tree {
        LayoutNode::Panel(_) => tree.clone(),
        LayoutNode::Group(group) => {
            let mut group = group.clone();
            if group.id == *group_id {
                if group.children.len() == sizes.len() {
                    group.sizes = sizes.to_vec();
                }
            } else {
                for child in &mut group.children {
                    *child = resize_group(child, group_id, sizes);
                }
            }
            LayoutNode::Group(group)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{MIN_SIZE_PCT, Orientation, SIZE_EPSILON, StaticPanel, default_tree};
    use proptest::prelude::*;
    use rustc_hash::FxHashSet;

    fn chat() -> PanelId {
        PanelId::Static(StaticPanel::Chat)
    }

    fn files() -> PanelId {
        PanelId::Static(StaticPanel::Files)
    }

    fn editor() -> PanelId {
        PanelId::Static(StaticPanel::Editor)
    }

    fn terminal() -> PanelId {
        PanelId::Static(StaticPanel::Terminal)
    }

    fn assert_sizes_sum(tree: &LayoutNode) {
        if let LayoutNode::Group(group) = tree {
            let sum: f64 = group.sizes.iter().sum();
            assert!(
                (sum - SIZE_TOTAL).abs() < SIZE_EPSILON,
                "group {} sizes sum to {sum}",
                group.id
            );
            for child in &group.children {
                assert_sizes_sum(child);
            }
        }
    }

    #[test]
    fn find_panel_locates_tabs() {
        let mut ids = NodeIdGen::new();
        let tree = default_tree(&mut ids);
        let leaf = find_panel(&tree, &files()).expect("files leaf exists");
        assert!(leaf.panel_ids.contains(&PanelId::Static(StaticPanel::Preview)));
        assert!(find_panel(&tree, &PanelId::editor_tab("missing")).is_none());
    }

    #[test]
    fn remove_drops_tab_and_clamps_active_index() {
        let mut ids = NodeIdGen::new();
        let tree = default_tree(&mut ids);
        let side_id = find_panel(&tree, &files()).expect("side leaf").id.clone();
        let preview = PanelId::Static(StaticPanel::Preview);
        // Re-insert preview so it becomes the active (last) tab.
        let tree = remove_panel(&tree, &preview).expect("removable");
        let tree = insert_as_tab(&tree, preview.clone(), &side_id);
        let leaf = find_panel(&tree, &preview).expect("leaf");
        assert_eq!(leaf.active_index, 1);
        let tree = remove_panel(&tree, &preview).expect("removable");
        let leaf = find_panel(&tree, &files()).expect("leaf survives");
        assert_eq!(leaf.panel_ids, vec![files()]);
        assert_eq!(leaf.active_index, 0);
    }

    #[test]
    fn remove_collapses_single_child_groups() {
        let mut ids = NodeIdGen::new();
        let tree = default_tree(&mut ids);
        // editor and terminal share a vertical group; removing terminal
        // must collapse it into the editor leaf.
        let tree = remove_panel(&tree, &terminal()).expect("removable");
        tree.validate().expect("tree stays valid");
        let LayoutNode::Group(root) = &tree else {
            panic!("root must stay a group");
        };
        assert_eq!(root.children.len(), 3);
        assert!(matches!(root.children[1], LayoutNode::Panel(_)));
        assert_sizes_sum(&tree);
    }

    #[test]
    fn remove_renormalizes_sibling_sizes() {
        let mut ids = NodeIdGen::new();
        let tree = default_tree(&mut ids);
        let tree = remove_panel(&tree, &chat()).expect("removable");
        let LayoutNode::Group(root) = &tree else {
            panic!("root must stay a group");
        };
        assert_eq!(root.children.len(), 2);
        // 50/25 rescaled to 100.
        assert!((root.sizes[0] - 200.0 / 3.0).abs() < 1e-9);
        assert!((root.sizes[1] - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn remove_refuses_to_empty_the_tree() {
        let mut ids = NodeIdGen::new();
        let tree = LayoutNode::Panel(PanelNode::new(ids.mint(), chat()));
        assert_eq!(remove_panel(&tree, &chat()), None);
    }

    #[test]
    fn remove_is_none_for_absent_panel() {
        let mut ids = NodeIdGen::new();
        let tree = default_tree(&mut ids);
        assert_eq!(remove_panel(&tree, &PanelId::editor_tab("tab-9")), None);
    }

    #[test]
    fn insert_tab_then_remove_round_trips() {
        let mut ids = NodeIdGen::new();
        let tree = default_tree(&mut ids);
        let target = find_panel(&tree, &chat()).expect("chat leaf").id.clone();
        let panel = PanelId::editor_tab("tab-1");
        let inserted = insert_as_tab(&tree, panel.clone(), &target);
        let leaf = find_panel(&inserted, &panel).expect("tab landed");
        assert_eq!(leaf.active_index, 1);
        let removed = remove_panel(&inserted, &panel).expect("removable");
        assert_eq!(removed, tree);
    }

    #[test]
    fn insert_tab_with_unknown_target_is_noop() {
        let mut ids = NodeIdGen::new();
        let tree = default_tree(&mut ids);
        let unchanged = insert_as_tab(&tree, PanelId::editor_tab("t"), &NodeId::from_raw("ghost"));
        assert_eq!(unchanged, tree);
    }

    #[test]
    fn split_right_creates_fifty_fifty_group() {
        // Dragging `files` onto split-right of the
        // editor pane produces a horizontal [editor, files] 50/50 group
        // and files vanishes from its old leaf.
        let mut ids = NodeIdGen::new();
        let tree = default_tree(&mut ids);
        let editor_node = find_panel(&tree, &editor()).expect("editor leaf").id.clone();
        let tree = insert_as_split(&tree, files(), &editor_node, Edge::Right, &mut ids)
            .expect("split applies");
        tree.validate().expect("valid after split");
        let parent = {
            // The editor leaf's new parent: a horizontal 50/50 group.
            fn parent_of<'a>(node: &'a LayoutNode, target: &NodeId) -> Option<&'a GroupNode> {
                let LayoutNode::Group(group) = node else { return None };
                for child in &group.children {
                    if child.node_id() == target {
                        return Some(group);
                    }
                    if let Some(found) = parent_of(child, target) {
                        return Some(found);
                    }
                }
                None
            }
            parent_of(&tree, &editor_node).expect("editor still present")
        };
        assert_eq!(parent.orientation, Orientation::Horizontal);
        assert_eq!(parent.children.len(), 2);
        assert_eq!(parent.sizes, vec![50.0, 50.0]);
        assert_eq!(parent.children[0].node_id(), &editor_node);
        assert_eq!(
            all_panel_ids(&tree).iter().filter(|id| **id == files()).count(),
            1
        );
    }

    #[test]
    fn split_matching_orientation_splices_sibling() {
        let mut ids = NodeIdGen::new();
        let tree = default_tree(&mut ids);
        let chat_node = find_panel(&tree, &chat()).expect("chat leaf").id.clone();
        // Root is horizontal; a left split of the chat column splices a
        // sibling rather than nesting a group.
        let tree = insert_as_split(&tree, PanelId::editor_tab("t1"), &chat_node, Edge::Left, &mut ids)
            .expect("split applies");
        let LayoutNode::Group(root) = &tree else {
            panic!("root must stay a group");
        };
        assert_eq!(root.children.len(), 4);
        assert!((root.sizes[0] - SPLIT_SHARE_PCT).abs() < SIZE_EPSILON);
        assert_eq!(root.children[1].node_id(), &chat_node);
        assert_sizes_sum(&tree);
    }

    #[test]
    fn split_with_stale_target_is_none() {
        let mut ids = NodeIdGen::new();
        let tree = default_tree(&mut ids);
        assert!(
            insert_as_split(&tree, files(), &NodeId::from_raw("gone"), Edge::Top, &mut ids)
                .is_none()
        );
    }

    #[test]
    fn edge_insert_extends_matching_root() {
        // Left edge insert on a horizontal [60,40]
        // root yields approximately [25,45,30], new column first.
        let mut ids = NodeIdGen::new();
        let left = LayoutNode::Panel(PanelNode::new(ids.mint(), editor()));
        let right = LayoutNode::Panel(PanelNode::new(ids.mint(), terminal()));
        let tree = LayoutNode::Group(GroupNode {
            id: ids.mint(),
            orientation: Orientation::Horizontal,
            children: vec![left, right],
            sizes: vec![60.0, 40.0],
        });
        let tree = insert_at_edge(&tree, chat(), Edge::Left, &mut ids).expect("edge insert");
        let LayoutNode::Group(root) = &tree else {
            panic!("root must stay a group");
        };
        assert_eq!(root.children.len(), 3);
        assert!((root.sizes[0] - 25.0).abs() < 1e-9);
        assert!((root.sizes[1] - 45.0).abs() < 1e-9);
        assert!((root.sizes[2] - 30.0).abs() < 1e-9);
        assert_eq!(all_panel_ids(&tree)[0], chat());
    }

    #[test]
    fn edge_insert_wraps_mismatched_root() {
        let mut ids = NodeIdGen::new();
        let tree = default_tree(&mut ids);
        let tree = insert_at_edge(&tree, PanelId::editor_tab("t1"), Edge::Top, &mut ids)
            .expect("edge insert");
        let LayoutNode::Group(root) = &tree else {
            panic!("root must be a group");
        };
        assert_eq!(root.orientation, Orientation::Vertical);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.sizes, vec![50.0, 50.0]);
        assert!(matches!(root.children[0], LayoutNode::Panel(_)));
    }

    #[test]
    fn edge_insert_relocates_existing_panel() {
        let mut ids = NodeIdGen::new();
        let tree = default_tree(&mut ids);
        let tree = insert_at_edge(&tree, chat(), Edge::Right, &mut ids).expect("edge insert");
        tree.validate().expect("valid after relocation");
        let hosted = all_panel_ids(&tree);
        assert_eq!(hosted.iter().filter(|id| **id == chat()).count(), 1);
        assert_eq!(hosted.last(), Some(&chat()));
    }

    #[test]
    fn swap_is_an_involution() {
        let mut ids = NodeIdGen::new();
        let tree = default_tree(&mut ids);
        let swapped = swap_panels(&tree, &chat(), &editor());
        assert_ne!(swapped, tree);
        assert_eq!(swap_panels(&swapped, &chat(), &editor()), tree);
    }

    #[test]
    fn swap_keeps_geometry() {
        let mut ids = NodeIdGen::new();
        let tree = default_tree(&mut ids);
        let swapped = swap_panels(&tree, &chat(), &editor());
        let LayoutNode::Group(before) = &tree else { panic!() };
        let LayoutNode::Group(after) = &swapped else { panic!() };
        assert_eq!(before.sizes, after.sizes);
        // Chat column now hosts the editor leaf.
        assert!(matches!(
            &after.children[0],
            LayoutNode::Panel(leaf) if leaf.panel_ids == vec![editor()]
        ));
    }

    #[test]
    fn swap_rejects_multi_tab_and_self() {
        let mut ids = NodeIdGen::new();
        let tree = default_tree(&mut ids);
        // files+preview share a leaf: not a single-tab swap candidate.
        assert_eq!(swap_panels(&tree, &chat(), &files()), tree);
        assert_eq!(swap_panels(&tree, &chat(), &chat()), tree);
    }

    #[test]
    fn resize_replaces_sizes_wholesale() {
        let mut ids = NodeIdGen::new();
        let tree = default_tree(&mut ids);
        let root_id = tree.node_id().clone();
        let resized = resize_group(&tree, &root_id, &[20.0, 60.0, 20.0]);
        let LayoutNode::Group(root) = &resized else { panic!() };
        assert_eq!(root.sizes, vec![20.0, 60.0, 20.0]);
    }

    #[test]
    fn resize_ignores_length_mismatch_and_unknown_group() {
        let mut ids = NodeIdGen::new();
        let tree = default_tree(&mut ids);
        let root_id = tree.node_id().clone();
        assert_eq!(resize_group(&tree, &root_id, &[50.0, 50.0]), tree);
        assert_eq!(resize_group(&tree, &NodeId::from_raw("ghost"), &[50.0, 50.0]), tree);
    }

    // Random operation sequences keep the structural invariants.

    #[derive(Debug, Clone)]
    enum Op {
        InsertTab { tab: u8, leaf_pick: usize },
        Split { tab: u8, leaf_pick: usize, edge: Edge },
        EdgeInsert { tab: u8, edge: Edge },
        Remove { panel_pick: usize },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        let edge = prop_oneof![
            Just(Edge::Top),
            Just(Edge::Bottom),
            Just(Edge::Left),
            Just(Edge::Right),
        ];
        prop_oneof![
            (any::<u8>(), 0usize..16).prop_map(|(tab, leaf_pick)| Op::InsertTab { tab, leaf_pick }),
            (any::<u8>(), 0usize..16, edge.clone())
                .prop_map(|(tab, leaf_pick, edge)| Op::Split { tab, leaf_pick, edge }),
            (any::<u8>(), edge).prop_map(|(tab, edge)| Op::EdgeInsert { tab, edge }),
            (0usize..16).prop_map(|panel_pick| Op::Remove { panel_pick }),
        ]
    }

    fn leaf_ids(tree: &LayoutNode) -> Vec<NodeId> {
        fn walk(node: &LayoutNode, out: &mut Vec<NodeId>) {
            match node {
                LayoutNode::Panel(leaf) => out.push(leaf.id.clone()),
                LayoutNode::Group(group) => {
                    for child in &group.children {
                        walk(child, out);
                    }
                }
            }
        }
        let mut out = Vec::new();
        walk(tree, &mut out);
        out
    }

    fn apply(tree: &LayoutNode, op: &Op, step: usize, ids: &mut NodeIdGen) -> Option<LayoutNode> {
        // Tab ids carry the step index: `insert_as_tab` is the one raw
        // operation that does not relocate, so a colliding id would
        // fabricate a duplicate no UI path can produce.
        match op {
            Op::InsertTab { tab, leaf_pick } => {
                let leaves = leaf_ids(tree);
                let target = &leaves[leaf_pick % leaves.len()];
                Some(insert_as_tab(tree, PanelId::editor_tab(format!("t{tab}-{step}")), target))
            }
            Op::Split { tab, leaf_pick, edge } => {
                let leaves = leaf_ids(tree);
                let target = leaves[leaf_pick % leaves.len()].clone();
                insert_as_split(
                    tree,
                    PanelId::editor_tab(format!("t{tab}-{step}")),
                    &target,
                    *edge,
                    ids,
                )
            }
            Op::EdgeInsert { tab, edge } => {
                insert_at_edge(tree, PanelId::editor_tab(format!("t{tab}-{step}")), *edge, ids)
            }
            Op::Remove { panel_pick } => {
                let panels = all_panel_ids(tree);
                remove_panel(tree, &panels[panel_pick % panels.len()])
            }
        }
    }

    proptest! {
        #[test]
        fn random_ops_preserve_invariants(ops in proptest::collection::vec(op_strategy(), 1..40)) {
            let mut ids = NodeIdGen::new();
            let mut tree = default_tree(&mut ids);
            for (step, op) in ops.iter().enumerate() {
                if let Some(next) = apply(&tree, op, step, &mut ids) {
                    tree = next;
                }
                assert_sizes_sum(&tree);
                let panels = all_panel_ids(&tree);
                let unique: FxHashSet<_> = panels.iter().collect();
                prop_assert_eq!(unique.len(), panels.len(), "duplicate panel id");
                prop_assert!(!panels.is_empty(), "tree lost its last panel");
            }
        }

        #[test]
        fn random_ops_keep_size_floor(ops in proptest::collection::vec(op_strategy(), 1..40)) {
            fn check_floor(node: &LayoutNode) {
                if let LayoutNode::Group(group) = node {
                    // Beyond floor capacity the sizes degrade to an even split.
                    let floor = MIN_SIZE_PCT.min(SIZE_TOTAL / group.children.len() as f64);
                    for &size in &group.sizes {
                        assert!(size >= floor - SIZE_EPSILON, "size {size} under floor {floor}");
                    }
                    for child in &group.children {
                        check_floor(child);
                    }
                }
            }
            let mut ids = NodeIdGen::new();
            let mut tree = default_tree(&mut ids);
            for (step, op) in ops.iter().enumerate() {
                if let Some(next) = apply(&tree, op, step, &mut ids) {
                    tree = next;
                }
                check_floor(&tree);
            }
        }
    }
}
