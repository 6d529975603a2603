#![forbid(unsafe_code)]

//! Pane layout engine for the Dockwork workspace shell.
//!
//! A workspace window docks several independent surfaces (chat, file
//! tree, editor, terminal, preview) inside a resizable, splittable,
//! tabbed panel grid. This crate is the grid's core: the persistent
//! layout tree, the pure operations that split, merge, remove, swap and
//! resize panes, the visibility-aware reduction handed to the renderer,
//! the drag-and-drop target resolver, and the versioned snapshot codec.
//!
//! The engine manipulates opaque panel identifiers only; rendering,
//! editor/terminal internals, and storage transports live elsewhere and
//! talk to this crate through [`LayoutStore`] and the [`LayoutStorage`]
//! trait. Everything below the store is a pure function over immutable
//! trees, so the whole surface is trivially testable and safe to call
//! from any single-threaded event loop.

pub mod drop;
pub mod ops;
pub mod snapshot;
pub mod store;
pub mod tree;
pub mod visibility;

pub use drop::{DropZone, ParseDropZoneError, resolve_drop};
pub use ops::{
    all_panel_ids, find_group, find_panel, insert_as_split, insert_as_tab, insert_at_edge,
    remove_panel, resize_group, swap_panels,
};
pub use snapshot::{LayoutSnapshot, SNAPSHOT_SCHEMA_VERSION, SnapshotError, restore};
pub use store::{LayoutStorage, LayoutStore, MemoryStorage};
pub use tree::{
    Edge, GroupNode, LayoutNode, NodeId, NodeIdGen, Orientation, PanelId, PanelNode, StaticPanel,
    TreeError, default_tree,
};
pub use visibility::{VisibilityMap, reduce_visible};
