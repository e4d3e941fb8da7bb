// Rendering - read-side shapes the client draws directly

pub mod editor;
pub mod field_render;
pub mod page_tree;

pub use editor::{open_editor, EditorView, GridCell, GridRow};
pub use field_render::{
    badge_background, display_field, field_input, parse_input, Badge, DisplayPart, FieldDisplay,
    FieldInput, InputKind, RawInput, PLACEHOLDER,
};
pub use page_tree::{build_page_tree, PageTreeNode};
