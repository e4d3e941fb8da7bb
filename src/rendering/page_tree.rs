// Page tree - nests the caller's flat page list under their parents for the sidebar

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::core::PageId;
use crate::models::{Page, PageType};

pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageTreeNode {
    pub id: PageId,
    pub title: String,
    pub icon: &'static str,
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub children: Vec<PageTreeNode>,
}

pub fn page_icon(page_type: PageType) -> &'static str {
    match page_type {
        PageType::Database => "📊",
        PageType::Document => "📄",
    }
}

pub fn display_title(title: &str) -> &str {
    if title.trim().is_empty() {
        UNTITLED
    } else {
        title
    }
}

/// Roots are pages without a parent. Pages whose parent is gone are not shown,
/// and a page is never placed twice, so parent cycles terminate.
pub fn build_page_tree(pages: &[Page]) -> Vec<PageTreeNode> {
    let mut by_parent: HashMap<Option<PageId>, Vec<&Page>> = HashMap::new();
    for page in pages {
        by_parent.entry(page.parent_id).or_default().push(page);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by_key(|p| (p.created_at, p.id));
    }

    let mut placed = HashSet::new();
    build_level(None, &by_parent, &mut placed)
}

fn build_level(
    parent: Option<PageId>,
    by_parent: &HashMap<Option<PageId>, Vec<&Page>>,
    placed: &mut HashSet<PageId>,
) -> Vec<PageTreeNode> {
    let Some(siblings) = by_parent.get(&parent) else {
        return Vec::new();
    };

    let mut nodes = Vec::with_capacity(siblings.len());
    for page in siblings {
        if !placed.insert(page.id) {
            continue;
        }
        nodes.push(PageTreeNode {
            id: page.id,
            title: display_title(&page.title).to_string(),
            icon: page_icon(page.page_type),
            page_type: page.page_type,
            children: build_level(Some(page.id), by_parent, placed),
        });
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::UserId;

    fn page(id: i64, parent: Option<i64>, title: &str, page_type: PageType) -> Page {
        Page {
            id: PageId(id),
            title: title.to_string(),
            content: String::new(),
            parent_id: parent.map(PageId),
            owner_id: UserId(1),
            page_type,
            schema: None,
            created_at: id,
            updated_at: id,
        }
    }

    #[test]
    fn nests_children_under_parents() {
        let pages = vec![
            page(1, None, "Home", PageType::Document),
            page(2, Some(1), "", PageType::Database),
            page(3, Some(2), "Row notes", PageType::Document),
            page(4, None, "Inbox", PageType::Document),
        ];

        let tree = build_page_tree(&pages);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].title, "Home");
        assert_eq!(tree[0].icon, "📄");
        assert_eq!(tree[0].children[0].title, "Untitled");
        assert_eq!(tree[0].children[0].icon, "📊");
        assert_eq!(tree[0].children[0].children[0].id, PageId(3));
        assert_eq!(tree[1].id, PageId(4));
    }

    #[test]
    fn orphans_and_cycles_are_left_out() {
        let pages = vec![
            page(1, None, "Root", PageType::Document),
            page(2, Some(99), "Orphan", PageType::Document),
            page(3, Some(4), "A", PageType::Document),
            page(4, Some(3), "B", PageType::Document),
        ];

        let tree = build_page_tree(&pages);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn self_parent_does_not_loop() {
        let pages = vec![page(1, None, "Root", PageType::Document), page(2, Some(2), "Loop", PageType::Document)];
        assert_eq!(build_page_tree(&pages).len(), 1);
    }
}
