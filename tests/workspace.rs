mod common;

use common::{anonymous, app_state, app_state_with, fields, viewer};
use pagebase::{
    core::PageId,
    error::AppError,
    infrastructure::{ChangeKind, DatabaseInterface, EntityKind},
    models::{ColumnDefinition, ColumnType, FieldValue, PageType, PageUpdate, ViewType},
    rendering::{build_page_tree, open_editor, EditorView, RawInput},
    schemas::{default_database_schema, FieldValidation},
    services::DeletePolicy,
};

#[tokio::test]
async fn test_root_page_is_visible_only_to_owner() {
    let state = app_state().await;
    let (a, b) = (viewer(1), viewer(2));

    let tasks = state.pages.create(&a, "Tasks", None).await.unwrap();

    let a_roots = state.pages.get_children(&a, None).await.unwrap();
    assert_eq!(a_roots.len(), 1);
    assert_eq!(a_roots[0].id, tasks);
    assert_eq!(a_roots[0].title, "Tasks");
    assert!(state.pages.get_children(&b, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_children_match_parent_exactly() {
    let state = app_state().await;
    let a = viewer(1);
    let parent = state.pages.create(&a, "Parent", None).await.unwrap();
    let child = state.pages.create(&a, "Child", Some(parent)).await.unwrap();
    let other = state.pages.create(&a, "Other", None).await.unwrap();

    let children = state.pages.get_children(&a, Some(parent)).await.unwrap();
    assert_eq!(children.iter().map(|p| p.id).collect::<Vec<_>>(), vec![child]);

    let mut roots: Vec<PageId> = state
        .pages
        .get_children(&a, None)
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    roots.sort();
    let mut expected = vec![parent, other];
    expected.sort();
    assert_eq!(roots, expected);
}

#[tokio::test]
async fn test_create_database_has_single_table_view() {
    let state = app_state().await;
    let a = viewer(1);

    let board = state
        .databases
        .create_database(&a, "Board", None, vec![ColumnDefinition::new("Name", ColumnType::Text)])
        .await
        .unwrap();

    let page = state.pages.get(&a, board).await.unwrap().unwrap();
    assert_eq!(page.page_type, PageType::Database);
    assert_eq!(page.columns().len(), 1);

    let views = state.databases.get_views(&a, board).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].name, "Table View");
    assert_eq!(views[0].view_type, ViewType::Table);
    assert!(views[0].config.is_empty());
}

#[tokio::test]
async fn test_add_column_on_document_is_rejected() {
    let state = app_state().await;
    let a = viewer(1);
    let doc = state.pages.create(&a, "Notes", None).await.unwrap();

    let result = state
        .databases
        .add_column(&a, doc, ColumnDefinition::new("Priority", ColumnType::Text))
        .await;
    assert!(matches!(result, Err(AppError::NotFoundOrForbidden(_))));
}

#[tokio::test]
async fn test_add_column_preserves_order() {
    let state = app_state().await;
    let a = viewer(1);
    let board = state
        .databases
        .create_database(&a, "Board", None, default_database_schema())
        .await
        .unwrap();

    state
        .databases
        .add_column(&a, board, ColumnDefinition::new("Status", ColumnType::Text))
        .await
        .unwrap();

    let page = state.pages.get(&a, board).await.unwrap().unwrap();
    let columns: Vec<_> = page
        .columns()
        .iter()
        .map(|c| (c.name.as_str(), c.column_type))
        .collect();
    assert_eq!(
        columns,
        vec![
            ("Name", ColumnType::Text),
            ("Status", ColumnType::Select),
            ("Due Date", ColumnType::Date),
            ("Status", ColumnType::Text),
        ]
    );
}

#[tokio::test]
async fn test_update_item_replaces_fields() {
    let state = app_state().await;
    let a = viewer(1);
    let list = state.databases.create_database(&a, "Groceries", None, vec![]).await.unwrap();

    let item = state
        .databases
        .create_item(&a, list, fields(&[("Name", "Buy milk".into())]))
        .await
        .unwrap();
    state
        .databases
        .update_item(&a, item, fields(&[("Name", "Buy milk".into()), ("Priority", "Low".into())]))
        .await
        .unwrap();

    let items = state.databases.get_items(&a, list).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0].fields,
        fields(&[("Name", "Buy milk".into()), ("Priority", "Low".into())])
    );
}

#[tokio::test]
async fn test_reads_never_cross_owners() {
    let state = app_state().await;
    let (a, b) = (viewer(1), viewer(2));
    let board = state.databases.create_database(&a, "Board", None, vec![]).await.unwrap();
    state.databases.create_item(&a, board, fields(&[])).await.unwrap();
    state.pages.create(&b, "Mine", None).await.unwrap();

    assert!(state.pages.list(&b).await.unwrap().iter().all(|p| p.owner_id.value() == 2));
    assert!(state.databases.get_items(&b, board).await.unwrap().is_empty());
    assert!(state.databases.get_views(&b, board).await.unwrap().is_empty());
    assert!(open_editor(&state.pages, &state.databases, &b, board).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unauthenticated_reads_empty_writes_fail() {
    let state = app_state().await;
    let a = viewer(1);
    let anon = anonymous();
    let board = state.databases.create_database(&a, "Board", None, vec![]).await.unwrap();
    let item = state.databases.create_item(&a, board, fields(&[])).await.unwrap();

    assert!(state.pages.list(&anon).await.unwrap().is_empty());
    assert!(state.databases.get_items(&anon, board).await.unwrap().is_empty());
    assert!(state.databases.get_views(&anon, board).await.unwrap().is_empty());

    let unauthenticated = |r: Result<(), AppError>| matches!(r, Err(AppError::Unauthenticated(_)));
    assert!(unauthenticated(state.pages.create(&anon, "x", None).await.map(|_| ())));
    assert!(unauthenticated(state.pages.update(&anon, board, PageUpdate::default()).await));
    assert!(unauthenticated(state.pages.remove(&anon, board).await));
    assert!(unauthenticated(state.databases.create_database(&anon, "x", None, vec![]).await.map(|_| ())));
    assert!(unauthenticated(
        state
            .databases
            .add_column(&anon, board, ColumnDefinition::new("x", ColumnType::Text))
            .await
    ));
    assert!(unauthenticated(state.databases.create_item(&anon, board, fields(&[])).await.map(|_| ())));
    assert!(unauthenticated(state.databases.update_item(&anon, item, fields(&[])).await));
    assert!(unauthenticated(state.databases.delete_item(&anon, item).await));
    assert!(unauthenticated(
        state
            .databases
            .set_cell(&anon, item, "Name", RawInput::Text("x".into()))
            .await
            .map(|_| ())
    ));
}

#[tokio::test]
async fn test_cascade_policy_removes_rows_and_views() {
    let state = app_state_with(DeletePolicy::Cascade, FieldValidation::Permissive).await;
    let a = viewer(1);
    let home = state.pages.create(&a, "Home", None).await.unwrap();
    let board = state.databases.create_database(&a, "Board", Some(home), vec![]).await.unwrap();
    state.databases.create_item(&a, board, fields(&[])).await.unwrap();

    state.pages.remove(&a, home).await.unwrap();

    assert!(state.pages.list(&a).await.unwrap().is_empty());
    assert!(state.db.list_items(board, a.user_id.unwrap()).await.unwrap().is_empty());
    assert!(state.db.list_views(board, a.user_id.unwrap()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_orphan_policy_keeps_rows() {
    let state = app_state().await;
    let a = viewer(1);
    let board = state.databases.create_database(&a, "Board", None, vec![]).await.unwrap();
    let item = state.databases.create_item(&a, board, fields(&[("Name", "x".into())])).await.unwrap();

    state.pages.remove(&a, board).await.unwrap();

    // The row outlives its page and can still be edited by its owner
    assert!(state.db.get_item(item).await.unwrap().is_some());
    state
        .databases
        .update_item(&a, item, fields(&[("Name", FieldValue::Null)]))
        .await
        .unwrap();
    assert!(state.databases.get_items(&a, board).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_page_tree_and_editor() {
    let state = app_state().await;
    let a = viewer(1);
    let home = state.pages.create(&a, "", None).await.unwrap();
    let board = state
        .databases
        .create_database(&a, "Board", Some(home), default_database_schema())
        .await
        .unwrap();
    state
        .databases
        .create_item(
            &a,
            board,
            fields(&[("Name", "Ship it".into()), ("Status", "Done".into()), ("Due Date", "2024-12-01".into())]),
        )
        .await
        .unwrap();

    let tree = build_page_tree(&state.pages.list(&a).await.unwrap());
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].title, "Untitled");
    assert_eq!(tree[0].children[0].icon, "📊");

    let Some(EditorView::Database { columns, rows, views, .. }) =
        open_editor(&state.pages, &state.databases, &a, board).await.unwrap()
    else {
        panic!("database page should open as a grid");
    };
    assert_eq!(columns.len(), 3);
    assert_eq!(views.len(), 1);
    let cells = &rows[0].cells;
    assert_eq!(cells[0].display.plain_text(), "Ship it");
    assert_eq!(cells[1].display.badges().next().unwrap().background, "#00ff0020");
    assert_eq!(cells[2].display.plain_text(), "12/1/2024");
}

#[tokio::test]
async fn test_strict_validation_rejects_bad_values() {
    let state = app_state_with(DeletePolicy::Orphan, FieldValidation::Strict).await;
    let a = viewer(1);
    let board = state
        .databases
        .create_database(&a, "Board", None, default_database_schema())
        .await
        .unwrap();

    let bad = state
        .databases
        .create_item(&a, board, fields(&[("Status", "Shipped".into())]))
        .await;
    assert!(matches!(bad, Err(AppError::Validation(_))));

    let bad_date = state
        .databases
        .create_item(&a, board, fields(&[("Due Date", "tomorrow".into())]))
        .await;
    assert!(matches!(bad_date, Err(AppError::Validation(_))));

    state
        .databases
        .create_item(&a, board, fields(&[("Status", "Done".into()), ("Extra", 1.0.into())]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reject_policy_allows_fresh_database() {
    let state = app_state_with(DeletePolicy::Reject, FieldValidation::Permissive).await;
    let a = viewer(1);
    let board = state.databases.create_database(&a, "Board", None, vec![]).await.unwrap();

    // The default view does not count as content
    state.pages.remove(&a, board).await.unwrap();
    assert!(state.pages.get(&a, board).await.unwrap().is_none());
    assert!(state.db.list_views(board, a.user_id.unwrap()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reject_policy_counts_only_own_rows() {
    let state = app_state_with(DeletePolicy::Reject, FieldValidation::Permissive).await;
    let (a, b) = (viewer(1), viewer(2));
    let board = state.databases.create_database(&a, "Board", None, vec![]).await.unwrap();
    let item = state.databases.create_item(&a, board, fields(&[])).await.unwrap();
    state.pages.create(&b, "Parked", Some(board)).await.unwrap();

    let Err(AppError::Conflict(message)) = state.pages.remove(&a, board).await else {
        panic!("a database with items must not be removed");
    };
    assert!(message.contains("0 child pages, 1 items"));

    state.databases.delete_item(&a, item).await.unwrap();
    state.pages.remove(&a, board).await.unwrap();
}

#[tokio::test]
async fn test_cascade_publishes_every_removed_row() {
    let state = app_state_with(DeletePolicy::Cascade, FieldValidation::Permissive).await;
    let a = viewer(1);
    let home = state.pages.create(&a, "Home", None).await.unwrap();
    let board = state.databases.create_database(&a, "Board", Some(home), vec![]).await.unwrap();
    let item = state.databases.create_item(&a, board, fields(&[])).await.unwrap();
    let mut feed = state.changes.subscribe(a.user_id.unwrap());

    state.pages.remove(&a, home).await.unwrap();

    let mut deleted = Vec::new();
    for _ in 0..4 {
        let event = feed.next().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Deleted);
        deleted.push((event.entity, event.id));
    }
    assert!(deleted.contains(&(EntityKind::Page, home.to_string())));
    assert!(deleted.contains(&(EntityKind::Page, board.to_string())));
    assert!(deleted.contains(&(EntityKind::Item, item.to_string())));
    assert_eq!(deleted.iter().filter(|(entity, _)| *entity == EntityKind::View).count(), 1);
}
