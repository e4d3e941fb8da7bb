mod common;

use pagebase::{app_state::AppState, config::Config, models::FieldValue};

fn file_config(dir: &tempfile::TempDir) -> Config {
    let mut config = Config::in_memory();
    config.database.url = format!("sqlite:{}", dir.path().join("nested/workspace.db").display());
    config
}

#[tokio::test]
async fn test_workspace_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let ada = common::viewer(1);

    let (board, token) = {
        let state = AppState::new(file_config(&dir)).await.unwrap();
        let board = state
            .databases
            .create_database(&ada, "Board", None, pagebase::schemas::default_database_schema())
            .await
            .unwrap();
        state
            .databases
            .create_item(&ada, board, common::fields(&[("Name", "Persisted".into())]))
            .await
            .unwrap();
        let session = state.auth.sign_up("ada", "password123").await.unwrap();
        (board, session.token)
    };

    let state = AppState::new(file_config(&dir)).await.unwrap();
    let page = state.pages.get(&ada, board).await.unwrap().unwrap();
    assert_eq!(page.title, "Board");
    assert_eq!(page.columns().len(), 3);

    let items = state.databases.get_items(&ada, board).await.unwrap();
    assert_eq!(items[0].fields.get("Name"), Some(&FieldValue::from("Persisted")));
    assert_eq!(state.databases.get_views(&ada, board).await.unwrap().len(), 1);

    // Fresh process, empty cache: the token resolves from the sessions table
    assert!(state.auth.resolve_session(&token).await.unwrap().is_some());
}
