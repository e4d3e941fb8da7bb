#![allow(dead_code)]

use std::sync::Arc;

use pagebase::{
    app_state::AppState,
    config::Config,
    core::UserId,
    infrastructure::{SqliteDatabase, ViewerContext},
    models::{FieldMap, FieldValue},
    schemas::FieldValidation,
    services::DeletePolicy,
};

pub async fn app_state() -> AppState {
    app_state_with(DeletePolicy::Orphan, FieldValidation::Permissive).await
}

pub async fn app_state_with(policy: DeletePolicy, validation: FieldValidation) -> AppState {
    let mut config = Config::in_memory();
    config.workspace.delete_policy = policy;
    config.workspace.field_validation = validation;
    let db = SqliteDatabase::new_in_memory().await.unwrap();
    AppState::from_database(config, Arc::new(db)).unwrap()
}

pub fn viewer(id: i64) -> ViewerContext {
    ViewerContext::for_user(UserId(id))
}

pub fn anonymous() -> ViewerContext {
    ViewerContext::unauthenticated("test".to_string())
}

pub fn fields(pairs: &[(&str, FieldValue)]) -> FieldMap {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}
