// Workspace Interface - HTTP surface over the page, database and auth services
// Every route runs behind the viewer context middleware; handlers never see raw tokens.

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    middleware,
    response::{
        sse::{Event, KeepAlive, KeepAliveStream, Sse},
        Json,
    },
    routing::{get, patch, post, put},
    Router,
};
use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;

use crate::{
    app_state::AppState,
    core::{ItemId, PageId},
    error::AppError,
    infrastructure::middleware::{viewer_context_middleware, Vc},
    models::{AuthSession, ColumnDefinition, FieldMap, FieldValue, Identity, Item, Page, PageUpdate, View},
    rendering::{build_page_tree, open_editor, EditorView, PageTreeNode, RawInput},
    schemas::default_database_schema,
};

// Request types

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePageRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub parent_id: Option<PageId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatabaseRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub parent_id: Option<PageId>,
    /// Falls back to the "New Database" schema when omitted
    #[serde(default)]
    pub schema: Option<Vec<ColumnDefinition>>,
}

#[derive(Debug, Deserialize)]
pub struct FieldsRequest {
    #[serde(default)]
    pub fields: FieldMap,
}

/// One cell edit as an editor control sends it
#[derive(Debug, Deserialize)]
pub struct CellRequest {
    pub column: String,
    pub value: RawInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildrenQuery {
    #[serde(default)]
    pub parent_id: Option<PageId>,
}

// Auth handlers

pub async fn sign_up_handler(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<AuthSession>), AppError> {
    let session = state.auth.sign_up(&req.username, &req.password).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn sign_in_handler(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<AuthSession>, AppError> {
    Ok(Json(state.auth.sign_in(&req.username, &req.password).await?))
}

pub async fn anonymous_handler(State(state): State<AppState>) -> Result<(StatusCode, Json<AuthSession>), AppError> {
    let session = state.auth.sign_in_anonymous().await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn sign_out_handler(State(state): State<AppState>, vc: Vc) -> Result<Json<Value>, AppError> {
    state.auth.sign_out(&vc).await?;
    Ok(Json(json!({"signedOut": true})))
}

pub async fn me_handler(State(state): State<AppState>, vc: Vc) -> Result<Json<Option<Identity>>, AppError> {
    Ok(Json(state.auth.me(&vc).await?))
}

// Page handlers

pub async fn list_pages_handler(State(state): State<AppState>, vc: Vc) -> Result<Json<Vec<Page>>, AppError> {
    Ok(Json(state.pages.list(&vc).await?))
}

pub async fn children_handler(
    State(state): State<AppState>,
    vc: Vc,
    Query(query): Query<ChildrenQuery>,
) -> Result<Json<Vec<Page>>, AppError> {
    Ok(Json(state.pages.get_children(&vc, query.parent_id).await?))
}

pub async fn create_page_handler(
    State(state): State<AppState>,
    vc: Vc,
    Json(req): Json<CreatePageRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let id = state.pages.create(&vc, &req.title, req.parent_id).await?;
    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

pub async fn update_page_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(id): AxumPath<i64>,
    Json(update): Json<PageUpdate>,
) -> Result<Json<Value>, AppError> {
    let id = PageId::new(id);
    state.pages.update(&vc, id, update).await?;
    Ok(Json(json!({"id": id, "updated": true})))
}

pub async fn delete_page_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<Value>, AppError> {
    let id = PageId::new(id);
    state.pages.remove(&vc, id).await?;
    Ok(Json(json!({"id": id, "deleted": true})))
}

pub async fn page_tree_handler(State(state): State<AppState>, vc: Vc) -> Result<Json<Vec<PageTreeNode>>, AppError> {
    let pages = state.pages.list(&vc).await?;
    Ok(Json(build_page_tree(&pages)))
}

pub async fn editor_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<Option<EditorView>>, AppError> {
    let editor = open_editor(&state.pages, &state.databases, &vc, PageId::new(id)).await?;
    Ok(Json(editor))
}

// Database handlers

pub async fn create_database_handler(
    State(state): State<AppState>,
    vc: Vc,
    Json(req): Json<CreateDatabaseRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let schema = req.schema.unwrap_or_else(default_database_schema);
    let id = state
        .databases
        .create_database(&vc, &req.title, req.parent_id, schema)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

pub async fn add_column_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(page_id): AxumPath<i64>,
    Json(column): Json<ColumnDefinition>,
) -> Result<Json<Value>, AppError> {
    let page_id = PageId::new(page_id);
    state.databases.add_column(&vc, page_id, column).await?;
    Ok(Json(json!({"id": page_id, "updated": true})))
}

pub async fn views_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(page_id): AxumPath<i64>,
) -> Result<Json<Vec<View>>, AppError> {
    Ok(Json(state.databases.get_views(&vc, PageId::new(page_id)).await?))
}

pub async fn items_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(page_id): AxumPath<i64>,
) -> Result<Json<Vec<Item>>, AppError> {
    Ok(Json(state.databases.get_items(&vc, PageId::new(page_id)).await?))
}

pub async fn create_item_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(page_id): AxumPath<i64>,
    Json(req): Json<FieldsRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let id = state
        .databases
        .create_item(&vc, PageId::new(page_id), req.fields)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

pub async fn update_item_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(id): AxumPath<i64>,
    Json(req): Json<FieldsRequest>,
) -> Result<Json<Value>, AppError> {
    let id = ItemId::new(id);
    state.databases.update_item(&vc, id, req.fields).await?;
    Ok(Json(json!({"id": id, "updated": true})))
}

pub async fn set_cell_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(id): AxumPath<i64>,
    Json(req): Json<CellRequest>,
) -> Result<Json<Value>, AppError> {
    let id = ItemId::new(id);
    let value: FieldValue = state.databases.set_cell(&vc, id, &req.column, req.value).await?;
    Ok(Json(json!({"id": id, "column": req.column, "value": value})))
}

pub async fn delete_item_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<Value>, AppError> {
    let id = ItemId::new(id);
    state.databases.delete_item(&vc, id).await?;
    Ok(Json(json!({"id": id, "deleted": true})))
}

// Realtime

type ChangeStream = BoxStream<'static, Result<Event, Infallible>>;

/// Server-sent change events for the caller. Anonymous callers get a stream that ends at once.
pub async fn changes_handler(State(state): State<AppState>, vc: Vc) -> Sse<KeepAliveStream<ChangeStream>> {
    let stream: ChangeStream = match vc.user_id {
        Some(user_id) => {
            let subscription = state.changes.subscribe(user_id);
            stream::unfold(subscription, |mut subscription| async move {
                let event = subscription.next().await?;
                let sse = Event::default()
                    .event("change")
                    .id(event.seq.to_string())
                    .json_data(&event)
                    .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()));
                Some((Ok(sse), subscription))
            })
            .boxed()
        }
        None => stream::empty().boxed(),
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// All workspace routes, to be nested under `/api/v1`
pub fn create_workspace_router(state: AppState) -> Router {
    Router::new()
        // Auth
        .route("/auth/signup", post(sign_up_handler))
        .route("/auth/signin", post(sign_in_handler))
        .route("/auth/anonymous", post(anonymous_handler))
        .route("/auth/signout", post(sign_out_handler))
        .route("/auth/me", get(me_handler))
        // Pages
        .route("/pages", get(list_pages_handler).post(create_page_handler))
        .route("/pages/children", get(children_handler))
        .route("/pages/tree", get(page_tree_handler))
        .route("/pages/{id}", patch(update_page_handler).delete(delete_page_handler))
        .route("/pages/{id}/editor", get(editor_handler))
        // Databases
        .route("/databases", post(create_database_handler))
        .route("/databases/{page_id}/columns", post(add_column_handler))
        .route("/databases/{page_id}/views", get(views_handler))
        .route("/databases/{page_id}/items", get(items_handler).post(create_item_handler))
        .route(
            "/items/{id}",
            put(update_item_handler)
                .patch(set_cell_handler)
                .delete(delete_item_handler),
        )
        // Realtime and liveness
        .route("/changes", get(changes_handler))
        .route("/health", get(health_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            viewer_context_middleware::<AppState>,
        ))
        .with_state(state)
}
