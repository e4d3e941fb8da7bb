use std::sync::Arc;

use crate::{
    config::Config,
    error::AppResult,
    infrastructure::{
        cache::SessionCache,
        change_feed::ChangeFeed,
        database::DatabaseInterface,
        id_generator::IdGenerator,
        middleware::HasAuthService,
        sqlite_database::SqliteDatabase,
    },
    services::{AuthService, DatabaseService, PageService},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn DatabaseInterface>,
    pub auth: AuthService,
    pub pages: PageService,
    pub databases: DatabaseService,
    pub changes: Arc<ChangeFeed>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let database = SqliteDatabase::connect(&config.database.url).await?;
        Self::from_database(config, Arc::new(database))
    }

    /// Wire services over an already-open store
    pub fn from_database(config: Config, db: Arc<dyn DatabaseInterface>) -> AppResult<Self> {
        let ids = Arc::new(IdGenerator::new(config.workspace.node_id)?);
        let changes = Arc::new(ChangeFeed::new(config.workspace.change_feed_capacity));
        let sessions = Arc::new(SessionCache::new(config.cache.session_capacity));

        let auth = AuthService::new(db.clone(), ids.clone(), sessions);
        let pages = PageService::new(
            db.clone(),
            ids.clone(),
            changes.clone(),
            config.workspace.delete_policy,
        );
        let databases = DatabaseService::new(
            db.clone(),
            ids,
            changes.clone(),
            config.workspace.field_validation,
        );

        Ok(Self {
            config,
            db,
            auth,
            pages,
            databases,
            changes,
        })
    }
}

impl HasAuthService for AppState {
    fn auth_service(&self) -> &AuthService {
        &self.auth
    }
}
