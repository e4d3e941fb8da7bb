// Ent Privacy - one guard for every read and write
// resolve identity -> fail fast if absent -> evaluate the record's policy

use crate::core::UserId;
use crate::error::{AppError, AppResult};
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{Item, Page, View};

/// Records that carry an owner
pub trait Owned {
    fn owner_id(&self) -> UserId;
}

impl Owned for Page {
    fn owner_id(&self) -> UserId {
        self.owner_id
    }
}

impl Owned for Item {
    fn owner_id(&self) -> UserId {
        self.owner_id
    }
}

impl Owned for View {
    fn owner_id(&self) -> UserId {
        self.owner_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivacyResult {
    Allow,
    Deny,
    /// Not this rule's decision; ask the next one
    Skip,
}

pub trait PrivacyRule<T>: Send + Sync {
    fn evaluate(&self, viewer: UserId, record: &T) -> PrivacyResult;

    fn name(&self) -> &str;

    /// Higher runs first
    fn priority(&self) -> i32;
}

/// Ordered rules for one record type. Nothing allowed means denied.
pub struct PrivacyPolicy<T> {
    rules: Vec<Box<dyn PrivacyRule<T>>>,
}

impl<T> Default for PrivacyPolicy<T> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<T> PrivacyPolicy<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: impl PrivacyRule<T> + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self.rules.sort_by(|a, b| b.priority().cmp(&a.priority()));
        self
    }

    pub fn evaluate(&self, viewer: UserId, record: &T) -> PrivacyResult {
        for rule in &self.rules {
            match rule.evaluate(viewer, record) {
                PrivacyResult::Skip => continue,
                decided => {
                    tracing::trace!("privacy rule {} decided {:?}", rule.name(), decided);
                    return decided;
                }
            }
        }
        PrivacyResult::Deny
    }

    pub fn allows(&self, viewer: UserId, record: &T) -> bool {
        self.evaluate(viewer, record) == PrivacyResult::Allow
    }

    /// Hand back the record if the viewer may touch it. Missing and forbidden
    /// records fail the same way.
    pub fn enforce(&self, viewer: UserId, record: Option<T>, what: &str) -> AppResult<T> {
        match record {
            Some(record) if self.allows(viewer, &record) => Ok(record),
            _ => Err(AppError::NotFoundOrForbidden(format!("{} not found or access denied", what))),
        }
    }

    /// Keep only records the viewer may read
    pub fn filter_visible(&self, viewer: UserId, records: Vec<T>) -> Vec<T> {
        records.into_iter().filter(|r| self.allows(viewer, r)).collect()
    }
}

/// Only the owner may see or change a record
pub struct OwnerOnlyRule;

impl<T: Owned> PrivacyRule<T> for OwnerOnlyRule {
    fn evaluate(&self, viewer: UserId, record: &T) -> PrivacyResult {
        if record.owner_id() == viewer {
            PrivacyResult::Allow
        } else {
            PrivacyResult::Deny
        }
    }

    fn name(&self) -> &str {
        "owner_only"
    }

    fn priority(&self) -> i32 {
        100
    }
}

/// Schema, item and view operations only apply to database pages
pub struct DatabasePageRule;

impl PrivacyRule<Page> for DatabasePageRule {
    fn evaluate(&self, _viewer: UserId, page: &Page) -> PrivacyResult {
        if page.is_database() {
            PrivacyResult::Skip
        } else {
            PrivacyResult::Deny
        }
    }

    fn name(&self) -> &str {
        "database_page"
    }

    fn priority(&self) -> i32 {
        200
    }
}

pub fn page_policy() -> PrivacyPolicy<Page> {
    PrivacyPolicy::new().with_rule(OwnerOnlyRule)
}

pub fn database_page_policy() -> PrivacyPolicy<Page> {
    PrivacyPolicy::new()
        .with_rule(OwnerOnlyRule)
        .with_rule(DatabasePageRule)
}

pub fn item_policy() -> PrivacyPolicy<Item> {
    PrivacyPolicy::new().with_rule(OwnerOnlyRule)
}

pub fn view_policy() -> PrivacyPolicy<View> {
    PrivacyPolicy::new().with_rule(OwnerOnlyRule)
}

/// Reads degrade to "no viewer" instead of failing
pub fn reader(vc: &ViewerContext) -> Option<UserId> {
    vc.user_id
}

/// Writes require an identity
pub fn writer(vc: &ViewerContext) -> AppResult<UserId> {
    vc.require_user()
}
