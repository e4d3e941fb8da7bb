// Ent Framework - per-record access control shared by every service

pub mod ent_privacy;

pub use ent_privacy::{
    database_page_policy, item_policy, page_policy, view_policy, Owned, PrivacyPolicy,
    PrivacyResult, PrivacyRule,
};
