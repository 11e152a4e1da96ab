//! Site search: search a JSON dataset across many record types at once.
//!
//! This crate hosts the `site-search-core` engine over an in-memory store:
//!
//! - **Store**: JSON tables whose scopes understand `field__lookup` selectors
//! - **Catalog**: `[[indices]]` definitions registered against those tables
//! - **Permissions**: per-user named permissions driving the authorization hook
//! - **Site**: the assembled dataset, registry and policy, ready to search
//!
//! The `site-search` binary wraps all of this in a small CLI that prints one
//! JSON object per matched record type.

pub mod catalog;
pub mod config;
pub mod error;
pub mod permissions;
pub mod site;
pub mod store;

pub use config::SiteSearchConfig;
pub use error::{Result, SiteSearchError};
pub use permissions::{Permission, PermissionPolicy, PermissionStore, User, UserDef};
pub use site::Site;
