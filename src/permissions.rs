//! Named permissions and the authorization policy built on them.
//!
//! Each [`User`] carries a [`PermissionStore`] of granted or denied
//! [`Permission`]s. The [`PermissionPolicy`] hook turns those grants into
//! search scopes:
//!
//! - superusers see every record type
//! - holders of the global search permission (default `site_search`) see
//!   every record type
//! - holders of `search.<record type>` (lowercase) see that record type
//! - a denied `search.<record type>` hides the type from everyone but
//!   superusers
//! - everyone else sees nothing
//!
//! Clones of a [`User`] share one [`SharedPermissionStore`], so a grant made
//! through one clone is seen by searches running on behalf of another.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use site_search_core::{AuthorizationHook, BoxScope, Caller, RecordType};

/// Permission that unlocks every record type under [`PermissionPolicy::default`].
pub const DEFAULT_GLOBAL_PERMISSION: &str = "site_search";

/// Name of a grantable permission, e.g. `site_search` or `search.person`.
///
/// Names are lowercase and contain no whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission(String);

impl Permission {
    /// The per-type permission for `record_type`, e.g. `search.person`.
    pub fn for_record_type(record_type: &str) -> Self {
        let name: String = record_type
            .trim()
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect();
        Self(format!("search.{}", name.to_lowercase()))
    }

    /// The permission name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Permission {
    type Err = PermissionParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(PermissionParseError(s.to_owned()));
        }
        Ok(Self(name.to_lowercase()))
    }
}

impl TryFrom<String> for Permission {
    type Error = PermissionParseError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for String {
    fn from(permission: Permission) -> Self {
        permission.0
    }
}

/// Error returned when parsing an invalid permission name.
#[derive(Debug, Clone)]
pub struct PermissionParseError(pub String);

impl fmt::Display for PermissionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid permission name: {:?}", self.0)
    }
}

impl std::error::Error for PermissionParseError {}

/// A user's permissions behind a lock, shared by every clone of the user.
pub type SharedPermissionStore = Arc<Mutex<PermissionStore>>;

/// Granted and denied permissions of one user.
///
/// Granting a permission lifts an earlier denial of it and vice versa. A
/// denied `search.<type>` hides that type even from holders of the global
/// permission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionStore {
    #[serde(default)]
    granted: BTreeSet<Permission>,
    #[serde(default)]
    denied: BTreeSet<Permission>,
}

impl PermissionStore {
    /// Wrap the store for sharing between clones of a [`User`].
    #[must_use]
    pub fn into_shared(self) -> SharedPermissionStore {
        Arc::new(Mutex::new(self))
    }

    pub fn is_granted(&self, permission: &Permission) -> bool {
        self.granted.contains(permission)
    }

    pub fn is_denied(&self, permission: &Permission) -> bool {
        self.denied.contains(permission)
    }

    pub fn grant(&mut self, permission: Permission) {
        self.denied.remove(&permission);
        self.granted.insert(permission);
    }

    pub fn deny(&mut self, permission: Permission) {
        self.granted.remove(&permission);
        self.denied.insert(permission);
    }
}

/// A `[[users]]` entry: a named user with preset permissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDef {
    pub name: String,
    #[serde(default)]
    pub superuser: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grants: Vec<Permission>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub denies: Vec<Permission>,
}

impl UserDef {
    /// Build a fresh [`User`] carrying this entry's permissions.
    pub fn to_user(&self) -> User {
        let mut store = PermissionStore::default();
        for permission in &self.grants {
            store.grant(permission.clone());
        }
        for permission in &self.denies {
            store.deny(permission.clone());
        }
        let user = if self.superuser {
            User::superuser(self.name.clone())
        } else {
            User::new(self.name.clone())
        };
        user.with_permissions(store.into_shared())
    }
}

/// The identity a search runs as.
#[derive(Debug, Clone)]
pub struct User {
    name: String,
    superuser: bool,
    permissions: SharedPermissionStore,
}

impl User {
    /// A regular user with no permissions.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superuser: false,
            permissions: PermissionStore::default().into_shared(),
        }
    }

    /// A user that sees every record type.
    pub fn superuser(name: impl Into<String>) -> Self {
        Self {
            superuser: true,
            ..Self::new(name)
        }
    }

    /// Attach a (possibly shared) permission store.
    #[must_use]
    pub fn with_permissions(mut self, permissions: SharedPermissionStore) -> Self {
        self.permissions = permissions;
        self
    }

    /// User name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Live handle to this user's permissions.
    pub fn permissions(&self) -> &SharedPermissionStore {
        &self.permissions
    }

    /// Grant a permission through the live store.
    pub fn grant(&self, permission: Permission) {
        self.permissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .grant(permission);
    }

    /// Deny a permission through the live store.
    pub fn deny(&self, permission: Permission) {
        self.permissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .deny(permission);
    }

    /// Whether `permission` is currently granted.
    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.permissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_granted(permission)
    }

    /// Whether `permission` is explicitly denied.
    pub fn is_denied(&self, permission: &Permission) -> bool {
        self.permissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_denied(permission)
    }
}

impl Caller for User {
    fn is_superuser(&self) -> bool {
        self.superuser
    }
}

/// Authorization hook mapping user permissions to search scopes.
#[derive(Debug, Clone)]
pub struct PermissionPolicy {
    global: Permission,
}

impl Default for PermissionPolicy {
    fn default() -> Self {
        Self {
            global: Permission(DEFAULT_GLOBAL_PERMISSION.to_owned()),
        }
    }
}

impl PermissionPolicy {
    /// Policy where `global` unlocks every record type.
    pub fn new(global: Permission) -> Self {
        Self { global }
    }

    /// The permission that unlocks every record type.
    pub fn global_permission(&self) -> &Permission {
        &self.global
    }

    /// Whether `user` may search `record_type` at all.
    ///
    /// Superusers always may. Otherwise a denied per-type permission wins
    /// over both the global and the per-type grant.
    pub fn allows(&self, user: &User, record_type: &str) -> bool {
        if user.is_superuser() {
            return true;
        }
        let per_type = Permission::for_record_type(record_type);
        !user.is_denied(&per_type)
            && (user.has_permission(&self.global) || user.has_permission(&per_type))
    }
}

#[async_trait]
impl AuthorizationHook<User> for PermissionPolicy {
    async fn authorized_scope(
        &self,
        caller: &User,
        record_type: &dyn RecordType,
    ) -> site_search_core::Result<BoxScope> {
        if self.allows(caller, record_type.name()) {
            Ok(record_type.all())
        } else {
            tracing::debug!(
                user = caller.name(),
                record_type = record_type.name(),
                "record type not permitted"
            );
            Ok(record_type.none())
        }
    }
}
