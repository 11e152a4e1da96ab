//! Per-caller authorization of record types.
//!
//! Before a record type is searched, the [`AuthorizationHook`] decides which
//! of its records the caller may see. Returning an empty scope (see
//! [`RecordType::none`]) skips the record type entirely.

use async_trait::async_trait;

use crate::error::Result;
use crate::record::{BoxScope, RecordType};

/// The identity performing a search.
pub trait Caller: Send + Sync {
    /// Whether the caller holds the elevated capability that unlocks every
    /// record type under the default policy.
    fn is_superuser(&self) -> bool;
}

/// Decides which records of a record type a caller may search.
///
/// Called at most once per record type per search. Errors abort the search.
#[async_trait]
pub trait AuthorizationHook<C: ?Sized + Sync>: Send + Sync {
    /// Scope of `record_type` visible to `caller`.
    async fn authorized_scope(
        &self,
        caller: &C,
        record_type: &dyn RecordType,
    ) -> Result<BoxScope>;
}

/// Default policy: superusers see everything, everyone else nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuperuserOnly;

#[async_trait]
impl<C: Caller + ?Sized> AuthorizationHook<C> for SuperuserOnly {
    async fn authorized_scope(
        &self,
        caller: &C,
        record_type: &dyn RecordType,
    ) -> Result<BoxScope> {
        if caller.is_superuser() {
            Ok(record_type.all())
        } else {
            Ok(record_type.none())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTable;

    struct Visitor {
        superuser: bool,
    }

    impl Caller for Visitor {
        fn is_superuser(&self) -> bool {
            self.superuser
        }
    }

    #[tokio::test]
    async fn superuser_gets_unrestricted_scope() {
        let table = FakeTable::new("Person", "people", vec![]);
        let scope = SuperuserOnly
            .authorized_scope(&Visitor { superuser: true }, &table)
            .await
            .expect("authorize");
        assert!(!scope.is_empty());
    }

    #[tokio::test]
    async fn regular_caller_gets_empty_scope() {
        let table = FakeTable::new("Person", "people", vec![]);
        let scope = SuperuserOnly
            .authorized_scope(&Visitor { superuser: false }, &table)
            .await
            .expect("authorize");
        assert!(scope.is_empty());
    }

    #[test]
    fn hook_is_object_safe() {
        fn assert_object_safe(_: &dyn AuthorizationHook<dyn Caller>) {}
        assert_object_safe(&SuperuserOnly);
    }
}
