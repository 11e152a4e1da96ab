//! Collaborator contract for searchable record types.
//!
//! The search engine never talks to storage directly. A record type exposes
//! an "all records" [`Scope`] and an explicitly empty one; scopes narrow by
//! field filter and limit, and are iterated as an asynchronous stream of
//! [`Record`]s. Everything is object-safe so that indices over unrelated
//! record types can live in one registry.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use futures::stream::BoxStream;
use serde_json::Value;

/// Boxed error raised by a storage collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shared handle to a fetched record.
pub type RecordRef = Arc<dyn Record>;

/// Owned, type-erased scope.
pub type BoxScope = Box<dyn Scope>;

/// Shared handle to a registered record type.
pub type RecordTypeRef = Arc<dyn RecordType>;

/// Lazy, finite, single-pass stream of records produced by [`Scope::fetch`].
pub type RecordStream = BoxStream<'static, std::result::Result<RecordRef, BoxError>>;

/// Upcast to [`Any`] for downcasting trait objects to their concrete type.
pub trait AsAny {
    /// Returns `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A single stored entity that can be shown in search results.
pub trait Record: AsAny + fmt::Debug + Send + Sync {
    /// Stable identity of the record within its record type.
    ///
    /// Two records with the same id are the same record; search results
    /// never list one twice.
    fn record_id(&self) -> String;

    /// Human-readable text form of the record.
    fn to_display_text(&self) -> String;

    /// Canonical link to the record, if it has one.
    fn try_get_link(&self) -> Option<String> {
        None
    }
}

impl<'a> dyn Record + 'a {
    /// Downcast to the concrete record type.
    pub fn downcast_ref<T: Record + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// A filtered view over a record type's collection.
///
/// Scopes are immutable: every narrowing operation returns a new scope.
pub trait Scope: AsAny + fmt::Debug + Send + Sync {
    /// Narrow to records whose `field` selector matches `value`.
    fn filter(&self, field: &str, value: &Value) -> BoxScope;

    /// Narrow to at most `n` records.
    fn limit(&self, n: usize) -> BoxScope;

    /// Returns `true` only when the scope can be shown to contain no records
    /// without querying storage.
    fn is_empty(&self) -> bool;

    /// Start iterating the scope.
    fn fetch(&self) -> RecordStream;

    /// Duplicate this scope.
    fn clone_scope(&self) -> BoxScope;
}

impl<'a> dyn Scope + 'a {
    /// Downcast to the concrete scope type.
    pub fn downcast_ref<T: Scope + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl Clone for BoxScope {
    fn clone(&self) -> Self {
        self.clone_scope()
    }
}

/// A registered kind of entity.
pub trait RecordType: fmt::Debug + Send + Sync + 'static {
    /// Type name; record types are visited in ascending order of this name.
    fn name(&self) -> &str;

    /// Human-readable plural label, e.g. `"people"`.
    fn plural_label(&self) -> &str;

    /// Unrestricted scope over every record of this type.
    fn all(&self) -> BoxScope;

    /// Explicitly empty scope ([`Scope::is_empty`] returns `true`).
    fn none(&self) -> BoxScope;
}
