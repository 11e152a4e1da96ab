//! Append-only registry of index descriptors.
//!
//! A process-wide registry is available through [`Registry::global`] and
//! the free [`register`] function. Independent registries can be created
//! with [`Registry::new`] for isolated search surfaces and tests.
//!
//! Registration is expected to finish before search traffic starts, but
//! appends are lock-guarded so late registration is still safe: a search
//! works on a snapshot taken when it starts.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::descriptor::{IndexDescriptor, IndexSpec};
use crate::error::{Result, SearchError};
use crate::record::{RecordType, RecordTypeRef};

/// Global process-wide registry, created on first access.
static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Ordered, append-only collection of registered indices.
#[derive(Debug, Default)]
pub struct Registry {
    indices: RwLock<Vec<Arc<IndexDescriptor>>>,
}

/// The indices registered for one record type.
#[derive(Debug, Clone)]
pub struct TypeGroup {
    /// The shared record type.
    pub record_type: RecordTypeRef,
    /// Indices in registration order.
    pub indices: Vec<Arc<IndexDescriptor>>,
}

impl TypeGroup {
    /// Indices ordered by relevance, highest first.
    ///
    /// The sort is stable: equal weights keep registration order.
    pub fn by_relevance(&self) -> Vec<Arc<IndexDescriptor>> {
        let mut ordered = self.indices.clone();
        // NaN weights never pass validation, so `partial_cmp` is total here.
        ordered.sort_by(|a, b| {
            b.relevance()
                .partial_cmp(&a.relevance())
                .unwrap_or(Ordering::Equal)
        });
        ordered
    }
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(Registry::new)
    }

    /// Register an index on `record_type` and hand the record type back.
    ///
    /// # Errors
    ///
    /// Fails if the spec is invalid (see [`IndexSpec::build`]) or if a
    /// different record type is already registered under the same name.
    pub fn register<T: RecordType>(
        &self,
        record_type: Arc<T>,
        spec: IndexSpec,
    ) -> Result<Arc<T>> {
        let erased: RecordTypeRef = record_type.clone();
        let descriptor = spec.build(erased)?;
        self.insert(descriptor)?;
        Ok(record_type)
    }

    /// Append an already built descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Registration`] if another record type with
    /// the same name is already registered.
    pub fn insert(&self, descriptor: IndexDescriptor) -> Result<Arc<IndexDescriptor>> {
        let mut indices = self.indices.write().unwrap_or_else(PoisonError::into_inner);

        let name = descriptor.record_type().name();
        let conflict = indices.iter().any(|existing| {
            existing.record_type().name() == name
                && !std::ptr::addr_eq(
                    Arc::as_ptr(existing.record_type()),
                    Arc::as_ptr(descriptor.record_type()),
                )
        });
        if conflict {
            return Err(SearchError::Registration(format!(
                "record type name {name:?} is already registered by a different record type"
            )));
        }

        tracing::info!(
            record_type = name,
            field = descriptor.match_field(),
            max_results = descriptor.max_results(),
            relevance = descriptor.relevance(),
            "registered search index"
        );
        let descriptor = Arc::new(descriptor);
        indices.push(Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Copy of all indices in registration order.
    pub fn snapshot(&self) -> Vec<Arc<IndexDescriptor>> {
        self.indices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Indices partitioned by record type, in ascending record type name.
    pub fn grouped(&self) -> Vec<TypeGroup> {
        let mut groups: BTreeMap<String, TypeGroup> = BTreeMap::new();
        for index in self.snapshot() {
            groups
                .entry(index.record_type().name().to_owned())
                .or_insert_with(|| TypeGroup {
                    record_type: Arc::clone(index.record_type()),
                    indices: Vec::new(),
                })
                .indices
                .push(index);
        }
        groups.into_values().collect()
    }

    /// Number of registered indices.
    pub fn len(&self) -> usize {
        self.indices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Register an index in the global registry, returning `record_type`.
///
/// # Errors
///
/// Same as [`Registry::register`].
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use site_search_core::{register, IndexSpec, RecordType};
/// # fn example<T: RecordType>(people: Arc<T>) -> site_search_core::Result<()> {
/// let people = register(people, IndexSpec::new("name__icontains").relevance(0.75))?;
/// # let _ = people;
/// # Ok(())
/// # }
/// ```
pub fn register<T: RecordType>(record_type: Arc<T>, spec: IndexSpec) -> Result<Arc<T>> {
    Registry::global().register(record_type, spec)
}

/// A spec waiting for its record type.
///
/// Lets the index configuration be declared up front and attached where the
/// record type itself is defined.
#[derive(Debug, Clone)]
pub struct Registrar {
    spec: IndexSpec,
}

impl IndexSpec {
    /// Defer registration until a record type is supplied.
    pub fn registrar(self) -> Registrar {
        Registrar { spec: self }
    }
}

impl Registrar {
    /// Register in the global registry.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::register`].
    pub fn attach<T: RecordType>(self, record_type: Arc<T>) -> Result<Arc<T>> {
        self.attach_to(Registry::global(), record_type)
    }

    /// Register in `registry`.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::register`].
    pub fn attach_to<T: RecordType>(
        self,
        registry: &Registry,
        record_type: Arc<T>,
    ) -> Result<Arc<T>> {
        registry.register(record_type, self.spec)
    }
}
