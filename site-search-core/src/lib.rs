//! # site-search-core
//!
//! Site-wide search across many record types at once.
//!
//! Record types register one or more indices, each binding the record type
//! to a filterable field. A search visits every record type, lets an
//! authorization hook decide what the caller may see, runs the applicable
//! indices in relevance order, and yields one ranked, capped and
//! deduplicated result per record type.
//!
//! ## Design
//!
//! - Storage is reached only through the [`RecordType`] / [`Scope`] contract
//! - Indices live in an append-only [`Registry`], process-wide or local
//! - Authorization is a pluggable [`AuthorizationHook`]; the default lets
//!   superusers see everything and everyone else nothing
//! - Results are a lazy stream; dropping it cancels outstanding work
//!
//! ## Security
//!
//! - Records outside the authorized scope are never fetched
//! - Search terms are logged only at trace level

pub mod auth;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod orchestrator;
pub mod record;
pub mod registry;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

use futures::Stream;

pub use auth::{AuthorizationHook, Caller, SuperuserOnly};
pub use config::{DedupMode, SearchConfig};
pub use descriptor::{IndexDescriptor, IndexSpec, Precondition, DEFAULT_MAX_RESULTS};
pub use error::{Result, SearchError};
pub use orchestrator::search::{collect_search, search, search_as, SearchOrchestrator};
pub use record::{BoxError, BoxScope, Record, RecordRef, RecordStream, RecordType, Scope};
pub use registry::{register, Registrar, Registry};
pub use types::{FromRecord, ResultRecord, TypeResult};

/// Search the process-wide registry with the default policy and
/// configuration.
///
/// Convenience wrapper around [`search`] using [`Registry::global`],
/// [`SuperuserOnly`] and [`SearchConfig::default`].
///
/// # Examples
///
/// ```no_run
/// # use futures::StreamExt;
/// # async fn example(caller: &dyn site_search_core::Caller) {
/// let results = site_search_core::search_global(caller, "alice");
/// futures::pin_mut!(results);
/// while let Some(result) = results.next().await {
///     match result {
///         Ok(group) => println!("{}: {} records", group.type_label, group.records.len()),
///         Err(e) => eprintln!("search failed: {e}"),
///     }
/// }
/// # }
/// ```
pub fn search_global<'a, C>(
    caller: &'a C,
    term: &'a str,
) -> impl Stream<Item = Result<TypeResult>> + Send + 'a
where
    C: Caller + ?Sized + 'a,
{
    search(
        Registry::global(),
        &SuperuserOnly,
        SearchConfig::default(),
        caller,
        term,
    )
}
