//! Core search orchestrator: per-type authorization, ordered fetch, assembly.
//!
//! Visits record types in ascending name order, authorizes each one for the
//! caller, fetches from the eligible indices in relevance order, and yields
//! one [`TypeResult`] per record type that produced records. The output is
//! a lazy stream: nothing runs until it is polled, and dropping it cancels
//! whatever authorization or fetch is in flight.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, Stream, StreamExt, TryStreamExt};

use crate::auth::AuthorizationHook;
use crate::config::SearchConfig;
use crate::descriptor::IndexDescriptor;
use crate::error::Result;
use crate::record::{RecordRef, Scope};
use crate::registry::Registry;
use crate::types::{FromRecord, ResultRecord, TypeResult};

use super::assemble::{assemble, Hit};

/// Search every record type in `registry` for `term` on behalf of `caller`.
///
/// # Pipeline
///
/// 1. Partition indices by record type, in ascending record type name
/// 2. Ask `hook` for the caller's scope; skip the type if it is empty
/// 3. Order the type's indices by relevance (stable, highest first)
/// 4. Drop indices that do not accept `term` (empty term, failed precondition)
/// 5. Fetch from the remaining indices within the authorized scope
/// 6. Cap, deduplicate and convert the flattened hits
/// 7. Yield the result if it has records
///
/// # Errors
///
/// The stream yields [`SearchError::Config`](crate::SearchError::Config)
/// for an invalid `config`, and passes authorization and fetch errors
/// through, after which it ends. With
/// [`SearchConfig::isolate_fetch_failures`] a failing index is logged and
/// skipped instead.
pub fn search<'a, C, H>(
    registry: &Registry,
    hook: &'a H,
    config: SearchConfig,
    caller: &'a C,
    term: &'a str,
) -> impl Stream<Item = Result<TypeResult>> + Send + 'a
where
    C: ?Sized + Sync + 'a,
    H: AuthorizationHook<C> + ?Sized + 'a,
{
    search_as::<C, H, ResultRecord>(registry, hook, config, caller, term)
}

/// Like [`search`], converting records into a caller-chosen display type.
pub fn search_as<'a, C, H, D>(
    registry: &Registry,
    hook: &'a H,
    config: SearchConfig,
    caller: &'a C,
    term: &'a str,
) -> impl Stream<Item = Result<TypeResult<D>>> + Send + 'a
where
    C: ?Sized + Sync + 'a,
    H: AuthorizationHook<C> + ?Sized + 'a,
    D: FromRecord + 'a,
{
    let groups = registry.grouped();

    async_stream::try_stream! {
        config.validate()?;
        tracing::trace!(term, record_types = groups.len(), "search started");

        for group in groups {
            let record_type = group.record_type.name();
            let scope = hook.authorized_scope(caller, group.record_type.as_ref()).await?;
            if scope.is_empty() {
                tracing::debug!(record_type, "no authorized records, skipping");
                continue;
            }

            let eligible: Vec<Arc<IndexDescriptor>> = group
                .by_relevance()
                .into_iter()
                .filter(|index| index.accepts(term))
                .collect();
            if eligible.is_empty() {
                continue;
            }

            let hits = collect_hits(&eligible, term, scope.as_ref(), &config).await?;
            tracing::debug!(
                record_type,
                indices = eligible.len(),
                hits = hits.len(),
                "record type searched"
            );
            if let Some(result) = assemble::<D>(group.record_type.plural_label(), hits, config.dedup) {
                yield result;
            }
        }
    }
}

/// Run [`search`] to completion.
///
/// # Errors
///
/// Returns the first error the search stream yields.
pub async fn collect_search<C, H>(
    registry: &Registry,
    hook: &H,
    config: SearchConfig,
    caller: &C,
    term: &str,
) -> Result<Vec<TypeResult>>
where
    C: ?Sized + Sync,
    H: AuthorizationHook<C> + ?Sized,
{
    search(registry, hook, config, caller, term).try_collect().await
}

/// Fetch from `indices` and flatten the hits in index order.
async fn collect_hits(
    indices: &[Arc<IndexDescriptor>],
    term: &str,
    scope: &dyn Scope,
    config: &SearchConfig,
) -> Result<Vec<Hit>> {
    let mut hits = Vec::new();

    if config.parallel_fetch {
        // `buffered` yields in input order, so assembly sees the same
        // sequence as the sequential path.
        let pending: Vec<BoxFuture<'_, Result<Vec<RecordRef>>>> = indices
            .iter()
            .map(|index| index.fetch_all(term, Some(scope)).boxed())
            .collect();
        let outcomes: Vec<Result<Vec<RecordRef>>> = stream::iter(pending)
            .buffered(config.max_concurrent_fetches)
            .collect()
            .await;
        for (index, outcome) in indices.iter().zip(outcomes) {
            absorb(index, outcome, config, &mut hits)?;
        }
    } else {
        for index in indices {
            let outcome = index.fetch_all(term, Some(scope)).await;
            absorb(index, outcome, config, &mut hits)?;
        }
    }

    Ok(hits)
}

/// Append one index's fetch outcome to `hits`, or decide its failure.
fn absorb(
    index: &IndexDescriptor,
    outcome: Result<Vec<RecordRef>>,
    config: &SearchConfig,
    hits: &mut Vec<Hit>,
) -> Result<()> {
    match outcome {
        Ok(records) => {
            tracing::debug!(
                record_type = index.record_type().name(),
                field = index.match_field(),
                count = records.len(),
                "index returned records"
            );
            hits.extend(records.into_iter().map(|record| Hit::new(index, record)));
            Ok(())
        }
        Err(err) if config.isolate_fetch_failures => {
            tracing::warn!(
                record_type = index.record_type().name(),
                field = index.match_field(),
                error = %err,
                "index fetch failed, skipping"
            );
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// A registry, an authorization policy and a configuration bundled for
/// repeated searches.
#[derive(Debug)]
pub struct SearchOrchestrator<'r, H> {
    registry: &'r Registry,
    hook: H,
    config: SearchConfig,
}

impl<'r, H> SearchOrchestrator<'r, H> {
    /// Search `registry` under `hook` with the default configuration.
    pub fn new(registry: &'r Registry, hook: H) -> Self {
        Self {
            registry,
            hook,
            config: SearchConfig::default(),
        }
    }

    /// Replace the search configuration.
    #[must_use]
    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// The active search configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The authorization policy.
    pub fn hook(&self) -> &H {
        &self.hook
    }

    /// Lazily search for `term` on behalf of `caller`.
    pub fn search<'a, C>(
        &'a self,
        caller: &'a C,
        term: &'a str,
    ) -> impl Stream<Item = Result<TypeResult>> + Send + 'a
    where
        C: ?Sized + Sync + 'a,
        H: AuthorizationHook<C>,
    {
        search(self.registry, &self.hook, self.config, caller, term)
    }

    /// Lazily search, converting records into `D`.
    pub fn search_as<'a, C, D>(
        &'a self,
        caller: &'a C,
        term: &'a str,
    ) -> impl Stream<Item = Result<TypeResult<D>>> + Send + 'a
    where
        C: ?Sized + Sync + 'a,
        H: AuthorizationHook<C>,
        D: FromRecord + 'a,
    {
        search_as::<C, H, D>(self.registry, &self.hook, self.config, caller, term)
    }

    /// Run a search to completion.
    ///
    /// # Errors
    ///
    /// Returns the first error the search stream yields.
    pub async fn search_all<C>(&self, caller: &C, term: &str) -> Result<Vec<TypeResult>>
    where
        C: ?Sized + Sync,
        H: AuthorizationHook<C>,
    {
        collect_search(self.registry, &self.hook, self.config, caller, term).await
    }
}
