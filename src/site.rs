//! A ready-to-search site: dataset, registry and permission policy.

use futures_util::Stream;
use futures_util::TryStreamExt;
use site_search_core::{Registry, SearchConfig, TypeResult};

use crate::catalog::register_all;
use crate::config::SiteSearchConfig;
use crate::error::{Result, SiteSearchError};
use crate::permissions::{PermissionPolicy, User};
use crate::store::Dataset;

/// Everything needed to answer searches for one site.
#[derive(Debug)]
pub struct Site {
    dataset: Dataset,
    registry: Registry,
    policy: PermissionPolicy,
    config: SearchConfig,
}

impl Site {
    /// Load the configured dataset and register the configured indices.
    ///
    /// # Errors
    ///
    /// Returns [`SiteSearchError::Config`] if no dataset is configured, and
    /// any error from [`Dataset::from_file`] or [`Site::new`].
    pub fn from_config(config: &SiteSearchConfig) -> Result<Self> {
        let path = config
            .dataset
            .as_deref()
            .ok_or_else(|| SiteSearchError::Config("no dataset configured".into()))?;
        Self::new(Dataset::from_file(path)?, config)
    }

    /// Register `config`'s indices over `dataset` in a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or an index cannot
    /// be registered.
    pub fn new(dataset: Dataset, config: &SiteSearchConfig) -> Result<Self> {
        config.validate()?;
        let registry = Registry::new();
        let count = register_all(&registry, &dataset, &config.indices)?;
        tracing::info!(indices = count, "site search ready");
        Ok(Self {
            dataset,
            registry,
            policy: PermissionPolicy::new(config.permissions.global()?),
            config: config.search,
        })
    }

    /// The searched tables.
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// The registered indices.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The authorization policy searches run under.
    pub fn policy(&self) -> &PermissionPolicy {
        &self.policy
    }

    /// Lazily search for `term` as `user`.
    pub fn search<'a>(
        &'a self,
        user: &'a User,
        term: &'a str,
    ) -> impl Stream<Item = site_search_core::Result<TypeResult>> + Send + 'a {
        site_search_core::search(&self.registry, &self.policy, self.config, user, term)
    }

    /// Run a search to completion.
    ///
    /// # Errors
    ///
    /// Returns the first authorization or fetch failure.
    pub async fn search_all(&self, user: &User, term: &str) -> Result<Vec<TypeResult>> {
        let results = self.search(user, term).try_collect().await?;
        Ok(results)
    }
}
