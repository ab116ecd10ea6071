use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info};
use moka::future::Cache;
use pack_engine::{Catalog, PackPlan, PackSize, PlanError};
use thiserror::Error;

use crate::provider::{CatalogError, CatalogProvider};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("pack sizes unavailable: {0}")]
    Catalog(#[from] CatalogError),

    #[error("order quantity {quantity} exceeds the limit of {max}")]
    QuantityTooLarge { quantity: u64, max: u64 },

    #[error("planning task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ServiceError {
    /// Whether the request itself was at fault, as opposed to the service.
    pub fn is_client_error(&self) -> bool {
        match self {
            ServiceError::Plan(PlanError::NoReachableAmount(_)) => false,
            ServiceError::Plan(_) | ServiceError::QuantityTooLarge { .. } => true,
            ServiceError::Catalog(_) | ServiceError::Task(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Largest order accepted. The planning table grows linearly with it.
    pub max_quantity: u64,
    /// Number of computed plans kept for reuse.
    pub cache_capacity: u64,
}

impl ServiceConfig {
    pub const DEFAULT_MAX_QUANTITY: u64 = 10_000_000;
    pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            max_quantity: Self::DEFAULT_MAX_QUANTITY,
            cache_capacity: Self::DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Plans orders against the pack sizes held by a [`CatalogProvider`].
pub struct PackingService<P> {
    provider: P,
    config: ServiceConfig,
    /// Bumped on every catalog update. Plans are cached under the generation
    /// that was current before their catalog was read, so a plan computed
    /// from an outdated catalog is never looked up again.
    generation: AtomicU64,
    plans: Cache<(u64, u64), Arc<PackPlan>>,
}

impl<P: CatalogProvider> PackingService<P> {
    pub fn new(provider: P, config: ServiceConfig) -> PackingService<P> {
        let plans = Cache::builder().max_capacity(config.cache_capacity).build();
        PackingService {
            provider,
            config,
            generation: AtomicU64::new(0),
            plans,
        }
    }

    pub fn config(&self) -> ServiceConfig {
        self.config
    }

    pub async fn pack_sizes(&self) -> Result<Vec<PackSize>, ServiceError> {
        Ok(self.provider.load().await?)
    }

    /// Replaces the catalog. Sizes are stored ascending with duplicates
    /// removed; an empty list or a size outside 1..=[`MAX_PLAN_AMOUNT`] is
    /// rejected and nothing is saved.
    ///
    /// [`MAX_PLAN_AMOUNT`]: pack_engine::MAX_PLAN_AMOUNT
    pub async fn update_pack_sizes(&self, sizes: Vec<PackSize>) -> Result<(), ServiceError> {
        let catalog = Catalog::from_pack_sizes(&sizes)?;
        self.provider.save(catalog.to_pack_sizes()).await?;

        self.generation.fetch_add(1, Ordering::SeqCst);
        self.plans.invalidate_all();
        info!("pack sizes updated: {:?}", catalog.sizes());
        Ok(())
    }

    pub async fn calculate_packs(&self, quantity: u64) -> Result<Arc<PackPlan>, ServiceError> {
        if quantity == 0 {
            return Err(PlanError::InvalidQuantity.into());
        }
        if quantity > self.config.max_quantity {
            return Err(ServiceError::QuantityTooLarge {
                quantity,
                max: self.config.max_quantity,
            });
        }

        // read before the catalog, see `generation`
        let key = (self.generation.load(Ordering::SeqCst), quantity);
        if let Some(plan) = self.plans.get(&key).await {
            debug!("plan for {} served from cache", quantity);
            return Ok(plan);
        }

        let sizes = self.provider.load().await?;
        let catalog = Catalog::from_pack_sizes(&sizes)?;
        let plan = tokio::task::spawn_blocking(move || catalog.plan(quantity)).await??;
        let plan = Arc::new(plan);
        debug!(
            "planned {} items as {} packs with {} surplus",
            quantity,
            plan.pack_count(),
            plan.surplus(quantity)
        );

        self.plans.insert(key, plan.clone()).await;
        Ok(plan)
    }
}
