//! Shared, resolved dialects by product.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::contribute::EnvironmentProbe;
use crate::dialect::{Dialect, Product};
use crate::error::Result;
use crate::settings::DialectSettings;

/// Hands out one immutable [`Dialect`] snapshot per product.
///
/// Snapshots are replaced wholesale by [`DialectResolver::install`]; readers
/// holding an older `Arc` keep a consistent view.
#[derive(Debug, Default)]
pub struct DialectResolver {
    dialects: RwLock<HashMap<Product, Arc<Dialect>>>,
    settings: DialectSettings,
}

impl DialectResolver {
    #[must_use]
    pub fn new(settings: DialectSettings) -> Self {
        Self {
            dialects: RwLock::new(HashMap::new()),
            settings,
        }
    }

    /// Returns the current snapshot for `product`, building it from the
    /// configured settings on first use.
    #[must_use]
    pub fn resolve(&self, product: Product) -> Arc<Dialect> {
        if let Some(dialect) = self.dialects.read().get(&product) {
            return Arc::clone(dialect);
        }
        let mut dialects = self.dialects.write();
        Arc::clone(dialects.entry(product).or_insert_with(|| {
            debug!(dialect = product.name(), "Building dialect");
            Arc::new(Dialect::configured(product, &self.settings))
        }))
    }

    /// Resolves a product by the name a driver reports.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::UnknownProduct`](crate::DialectError::UnknownProduct)
    /// for unrecognized names.
    pub fn resolve_name(&self, name: &str) -> Result<Arc<Dialect>> {
        Ok(self.resolve(name.parse()?))
    }

    /// Replaces the snapshot for the dialect's product, returning the
    /// previous one.
    pub fn install(&self, dialect: Dialect) -> Option<Arc<Dialect>> {
        self.dialects
            .write()
            .insert(dialect.product(), Arc::new(dialect))
    }

    /// Contributes `product` against a live database and installs the result.
    pub async fn contribute<P: EnvironmentProbe>(&self, product: Product, probe: &P) -> Arc<Dialect> {
        let base = Dialect::new(product);
        let contributed = Arc::new(base.contribute(probe, &self.settings).await);
        self.dialects.write().insert(product, Arc::clone(&contributed));
        contributed
    }

    #[must_use]
    pub const fn settings(&self) -> &DialectSettings {
        &self.settings
    }
}
