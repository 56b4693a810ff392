//! Query plans and their cache.
//!
//! A plan is the reusable, immutable part of executing a native query: the
//! parameter-adjusted SQL plus the resolved result mapping. Plans are keyed
//! by everything that can change either of those.

mod cache;
mod key;

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, trace};

pub use cache::ComputeCache;
pub use key::{ByAddress, NonSelectPlanKey, ResultListTransformer, SelectPlanKey, TupleTransformer};

use crate::error::Result;
use crate::parameter::{recognize, ParameterInterpretation};
use crate::results::ResolvedMapping;

/// A compiled select statement.
#[derive(Debug)]
pub struct SelectPlan {
    pub sql: String,
    pub mapping: Arc<ResolvedMapping>,
    /// Tables whose modification invalidates results of this plan.
    pub affected_spaces: BTreeSet<String>,
}

/// A compiled update statement.
#[derive(Debug)]
pub struct NonSelectPlan {
    pub sql: String,
    pub affected_spaces: BTreeSet<String>,
}

/// Caches plans and parameter interpretations per statement.
///
/// With caching disabled every request builds afresh.
#[derive(Debug)]
pub struct QueryPlanCache {
    enabled: bool,
    select: ComputeCache<SelectPlanKey, Arc<SelectPlan>>,
    non_select: ComputeCache<NonSelectPlanKey, Arc<NonSelectPlan>>,
    interpretations: ComputeCache<String, Arc<ParameterInterpretation>>,
}

impl Default for QueryPlanCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl QueryPlanCache {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            select: ComputeCache::new(),
            non_select: ComputeCache::new(),
            interpretations: ComputeCache::new(),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the plan cached for `key`, building it at most once.
    ///
    /// A `None` key marks a plan that must not be shared, e.g. one whose SQL
    /// was rewritten for list parameters.
    ///
    /// # Errors
    ///
    /// Returns the build error; nothing is cached in that case.
    pub fn resolve_select_plan(
        &self,
        key: Option<SelectPlanKey>,
        build: impl FnOnce() -> Result<SelectPlan>,
    ) -> Result<Arc<SelectPlan>> {
        let Some(key) = key.filter(|_| self.enabled) else {
            return build().map(Arc::new);
        };
        let sql = key.sql.clone();
        let mut built = false;
        let plan = self.select.get_or_try_insert_with(key, || {
            built = true;
            build().map(Arc::new)
        })?;
        log_resolution("select", &sql, built);
        Ok(plan)
    }

    /// Non-select counterpart of [`resolve_select_plan`](Self::resolve_select_plan).
    ///
    /// # Errors
    ///
    /// Returns the build error; nothing is cached in that case.
    pub fn resolve_non_select_plan(
        &self,
        key: Option<NonSelectPlanKey>,
        build: impl FnOnce() -> Result<NonSelectPlan>,
    ) -> Result<Arc<NonSelectPlan>> {
        let Some(key) = key.filter(|_| self.enabled) else {
            return build().map(Arc::new);
        };
        let sql = key.sql.clone();
        let mut built = false;
        let plan = self.non_select.get_or_try_insert_with(key, || {
            built = true;
            build().map(Arc::new)
        })?;
        log_resolution("non-select", &sql, built);
        Ok(plan)
    }

    /// Recognizes the parameters of `sql`, memoized per statement text.
    ///
    /// # Errors
    ///
    /// Returns recognition errors such as mixed parameter styles.
    pub fn interpretation(&self, sql: &str) -> Result<Arc<ParameterInterpretation>> {
        if !self.enabled {
            return recognize(sql).map(Arc::new);
        }
        self.interpretations
            .get_or_try_insert_with(sql.to_string(), || recognize(sql).map(Arc::new))
    }

    #[must_use]
    pub fn select_plan_count(&self) -> usize {
        self.select.len()
    }

    #[must_use]
    pub fn non_select_plan_count(&self) -> usize {
        self.non_select.len()
    }

    #[must_use]
    pub fn interpretation_count(&self) -> usize {
        self.interpretations.len()
    }

    pub fn clear(&self) {
        self.select.clear();
        self.non_select.clear();
        self.interpretations.clear();
        debug!("Query plan cache cleared");
    }
}

fn log_resolution(kind: &str, sql: &str, built: bool) {
    if built {
        debug!(kind, sql = %sql, "Built query plan");
    } else {
        trace!(kind, sql = %sql, "Query plan cache hit");
    }
}
