//! Startup contribution: probing the live database for defaults.

use std::time::Duration;

use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use tokio::time::timeout;
use tracing::debug;

use crate::dialect::Dialect;
use crate::error::{DialectError, Result};
use crate::settings::DialectSettings;

/// How long startup waits for the probe before using the default.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs a single-value query against the database a dialect is being
/// configured for.
#[allow(async_fn_in_trait)]
pub trait EnvironmentProbe {
    /// Returns the first column of the first row as an integer, or `None`
    /// when the query yields no rows.
    async fn query_scalar(&self, sql: &str) -> Result<Option<i64>>;
}

/// Probe over a `sqlx` connection pool.
#[derive(Debug, Clone)]
pub struct SqlxProbe {
    pool: SqlitePool,
}

impl SqlxProbe {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl EnvironmentProbe for SqlxProbe {
    async fn query_scalar(&self, sql: &str) -> Result<Option<i64>> {
        let Some(row) = sqlx::query(sql).fetch_optional(&self.pool).await? else {
            return Ok(None);
        };
        // Configuration tables report numbers as text.
        if let Ok(value) = row.try_get::<i64, _>(0) {
            return Ok(Some(value));
        }
        let text: String = row.try_get(0)?;
        text.trim()
            .parse()
            .map(Some)
            .map_err(|_| DialectError::InvalidSetting {
                key: "probe".to_string(),
                value: text,
                reason: "not an integer".to_string(),
            })
    }
}

/// A probe for environments without a live connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl EnvironmentProbe for NoProbe {
    async fn query_scalar(&self, _sql: &str) -> Result<Option<i64>> {
        Ok(None)
    }
}

impl Dialect {
    /// Produces the dialect snapshot used at runtime: probes the database for
    /// the LOB prefetch threshold, then layers user `settings` on top.
    ///
    /// Probe failures never escape; they are logged and the product default
    /// applies. A probe running longer than [`PROBE_TIMEOUT`] counts as
    /// failed.
    pub async fn contribute<P: EnvironmentProbe>(
        &self,
        probe: &P,
        settings: &DialectSettings,
    ) -> Self {
        self.contribute_within(probe, settings, PROBE_TIMEOUT).await
    }

    /// [`contribute`](Self::contribute) with an explicit probe time limit.
    pub async fn contribute_within<P: EnvironmentProbe>(
        &self,
        probe: &P,
        settings: &DialectSettings,
        limit: Duration,
    ) -> Self {
        let probed = match self.probe_query() {
            Some(sql) if settings.max_lob_prefetch_size.is_none() => {
                match timeout(limit, probe.query_scalar(sql)).await {
                    Ok(Ok(Some(value))) => u32::try_from(value).ok().or_else(|| {
                        debug!(value, "Ignoring out-of-range max_lob_prefetch_size");
                        None
                    }),
                    Ok(Ok(None)) => None,
                    Ok(Err(error)) => {
                        debug!(
                            dialect = self.name(),
                            error = %error,
                            "Could not probe max_lob_prefetch_size, using default"
                        );
                        None
                    }
                    Err(_) => {
                        debug!(
                            dialect = self.name(),
                            timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                            "Probing max_lob_prefetch_size timed out, using default"
                        );
                        None
                    }
                }
            }
            _ => None,
        };

        let resolved = self.resolve_settings(settings, probed);
        debug!(
            dialect = self.name(),
            max_lob_prefetch_size = resolved.max_lob_prefetch_size,
            use_legacy_boolean_type = resolved.use_legacy_boolean_type,
            use_unicode_string_types = resolved.use_unicode_string_types,
            treat_double_as_decimal = resolved.treat_double_typed_fields_as_decimal,
            in_expression_count_limit = resolved.in_expression_count_limit,
            "Dialect contributed"
        );
        self.reconfigured(resolved)
    }
}
