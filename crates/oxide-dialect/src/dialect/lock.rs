//! Row-lock clause rendering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DialectError;

/// Lock timeout meaning "wait forever".
pub const WAIT_FOREVER: i64 = -1;
/// Lock timeout meaning "do not wait".
pub const NO_WAIT: i64 = 0;
/// Lock timeout meaning "skip locked rows".
pub const SKIP_LOCKED: i64 = -2;

/// Requested pessimistic or optimistic lock mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockMode {
    #[default]
    None,
    Read,
    Optimistic,
    OptimisticForceIncrement,
    Write,
    Upgrade,
    UpgradeNowait,
    UpgradeSkipLocked,
    PessimisticRead,
    PessimisticWrite,
    PessimisticForceIncrement,
    Force,
}

impl LockMode {
    pub const ALL: [Self; 12] = [
        Self::None,
        Self::Read,
        Self::Optimistic,
        Self::OptimisticForceIncrement,
        Self::Write,
        Self::Upgrade,
        Self::UpgradeNowait,
        Self::UpgradeSkipLocked,
        Self::PessimisticRead,
        Self::PessimisticWrite,
        Self::PessimisticForceIncrement,
        Self::Force,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Read => "READ",
            Self::Optimistic => "OPTIMISTIC",
            Self::OptimisticForceIncrement => "OPTIMISTIC_FORCE_INCREMENT",
            Self::Write => "WRITE",
            Self::Upgrade => "UPGRADE",
            Self::UpgradeNowait => "UPGRADE_NOWAIT",
            Self::UpgradeSkipLocked => "UPGRADE_SKIPLOCKED",
            Self::PessimisticRead => "PESSIMISTIC_READ",
            Self::PessimisticWrite => "PESSIMISTIC_WRITE",
            Self::PessimisticForceIncrement => "PESSIMISTIC_FORCE_INCREMENT",
            Self::Force => "FORCE",
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LockMode {
    type Err = DialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == normalized)
            .ok_or_else(|| DialectError::InvalidSetting {
                key: "lock_mode".to_string(),
                value: s.to_string(),
                reason: "unknown lock mode".to_string(),
            })
    }
}

/// Lock mode plus timeout, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockOptions {
    pub mode: LockMode,
    pub timeout_millis: i64,
}

impl LockOptions {
    #[must_use]
    pub const fn new(mode: LockMode) -> Self {
        Self {
            mode,
            timeout_millis: WAIT_FOREVER,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout_millis: i64) -> Self {
        self.timeout_millis = timeout_millis;
        self
    }
}

impl Default for LockOptions {
    fn default() -> Self {
        Self::new(LockMode::None)
    }
}

/// Product-specific pieces of the `for update` clause.
///
/// An empty `for_update` means the product has no row-lock clause at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSyntax {
    pub for_update: &'static str,
    /// Shared-lock clause; `None` reuses `for_update`.
    pub for_share: Option<&'static str>,
    /// Whether `of <aliases>` may follow the clause.
    pub of_aliases: bool,
    pub nowait: Option<&'static str>,
    /// `None` falls back to the plain clause.
    pub skip_locked: Option<&'static str>,
    /// Prefix for a wait timeout in whole seconds, e.g. `" wait "`.
    pub wait: Option<&'static str>,
}

impl LockSyntax {
    /// A product without row locking.
    pub const NONE: Self = Self {
        for_update: "",
        for_share: None,
        of_aliases: false,
        nowait: None,
        skip_locked: None,
        wait: None,
    };

    /// Renders the lock clause for `mode`.
    ///
    /// `aliases` that are empty produce the alias-less form. Timeouts follow
    /// the usual convention: positive waits that many milliseconds (rendered
    /// as truncated whole seconds), zero is `nowait`, negative waits forever.
    #[must_use]
    pub fn render(&self, mode: LockMode, aliases: &[&str], timeout_millis: i64) -> String {
        if self.for_update.is_empty() {
            return String::new();
        }
        match mode {
            LockMode::Upgrade => self.for_update_of(aliases, false),
            LockMode::PessimisticRead => self.timed_lock(aliases, timeout_millis, true),
            LockMode::PessimisticWrite => self.timed_lock(aliases, timeout_millis, false),
            LockMode::UpgradeNowait | LockMode::Force | LockMode::PessimisticForceIncrement => {
                self.nowait_clause(aliases, false)
            }
            LockMode::UpgradeSkipLocked => {
                let mut clause = self.for_update_of(aliases, false);
                if let Some(skip) = self.skip_locked {
                    clause.push_str(skip);
                }
                clause
            }
            LockMode::None
            | LockMode::Read
            | LockMode::Optimistic
            | LockMode::OptimisticForceIncrement
            | LockMode::Write => String::new(),
        }
    }

    fn for_update_of(&self, aliases: &[&str], shared: bool) -> String {
        let mut clause = if shared {
            self.for_share.unwrap_or(self.for_update).to_string()
        } else {
            self.for_update.to_string()
        };
        if self.of_aliases && !aliases.is_empty() {
            clause.push_str(" of ");
            clause.push_str(&aliases.join(", "));
        }
        clause
    }

    fn nowait_clause(&self, aliases: &[&str], shared: bool) -> String {
        let mut clause = self.for_update_of(aliases, shared);
        if let Some(nowait) = self.nowait {
            clause.push_str(nowait);
        }
        clause
    }

    fn timed_lock(&self, aliases: &[&str], timeout_millis: i64, shared: bool) -> String {
        match timeout_millis {
            t if t > 0 => {
                let mut clause = self.for_update_of(aliases, shared);
                if let Some(wait) = self.wait {
                    clause.push_str(wait);
                    clause.push_str(&lock_wait_timeout_in_seconds(t).to_string());
                }
                clause
            }
            0 => self.nowait_clause(aliases, shared),
            _ => self.for_update_of(aliases, shared),
        }
    }
}

fn lock_wait_timeout_in_seconds(timeout_millis: i64) -> i64 {
    let seconds = timeout_millis / 1000;
    if timeout_millis % 1000 != 0 {
        info!(
            timeout_ms = timeout_millis,
            timeout_s = seconds,
            "Lock timeout truncated to whole seconds"
        );
    }
    seconds
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYNTAX: LockSyntax = LockSyntax {
        for_update: "for update",
        for_share: None,
        of_aliases: true,
        nowait: Some(" nowait"),
        skip_locked: None,
        wait: Some(" wait "),
    };

    #[test]
    fn test_pessimistic_write_with_timeout() {
        assert_eq!(
            SYNTAX.render(LockMode::PessimisticWrite, &["t0"], 5000),
            "for update of t0 wait 5"
        );
        assert_eq!(
            SYNTAX.render(LockMode::PessimisticWrite, &["t0"], 5999),
            "for update of t0 wait 5"
        );
    }

    #[test]
    fn test_timeout_zero_and_negative() {
        assert_eq!(
            SYNTAX.render(LockMode::PessimisticRead, &["t0"], NO_WAIT),
            "for update of t0 nowait"
        );
        assert_eq!(
            SYNTAX.render(LockMode::PessimisticWrite, &["t0"], WAIT_FOREVER),
            "for update of t0"
        );
    }

    #[test]
    fn test_nowait_family_and_empty_modes() {
        for mode in [
            LockMode::UpgradeNowait,
            LockMode::Force,
            LockMode::PessimisticForceIncrement,
        ] {
            assert_eq!(SYNTAX.render(mode, &["a", "b"], 0), "for update of a, b nowait");
        }
        for mode in [LockMode::None, LockMode::Read, LockMode::Optimistic] {
            assert_eq!(SYNTAX.render(mode, &["a"], 0), "");
        }
    }

    #[test]
    fn test_empty_aliases_use_aliasless_form() {
        assert_eq!(SYNTAX.render(LockMode::Upgrade, &[], -1), "for update");
        assert_eq!(SYNTAX.render(LockMode::PessimisticWrite, &[], 2000), "for update wait 2");
    }

    #[test]
    fn test_skip_locked_falls_back() {
        assert_eq!(
            SYNTAX.render(LockMode::UpgradeSkipLocked, &["t"], -1),
            "for update of t"
        );
    }

    #[test]
    fn test_no_lock_syntax() {
        assert_eq!(LockSyntax::NONE.render(LockMode::Upgrade, &["t"], 0), "");
    }

    #[test]
    fn test_parse_lock_mode() {
        assert_eq!(
            "pessimistic-write".parse::<LockMode>().unwrap(),
            LockMode::PessimisticWrite
        );
        assert!("sometimes".parse::<LockMode>().is_err());
    }
}
