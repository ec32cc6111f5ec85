//! Wall-clock bound on a VPN session

use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid connect time {0:?}: expected minutes or \"inf\"")]
pub struct BudgetError(String);

/// How long a session may stay up before it is torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBudget {
    /// Stay connected until interrupted
    Unbounded,
    Minutes(NonZeroU64),
}

impl TimeBudget {
    pub fn minutes(minutes: u64) -> Self {
        NonZeroU64::new(minutes).map_or(Self::Unbounded, Self::Minutes)
    }

    /// Wait bound for the controller, `None` when unbounded
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Unbounded => None,
            Self::Minutes(m) => Some(Duration::from_secs(m.get().saturating_mul(60))),
        }
    }
}

impl Default for TimeBudget {
    fn default() -> Self {
        Self::minutes(90)
    }
}

impl FromStr for TimeBudget {
    type Err = BudgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "inf" {
            return Ok(Self::Unbounded);
        }
        s.parse::<u64>()
            .map(Self::minutes)
            .map_err(|_| BudgetError(s.to_string()))
    }
}

impl fmt::Display for TimeBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => write!(f, "inf"),
            Self::Minutes(m) => write!(f, "{} min", m),
        }
    }
}
