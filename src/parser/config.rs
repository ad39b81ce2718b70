//! Parser configuration, cancellation and statistics

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Default bound on simultaneously alive stack versions
pub const DEFAULT_MAX_VERSIONS: usize = 6;

/// Shared flag that asks a running parse to stop
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Knobs of a [`Parser`](super::Parser)
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Stack versions kept after each token
    pub max_versions: usize,
    /// Parse actions allowed before giving up
    pub max_operations: Option<u64>,
    pub timeout: Option<Duration>,
    pub cancellation: Option<CancellationFlag>,
    /// Rebuild repetition chains as balanced trees after parsing
    pub balance_repetitions: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_versions: DEFAULT_MAX_VERSIONS,
            max_operations: None,
            timeout: None,
            cancellation: None,
            balance_repetitions: true,
        }
    }
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_versions(mut self, max_versions: usize) -> Self {
        self.max_versions = max_versions.max(1);
        self
    }

    pub fn with_operation_limit(mut self, limit: u64) -> Self {
        self.max_operations = Some(limit);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = Some(flag);
        self
    }

    pub fn with_balancing(mut self, enabled: bool) -> Self {
        self.balance_repetitions = enabled;
        self
    }
}

/// Why a parse stopped before producing a tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("parse was cancelled")]
    Cancelled,

    #[error("parse exceeded the limit of {limit} operations")]
    OperationLimit { limit: u64 },

    #[error("parse exceeded its timeout of {limit:?}")]
    Timeout { limit: Duration },
}

/// Counters collected during one parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Subtrees created, including tokens and rebalanced nodes
    pub nodes_allocated: u64,
    /// Old subtrees shifted whole
    pub subtrees_reused: u64,
    pub tokens_lexed: u64,
    pub bytes_lexed: u64,
    pub versions_forked: u64,
    pub recoveries: u64,
}

// ============================================================================
// Interruption
// ============================================================================

/// Checked between parse actions
pub(crate) trait Interrupt {
    type Error;

    fn poll(&mut self) -> Result<(), Self::Error>;
}

/// Never interrupts
pub(crate) struct Unbounded;

impl Interrupt for Unbounded {
    type Error = std::convert::Infallible;

    #[inline]
    fn poll(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Operation budget, deadline and cancellation flag of a configured parser
pub(crate) struct Budget {
    operations: u64,
    limit: Option<u64>,
    deadline: Option<(Instant, Duration)>,
    cancellation: Option<CancellationFlag>,
}

impl Budget {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            operations: 0,
            limit: config.max_operations,
            deadline: config.timeout.map(|timeout| (Instant::now() + timeout, timeout)),
            cancellation: config.cancellation.clone(),
        }
    }
}

impl Interrupt for Budget {
    type Error = ParseError;

    fn poll(&mut self) -> Result<(), ParseError> {
        self.operations += 1;
        if self.cancellation.as_ref().is_some_and(CancellationFlag::is_cancelled) {
            return Err(ParseError::Cancelled);
        }
        if let Some(limit) = self.limit {
            if self.operations > limit {
                return Err(ParseError::OperationLimit { limit });
            }
        }
        if let Some((deadline, limit)) = self.deadline {
            if Instant::now() >= deadline {
                return Err(ParseError::Timeout { limit });
            }
        }
        Ok(())
    }
}
