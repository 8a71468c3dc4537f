use async_trait::async_trait;
use std::time::Duration;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::types::Operation;

/// Observer rings, executed in ascending order for every operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ObserverRing {
    DataPreparation = 0, // Ids, timestamps
    InputValidation = 1, // Immutable fields, document shape
    Security = 2,        // Tenant scoping
    Business = 3,        // Domain rules
    Enrichment = 4,      // Computed fields, defaults
    Database = 5,        // Store execution
    PostDatabase = 6,    // Result processing
}

impl ObserverRing {
    pub const ALL: [ObserverRing; 7] = [
        ObserverRing::DataPreparation,
        ObserverRing::InputValidation,
        ObserverRing::Security,
        ObserverRing::Business,
        ObserverRing::Enrichment,
        ObserverRing::Database,
        ObserverRing::PostDatabase,
    ];

    /// Errors raised in rings before the database abort the operation
    pub fn is_pre_database(&self) -> bool {
        (*self as u8) < (ObserverRing::Database as u8)
    }
}

/// Base trait for all observers with metadata and applicability checks
pub trait Observer: Send + Sync {
    /// Observer name for logging and debugging
    fn name(&self) -> &'static str;

    /// Which ring this observer belongs to
    fn ring(&self) -> ObserverRing;

    fn applies_to_operation(&self, op: Operation) -> bool;

    fn applies_to_model(&self, _model: &str) -> bool {
        true
    }

    /// Execution timeout (default 5 seconds); `None` runs to completion
    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_secs(5))
    }

    /// Priority within ring (lower numbers execute first)
    fn priority(&self) -> u8 {
        50
    }
}

#[async_trait]
pub trait GenericObserver: Observer {
    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError>;
}
