//! Source of Record
//!
//! The authoritative store consulted on a cache miss. The engine only sees
//! this trait; `SimulatedSource` stands in for a real database.

use async_trait::async_trait;
use std::time::Duration;

pub mod simulated;

pub use simulated::{SimulatedSource, SourceLatencyConfig};

use crate::core::error::{Result, TierCacheError};
use crate::core::types::{ParamValue, QueryRows, QueryTemplate};

/// Rows returned by one execution plus the latency the source observed
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub rows: QueryRows,
    pub elapsed: Duration,
}

#[async_trait]
pub trait SourceOfRecord: Send + Sync {
    async fn execute(&self, template: QueryTemplate, params: &[ParamValue]) -> Result<QueryResult>;
}

/// Reject parameter lists that do not match the template's arity
pub fn check_arity(template: QueryTemplate, params: &[ParamValue]) -> Result<()> {
    if params.len() != template.arity() {
        return Err(TierCacheError::InvalidQuery(format!(
            "{} expects {} parameter(s), got {}",
            template,
            template.arity(),
            params.len()
        )));
    }
    Ok(())
}
