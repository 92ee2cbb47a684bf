pub mod error;
pub mod types;

pub use error::{Result, TierCacheError};
pub use types::{
    Action, CacheKey, Datum, ParamValue, QueryRows, QueryTemplate, Row, RunMode, Tier,
};
