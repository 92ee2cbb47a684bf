use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named query templates served by the source of record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryTemplate {
    DailySalesProduct,
    AvgOrderValueUser,
    UsersAlsoBought,
    RunningTotalSalesProduct,
    TopRatedProductsCategory,
    ReviewedAndBought,
    ProductsOnPromotionSeason,
    OrdersByCityInSeason,
}

impl QueryTemplate {
    /// Catalog order. Weight vectors and uniform draws index into this.
    pub const ALL: [QueryTemplate; 8] = [
        QueryTemplate::DailySalesProduct,
        QueryTemplate::AvgOrderValueUser,
        QueryTemplate::UsersAlsoBought,
        QueryTemplate::RunningTotalSalesProduct,
        QueryTemplate::TopRatedProductsCategory,
        QueryTemplate::ReviewedAndBought,
        QueryTemplate::ProductsOnPromotionSeason,
        QueryTemplate::OrdersByCityInSeason,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DailySalesProduct => "daily_sales_product",
            Self::AvgOrderValueUser => "avg_order_value_user",
            Self::UsersAlsoBought => "users_also_bought",
            Self::RunningTotalSalesProduct => "running_total_sales_product",
            Self::TopRatedProductsCategory => "top_rated_products_category",
            Self::ReviewedAndBought => "reviewed_and_bought",
            Self::ProductsOnPromotionSeason => "products_on_promotion_season",
            Self::OrdersByCityInSeason => "orders_by_city_in_season",
        }
    }

    /// Number of parameters the template expects
    pub fn arity(&self) -> usize {
        match self {
            Self::ReviewedAndBought | Self::OrdersByCityInSeason => 2,
            _ => 1,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for QueryTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single query parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Text(String),
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

/// Identity of a cached query result: template plus its parameter values.
///
/// All tier and policy state is keyed by this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub template: QueryTemplate,
    pub params: Vec<ParamValue>,
}

impl CacheKey {
    pub fn new(template: QueryTemplate, params: Vec<ParamValue>) -> Self {
        Self { template, params }
    }

    /// Key under which the value lives in the second tier
    pub fn storage_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.template.as_str())?;
        for param in &self.params {
            write!(f, "|{}", param)?;
        }
        Ok(())
    }
}

/// The two actions the policy chooses between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Cache,
    Evict,
}

impl Action {
    pub(crate) fn index(self) -> usize {
        match self {
            Action::Cache => 0,
            Action::Evict => 1,
        }
    }
}

/// Where a query result was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Fast,
    Second,
    Source,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Fast => "fast",
            Tier::Second => "second",
            Tier::Source => "source",
        }
    }
}

/// Whether a run goes through the cache or straight to the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Cached,
    Baseline,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Cached => "cached",
            RunMode::Baseline => "baseline",
        }
    }
}

/// A single column value returned by the source of record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Datum {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

pub type Row = Vec<Datum>;

/// Rows produced by one query execution; the value type cached by the simulator
pub type QueryRows = Vec<Row>;
