//! Query catalog: default parameter generators and fixed parameter pools

use rand::Rng;
use rand::seq::SliceRandom;

use crate::core::types::{ParamValue, QueryTemplate};

pub const PRODUCT_IDS: std::ops::RangeInclusive<i64> = 1..=20;
pub const USER_IDS: std::ops::RangeInclusive<i64> = 1..=100;

pub const CATEGORIES: [&str; 6] = [
    "Laptops",
    "Mobiles",
    "Tablets",
    "Accessories",
    "Desktops",
    "Wearables",
];

pub const SEASONS: [&str; 5] = [
    "College Start",
    "Holiday Sale",
    "Back to School",
    "Summer Sale",
    "New Year",
];

pub const CITIES: [&str; 5] = ["New York", "London", "Tokyo", "Delhi", "Berlin"];

/// Hot-regime draw weights, in `QueryTemplate::ALL` order
pub const HOT_WEIGHTS: [f64; 8] = [0.4, 0.1, 0.1, 0.1, 0.1, 0.05, 0.1, 0.05];

pub const BURST_CATEGORIES: [&str; 3] = ["Laptops", "Mobiles", "Tablets"];
pub const BURST_SEASONS: [&str; 2] = ["Holiday Sale", "Back to School"];
pub const HOT_PRODUCTS: [i64; 3] = [1, 2, 3];
pub const HOT_SEASON: &str = "College Start";
pub const HOT_CITY: &str = "Delhi";

fn pick<R: Rng + ?Sized>(rng: &mut R, pool: &[&str]) -> ParamValue {
    ParamValue::from(*pool.choose(rng).unwrap_or(&pool[0]))
}

/// Draw parameters from the template's default generator
pub fn default_params<R: Rng + ?Sized>(template: QueryTemplate, rng: &mut R) -> Vec<ParamValue> {
    match template {
        QueryTemplate::DailySalesProduct
        | QueryTemplate::UsersAlsoBought
        | QueryTemplate::RunningTotalSalesProduct => {
            vec![ParamValue::Int(rng.gen_range(PRODUCT_IDS))]
        }
        QueryTemplate::AvgOrderValueUser => vec![ParamValue::Int(rng.gen_range(USER_IDS))],
        QueryTemplate::TopRatedProductsCategory => vec![pick(rng, &CATEGORIES)],
        QueryTemplate::ReviewedAndBought => {
            let pid = rng.gen_range(PRODUCT_IDS);
            vec![ParamValue::Int(pid), ParamValue::Int(pid)]
        }
        QueryTemplate::ProductsOnPromotionSeason => vec![pick(rng, &SEASONS)],
        QueryTemplate::OrdersByCityInSeason => {
            vec![pick(rng, &CITIES), pick(rng, &SEASONS)]
        }
    }
}

/// Narrow hot-regime parameters for the three overridden templates
pub fn hot_params<R: Rng + ?Sized>(
    template: QueryTemplate,
    rng: &mut R,
) -> Option<Vec<ParamValue>> {
    match template {
        QueryTemplate::DailySalesProduct => {
            let id = *HOT_PRODUCTS.choose(rng).unwrap_or(&HOT_PRODUCTS[0]);
            Some(vec![ParamValue::Int(id)])
        }
        QueryTemplate::ProductsOnPromotionSeason => Some(vec![HOT_SEASON.into()]),
        QueryTemplate::OrdersByCityInSeason => Some(vec![HOT_CITY.into(), HOT_SEASON.into()]),
        _ => None,
    }
}
