use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use super::types::Purchase;
use crate::catalog::types::IngredientCategory;

const UNKNOWN_STORE: &str = "Unknown Store";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpending {
    pub category: IngredientCategory,
    pub total: f64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSpending {
    pub store_id: Option<Uuid>,
    pub store_name: String,
    pub store_emoji: Option<String>,
    pub total: f64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingSummary {
    pub total: f64,
    pub count: u32,
    pub by_category: Vec<CategorySpending>,
    pub by_store: Vec<StoreSpending>,
}

pub fn total_spending(purchases: &[Purchase]) -> f64 {
    purchases.iter().map(|p| p.price).sum()
}

/// Purchases whose ingredient is gone (or was never set) are left out.
/// Highest spend first.
pub fn spending_by_category(purchases: &[Purchase]) -> Vec<CategorySpending> {
    let mut by_category: Vec<CategorySpending> = Vec::new();
    for p in purchases {
        let Some(category) = p.category else {
            continue;
        };
        match by_category.iter_mut().find(|c| c.category == category) {
            Some(c) => {
                c.total += p.price;
                c.count += 1;
            }
            None => by_category.push(CategorySpending {
                category,
                total: p.price,
                count: 1,
            }),
        }
    }
    by_category.sort_by(|a, b| b.total.total_cmp(&a.total));
    by_category
}

/// Purchases without a store are pooled under one "Unknown Store" bucket.
/// Highest spend first.
pub fn spending_by_store(purchases: &[Purchase]) -> Vec<StoreSpending> {
    let mut by_store: BTreeMap<Option<Uuid>, StoreSpending> = BTreeMap::new();
    for p in purchases {
        let entry = by_store.entry(p.store_id).or_insert_with(|| StoreSpending {
            store_id: p.store_id,
            store_name: p
                .store_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_STORE.to_string()),
            store_emoji: p.store_emoji.clone(),
            total: 0.0,
            count: 0,
        });
        entry.total += p.price;
        entry.count += 1;
    }
    let mut out: Vec<StoreSpending> = by_store.into_values().collect();
    out.sort_by(|a, b| b.total.total_cmp(&a.total));
    out
}

impl SpendingSummary {
    pub fn new(purchases: &[Purchase]) -> Self {
        Self {
            total: total_spending(purchases),
            count: purchases.len() as u32,
            by_category: spending_by_category(purchases),
            by_store: spending_by_store(purchases),
        }
    }
}
