use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::catalog::types::IngredientCategory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Store {
    pub id: Uuid,
    pub name: String,
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreDraft {
    pub name: String,
    pub emoji: Option<String>,
}

/// Stock of one ingredient, with the joined ingredient fields for display.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct InventoryItem {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub ingredient_emoji: Option<String>,
    pub category: IngredientCategory,
    pub quantity_on_hand: f64,
    pub unit: String,
    pub threshold_quantity: f64,
}

impl InventoryItem {
    /// Stock has dropped below the threshold. A zero threshold never triggers.
    pub fn is_low(&self) -> bool {
        self.quantity_on_hand < self.threshold_quantity
    }

    /// What it takes to get back up to the threshold, if anything.
    pub fn restock_quantity(&self) -> Option<f64> {
        self.is_low()
            .then(|| self.threshold_quantity - self.quantity_on_hand)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryDraft {
    pub ingredient_id: Uuid,
    #[serde(default)]
    pub quantity_on_hand: f64,
    #[serde(default)]
    pub threshold_quantity: f64,
    #[serde(default = "default_inventory_unit")]
    pub unit: String,
}

fn default_inventory_unit() -> String {
    "g".into()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryPatch {
    pub quantity_on_hand: Option<f64>,
    pub threshold_quantity: Option<f64>,
    pub unit: Option<String>,
}

/// A grocery purchase joined with its ingredient and store, when still present.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Purchase {
    pub id: Uuid,
    pub ingredient_id: Option<Uuid>,
    pub ingredient_name: Option<String>,
    pub category: Option<IngredientCategory>,
    pub store_id: Option<Uuid>,
    pub store_name: Option<String>,
    pub store_emoji: Option<String>,
    pub quantity: f64,
    pub unit: String,
    pub price: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub purchased_at: OffsetDateTime,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseDraft {
    pub ingredient_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    #[serde(default = "default_purchase_quantity")]
    pub quantity: f64,
    #[serde(default = "default_purchase_unit")]
    pub unit: String,
    pub price: f64,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub purchased_at: Option<OffsetDateTime>,
    pub notes: Option<String>,
}

fn default_purchase_quantity() -> f64 {
    1.0
}

fn default_purchase_unit() -> String {
    "unit".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ShoppingItem {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub ingredient_emoji: Option<String>,
    pub quantity_needed: f64,
    pub is_purchased: bool,
    pub auto_added: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShoppingDraft {
    pub ingredient_id: Uuid,
    pub quantity_needed: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum PantryError {
    #[error("store name must not be empty")]
    EmptyStoreName,
    #[error("{0} must be a non-negative number")]
    NegativeQuantity(&'static str),
    #[error("{0} must be positive")]
    NonPositive(&'static str),
    #[error("unknown ingredient {0}")]
    UnknownIngredient(Uuid),
    #[error("unknown store {0}")]
    UnknownStore(Uuid),
    #[error("ingredient {0} is already tracked in the inventory")]
    AlreadyTracked(Uuid),
}

fn non_negative(label: &'static str, value: f64) -> Result<(), PantryError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(PantryError::NegativeQuantity(label))
    }
}

fn positive(label: &'static str, value: f64) -> Result<(), PantryError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(PantryError::NonPositive(label))
    }
}

impl StoreDraft {
    pub fn validate(&mut self) -> Result<(), PantryError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(PantryError::EmptyStoreName);
        }
        Ok(())
    }
}

impl InventoryDraft {
    pub fn validate(&self) -> Result<(), PantryError> {
        non_negative("quantity_on_hand", self.quantity_on_hand)?;
        non_negative("threshold_quantity", self.threshold_quantity)
    }
}

impl InventoryPatch {
    pub fn validate(&self) -> Result<(), PantryError> {
        if let Some(q) = self.quantity_on_hand {
            non_negative("quantity_on_hand", q)?;
        }
        if let Some(t) = self.threshold_quantity {
            non_negative("threshold_quantity", t)?;
        }
        Ok(())
    }
}

impl PurchaseDraft {
    pub fn validate(&mut self) -> Result<(), PantryError> {
        positive("quantity", self.quantity)?;
        non_negative("price", self.price)?;
        self.notes = self
            .notes
            .take()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        Ok(())
    }
}

impl ShoppingDraft {
    pub fn validate(&self) -> Result<(), PantryError> {
        positive("quantity_needed", self.quantity_needed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(on_hand: f64, threshold: f64) -> InventoryItem {
        InventoryItem {
            id: Uuid::new_v4(),
            ingredient_id: Uuid::new_v4(),
            ingredient_name: "Rice".into(),
            ingredient_emoji: None,
            category: IngredientCategory::Grains,
            quantity_on_hand: on_hand,
            unit: "g".into(),
            threshold_quantity: threshold,
        }
    }

    #[test]
    fn restock_tops_up_to_threshold() {
        assert_eq!(stock(200.0, 500.0).restock_quantity(), Some(300.0));
        assert_eq!(stock(500.0, 500.0).restock_quantity(), None);
        assert_eq!(stock(0.0, 0.0).restock_quantity(), None);
    }

    #[test]
    fn purchase_validation() {
        let mut draft = PurchaseDraft {
            ingredient_id: None,
            store_id: None,
            quantity: 1.0,
            unit: "unit".into(),
            price: 3.5,
            purchased_at: None,
            notes: Some("   ".into()),
        };
        assert!(draft.validate().is_ok());
        assert_eq!(draft.notes, None);

        draft.price = -1.0;
        assert_eq!(draft.validate(), Err(PantryError::NegativeQuantity("price")));
        draft.price = 1.0;
        draft.quantity = 0.0;
        assert_eq!(draft.validate(), Err(PantryError::NonPositive("quantity")));
    }

    #[test]
    fn store_name_is_trimmed_and_required() {
        let mut draft = StoreDraft {
            name: "  Corner shop ".into(),
            emoji: None,
        };
        draft.validate().unwrap();
        assert_eq!(draft.name, "Corner shop");

        let mut blank = StoreDraft {
            name: " ".into(),
            emoji: None,
        };
        assert_eq!(blank.validate(), Err(PantryError::EmptyStoreName));
    }

    #[test]
    fn inventory_rejects_negative_stock() {
        let patch = InventoryPatch {
            quantity_on_hand: Some(-1.0),
            ..Default::default()
        };
        assert_eq!(
            patch.validate(),
            Err(PantryError::NegativeQuantity("quantity_on_hand"))
        );
    }
}
