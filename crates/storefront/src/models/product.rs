//! Product domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rounds_core::{Money, ProductId, ShopId};

/// A configurable option of a product, e.g. size or color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    pub name: String,
    pub choices: Vec<String>,
}

/// A product (domain type).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub shop_id: ShopId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    /// What the owner pays per unit; only shown to the owner.
    pub cost_price: Option<Money>,
    pub is_available: bool,
    /// Maximum units sold per round; `None` means unlimited.
    pub round_limit: Option<i32>,
    pub image_urls: Vec<String>,
    pub options: Vec<ProductOption>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether `selected` names a choice for every option and nothing else.
    #[must_use]
    pub fn accepts_selection(&self, selected: &std::collections::BTreeMap<String, String>) -> bool {
        selected.len() == self.options.len()
            && self.options.iter().all(|option| {
                selected
                    .get(&option.name)
                    .is_some_and(|choice| option.choices.contains(choice))
            })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn tee() -> Product {
        Product {
            id: ProductId::new(1),
            shop_id: ShopId::new(1),
            name: "Tee".into(),
            description: None,
            price: Money::from_minor(25_000),
            cost_price: None,
            is_available: true,
            round_limit: None,
            image_urls: vec![],
            options: vec![ProductOption {
                name: "Size".into(),
                choices: vec!["S".into(), "M".into()],
            }],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_selection_must_cover_every_option() {
        let product = tee();
        let mut selected = BTreeMap::new();
        assert!(!product.accepts_selection(&selected));

        selected.insert("Size".to_owned(), "M".to_owned());
        assert!(product.accepts_selection(&selected));

        selected.insert("Size".to_owned(), "XXL".to_owned());
        assert!(!product.accepts_selection(&selected));
    }

    #[test]
    fn test_no_options_means_empty_selection() {
        let mut product = tee();
        product.options.clear();
        assert!(product.accepts_selection(&BTreeMap::new()));
    }
}
