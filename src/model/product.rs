use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Unique string key of a purchasable item (the platform "SKU").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Price of a product as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Price in 1/million of the currency base unit.
    pub micros: i64,
    /// 3 letter currency code, as defined by ISO 4217.
    pub currency: String,
}

/// Product descriptor returned by a catalog refresh.
///
/// Owned by the commerce platform; the manager only caches it read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub price: Price,
}

impl Product {
    /// Creates a new Product descriptor.
    ///
    /// # Arguments
    /// * `id` - Product identifier
    /// * `title` - Localized display title
    /// * `micros` - Price in micros of the currency base unit
    /// * `currency` - ISO 4217 currency code
    pub fn new(
        id: impl Into<ProductId>,
        title: impl Into<String>,
        micros: i64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            price: Price {
                micros,
                currency: currency.into(),
            },
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Result of a catalog query against the platform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
    /// Identifiers the platform did not recognize.
    pub invalid_identifiers: Vec<ProductId>,
}

/// Immutable snapshot of the descriptors returned by the last successful refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductCatalog {
    products: HashMap<ProductId, Product>,
}

impl ProductCatalog {
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.get(id)
    }

    pub fn contains(&self, id: &ProductId) -> bool {
        self.products.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Descriptors sorted by identifier.
    pub fn products(&self) -> Vec<Product> {
        let mut products: Vec<Product> = self.products.values().cloned().collect();
        products.sort_by(|a, b| a.id.cmp(&b.id));
        products
    }
}

impl FromIterator<Product> for ProductCatalog {
    fn from_iter<I: IntoIterator<Item = Product>>(iter: I) -> Self {
        Self {
            products: iter.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let catalog: ProductCatalog = vec![
            Product::new("pro_upgrade", "Pro", 4_990_000, "USD"),
            Product::new("coins_100", "100 Coins", 990_000, "USD"),
        ]
        .into_iter()
        .collect();

        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains(&ProductId::from("pro_upgrade")));
        assert!(catalog.get(&ProductId::from("missing")).is_none());

        let ids: Vec<String> = catalog.products().into_iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec!["coins_100", "pro_upgrade"]);
    }
}
