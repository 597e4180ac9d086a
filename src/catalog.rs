//! Catalog seeding.
//!
//! Customers and products are owned by an external CRUD layer. For local
//! runs and tests the binary can preload them from a JSON file:
//!
//! ```json
//! {
//!   "customers": [{ "id": "c-1", "name": "Ana", "surname": "Silva",
//!                   "username": "ana", "email": "ana@example.com",
//!                   "shippingAddress": "Rua 1" }],
//!   "products":  [{ "id": "p-1", "name": "Kettle", "price": "45.00",
//!                   "stockAvailable": 5 }]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::OrderError;
use crate::orders::{Customer, Product};
use crate::store::{EntitiesExt, EntityStore, StoreError};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] OrderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Counts from a [`Catalog::seed`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub customers: usize,
    pub products: usize,
    /// Records left alone because their id was already taken
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Insert every record. Existing ids are skipped, never overwritten.
    /// Products are validated before anything is written.
    pub fn seed<S: EntityStore>(&self, store: &S) -> Result<SeedSummary, CatalogError> {
        for product in &self.products {
            product.validate()?;
        }

        let mut summary = SeedSummary::default();

        let customers = store.entities::<Customer>();
        for customer in &self.customers {
            if created(customers.put(customer))? {
                summary.customers += 1;
            } else {
                summary.skipped += 1;
            }
        }

        let products = store.entities::<Product>();
        for product in &self.products {
            if created(products.put(product))? {
                summary.products += 1;
            } else {
                summary.skipped += 1;
            }
        }

        tracing::info!(
            customers = summary.customers,
            products = summary.products,
            skipped = summary.skipped,
            "catalog seeded"
        );
        Ok(summary)
    }
}

fn created<T>(result: Result<T, StoreError>) -> Result<bool, StoreError> {
    match result {
        Ok(_) => Ok(true),
        Err(StoreError::AlreadyExists { partition, id }) => {
            tracing::debug!(%partition, %id, "catalog record already present");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
