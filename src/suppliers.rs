//! Supplier directory and a supplier's own product listings.
//!
//! Only paid suppliers are listed, and only paid suppliers may write to
//! `products`. Both sides key off [`Identity::supplier_features_enabled`].

use serde::{Deserialize, Serialize};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

use crate::backend::query::{Query, ilike_expr};
use crate::backend::rest::RestClient;
use crate::backend::{BackendError, Identity, UserType};
use crate::catalog::{DEFAULT_CURRENCY, Product};

pub const MISSING_PRODUCT_FIELDS: &str = "Veuillez remplir tous les champs obligatoires";
pub const INVALID_PRICE: &str = "Le prix doit être un nombre positif";
pub const INVALID_STOCK: &str = "La quantité en stock doit être un nombre positif ou zéro";
pub const SUPPLIER_PENDING: &str = "Votre compte sera activé après vérification du paiement";

const DIRECTORY_COLUMNS: &str = "id, full_name, bio, avatar_url, city, country, is_verified, created_at";
const PRODUCTS_TABLE: &str = "products";

/// Accounts younger than this show under the "new" tab.
const NEW_SUPPLIER_DAYS: i64 = 30;

// =============================================================================
// DIRECTORY
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SupplierSort {
    #[default]
    Newest,
    Oldest,
    Name,
}

impl std::str::FromStr for SupplierSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "name" => Ok(Self::Name),
            other => Err(format!("unknown supplier sort `{other}`")),
        }
    }
}

/// Client-side narrowing of a loaded directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SupplierTab {
    #[default]
    All,
    Verified,
    New,
}

impl std::str::FromStr for SupplierTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "verified" => Ok(Self::Verified),
            "new" => Ok(Self::New),
            other => Err(format!("unknown supplier tab `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupplierFilters {
    pub query: String,
    pub country: Option<String>,
    pub sort: SupplierSort,
}

impl SupplierFilters {
    /// Without an explicit country or a search term, a signed-in viewer sees
    /// suppliers of their own country first.
    #[must_use]
    pub fn with_home_region(mut self, viewer: Option<&Identity>) -> Self {
        if self.country.is_none() && self.query.trim().is_empty() {
            self.country = viewer
                .and_then(|i| i.profile.as_ref())
                .and_then(|p| p.country.clone())
                .filter(|c| !c.trim().is_empty());
        }
        self
    }

    #[must_use]
    pub fn to_query(&self) -> Query {
        let mut query = Query::new()
            .select(DIRECTORY_COLUMNS)
            .eq("user_type", UserType::Supplier.as_str())
            .eq("payment_status", "paid");
        let text = self.query.trim();
        if !text.is_empty() {
            query = query.or(&[ilike_expr("full_name", text), ilike_expr("bio", text)]);
        }
        if let Some(country) = self.country.as_deref() {
            query = query.eq("country", country);
        }
        match self.sort {
            SupplierSort::Newest => query.order("created_at", false),
            SupplierSort::Oldest => query.order("created_at", true),
            SupplierSort::Name => query.order("full_name", true),
        }
    }
}

/// Public columns of a listed supplier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierCard {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplierEntry {
    #[serde(flatten)]
    pub supplier: SupplierCard,
    pub product_count: usize,
}

/// Keep the entries shown under `tab`.
#[must_use]
pub fn filter_tab(entries: Vec<SupplierEntry>, tab: SupplierTab, now: OffsetDateTime) -> Vec<SupplierEntry> {
    let cutoff = now - Duration::days(NEW_SUPPLIER_DAYS);
    entries
        .into_iter()
        .filter(|e| match tab {
            SupplierTab::All => true,
            SupplierTab::Verified => e.supplier.is_verified,
            SupplierTab::New => e
                .supplier
                .created_at
                .as_deref()
                .and_then(|at| OffsetDateTime::parse(at, &Rfc3339).ok())
                .is_some_and(|at| at > cutoff),
        })
        .collect()
}

#[must_use]
pub fn active_products_query(supplier_id: &str) -> Query {
    Query::new()
        .select("*")
        .eq("supplier_id", supplier_id)
        .eq("is_active", true)
        .order("created_at", false)
}

// =============================================================================
// PRODUCT DRAFTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("{}", MISSING_PRODUCT_FIELDS)]
    MissingFields,
    #[error("{}", INVALID_PRICE)]
    InvalidPrice,
    #[error("{}", INVALID_STOCK)]
    InvalidStock,
    #[error("{}", SUPPLIER_PENDING)]
    SupplierLocked,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Editable fields of a supplier's product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDraft {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub category: String,
    pub stock_quantity: i64,
    pub images: Vec<String>,
    pub is_active: bool,
}

impl Default for ProductDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            price: 0.0,
            currency: DEFAULT_CURRENCY.to_owned(),
            category: String::new(),
            stock_quantity: 0,
            images: Vec::new(),
            is_active: true,
        }
    }
}

impl ProductDraft {
    /// # Errors
    ///
    /// The first failing rule, in form order.
    pub fn validate(&self) -> Result<(), ProductError> {
        let blank = |s: &str| s.trim().is_empty();
        if blank(&self.title) || blank(&self.description) || blank(&self.category) {
            return Err(ProductError::MissingFields);
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(ProductError::InvalidPrice);
        }
        if self.stock_quantity < 0 {
            return Err(ProductError::InvalidStock);
        }
        Ok(())
    }

    /// Row written on create. Location comes from the supplier's profile.
    fn to_row(&self, supplier: &Identity) -> serde_json::Value {
        let profile = supplier.profile.as_ref();
        json!({
            "title": self.title.trim(),
            "description": self.description.trim(),
            "price": self.price,
            "currency": self.currency,
            "category": self.category,
            "stock_quantity": self.stock_quantity,
            "images": self.images,
            "is_active": self.is_active,
            "supplier_id": supplier.id,
            "country": profile.and_then(|p| p.country.as_deref()),
            "city": profile.and_then(|p| p.city.as_deref()),
        })
    }
}

fn require_paid_supplier(identity: &Identity) -> Result<(), ProductError> {
    if identity.supplier_features_enabled() {
        Ok(())
    } else {
        Err(ProductError::SupplierLocked)
    }
}

// =============================================================================
// SERVICE
// =============================================================================

#[derive(Clone)]
pub struct Suppliers {
    rest: RestClient,
}

impl Suppliers {
    #[must_use]
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    /// Paid suppliers matching `filters`, each with its active product count.
    ///
    /// # Errors
    ///
    /// Any data-API failure, including one of the count lookups.
    pub async fn directory(&self, filters: &SupplierFilters) -> Result<Vec<SupplierEntry>, BackendError> {
        let suppliers: Vec<SupplierCard> = self.rest.select("profiles", &filters.to_query()).await?;
        let counts = futures_util::future::try_join_all(
            suppliers.iter().map(|s| self.active_product_count(&s.id)),
        )
        .await?;
        Ok(suppliers
            .into_iter()
            .zip(counts)
            .map(|(supplier, product_count)| SupplierEntry { supplier, product_count })
            .collect())
    }

    /// # Errors
    ///
    /// Any data-API failure.
    pub async fn active_products(&self, supplier_id: &str) -> Result<Vec<Product>, BackendError> {
        self.rest.select(PRODUCTS_TABLE, &active_products_query(supplier_id)).await
    }

    async fn active_product_count(&self, supplier_id: &str) -> Result<usize, BackendError> {
        let query = Query::new()
            .select("id")
            .eq("supplier_id", supplier_id)
            .eq("is_active", true);
        let rows: Vec<serde_json::Value> = self.rest.select(PRODUCTS_TABLE, &query).await?;
        Ok(rows.len())
    }

    /// All of the supplier's products, hidden ones included, newest first.
    ///
    /// # Errors
    ///
    /// Any data-API failure.
    pub async fn own_products(&self, supplier_id: &str) -> Result<Vec<Product>, BackendError> {
        self.rest.select(PRODUCTS_TABLE, &own_products_query(supplier_id)).await
    }

    /// # Errors
    ///
    /// [`ProductError::SupplierLocked`] until the fee is confirmed, a
    /// validation error, or the data-API failure.
    pub async fn create_product(&self, supplier: &Identity, draft: &ProductDraft) -> Result<Product, ProductError> {
        require_paid_supplier(supplier)?;
        draft.validate()?;
        let rows: Vec<Product> = self.rest.insert(PRODUCTS_TABLE, &draft.to_row(supplier)).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Parse("insert returned no product".into()).into())
    }

    /// # Errors
    ///
    /// Same as [`Self::create_product`].
    pub async fn update_product(
        &self,
        supplier: &Identity,
        product_id: &str,
        draft: &ProductDraft,
    ) -> Result<(), ProductError> {
        require_paid_supplier(supplier)?;
        draft.validate()?;
        let mut patch = draft.to_row(supplier);
        patch["updated_at"] = json!(now_rfc3339());
        self.rest
            .update(PRODUCTS_TABLE, &owned_product_query(&supplier.id, product_id), &patch)
            .await?;
        Ok(())
    }

    /// Show or hide a listing.
    ///
    /// # Errors
    ///
    /// [`ProductError::SupplierLocked`] or the data-API failure.
    pub async fn set_active(&self, supplier: &Identity, product_id: &str, active: bool) -> Result<(), ProductError> {
        require_paid_supplier(supplier)?;
        let patch = json!({ "is_active": active, "updated_at": now_rfc3339() });
        self.rest
            .update(PRODUCTS_TABLE, &owned_product_query(&supplier.id, product_id), &patch)
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// [`ProductError::SupplierLocked`] or the data-API failure.
    pub async fn delete_product(&self, supplier: &Identity, product_id: &str) -> Result<(), ProductError> {
        require_paid_supplier(supplier)?;
        self.rest
            .delete(PRODUCTS_TABLE, &owned_product_query(&supplier.id, product_id))
            .await?;
        Ok(())
    }
}

#[must_use]
pub fn own_products_query(supplier_id: &str) -> Query {
    Query::new()
        .select("*")
        .eq("supplier_id", supplier_id)
        .order("created_at", false)
}

/// Writes are scoped to the owner as well as the id.
fn owned_product_query(supplier_id: &str, product_id: &str) -> Query {
    Query::new().eq("id", product_id).eq("supplier_id", supplier_id)
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

#[cfg(test)]
#[path = "suppliers_test.rs"]
mod tests;
