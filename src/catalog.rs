//! Product search, suggestions, locations and favorites.
//!
//! Thin query composition over the data API. Location lookups fall back to
//! the built-in catalog in [`crate::geo`] so registration never blocks on an
//! empty or unreachable `countries` table.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::backend::BackendError;
use crate::backend::query::{Query, ilike_expr};
use crate::backend::rest::RestClient;
use crate::geo::{self, City, Country};

pub const DEFAULT_MAX_PRICE: f64 = 10_000.0;
pub const DEFAULT_CURRENCY: &str = "USD";
pub const MAX_SUGGESTIONS: usize = 5;
pub const MIN_SUGGESTION_CHARS: usize = 2;

const PRODUCT_COLUMNS: &str = "*, profiles:supplier_id(full_name, avatar_url)";

// =============================================================================
// TYPES
// =============================================================================

/// Supplier columns embedded in a product row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierSummary {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub stock_quantity: Option<i64>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<String>,
    #[serde(default, rename = "profiles")]
    pub supplier: Option<SupplierSummary>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub slug: String,
}

/// Search criteria of the product list.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFilters {
    pub query: String,
    pub category: String,
    pub country: String,
    pub city: String,
    pub min_price: f64,
    pub max_price: f64,
    pub currency: String,
    pub sort_by: String,
    pub ascending: bool,
}

impl Default for ProductFilters {
    fn default() -> Self {
        Self {
            query: String::new(),
            category: String::new(),
            country: String::new(),
            city: String::new(),
            min_price: 0.0,
            max_price: DEFAULT_MAX_PRICE,
            currency: DEFAULT_CURRENCY.to_owned(),
            sort_by: "created_at".to_owned(),
            ascending: false,
        }
    }
}

impl ProductFilters {
    fn price_narrowed(&self) -> bool {
        self.min_price > 0.0 || self.max_price < DEFAULT_MAX_PRICE
    }

    /// Number of filters shown as active chips. Currency and sort are not counted.
    #[must_use]
    pub fn active_count(&self) -> usize {
        [
            !self.query.trim().is_empty(),
            !self.category.is_empty(),
            !self.country.is_empty(),
            !self.city.is_empty(),
            self.price_narrowed(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    #[must_use]
    pub fn to_query(&self) -> Query {
        let mut query = Query::new().select(PRODUCT_COLUMNS).eq("is_active", true);
        let text = self.query.trim();
        if !text.is_empty() {
            query = query.or(&[ilike_expr("title", text), ilike_expr("description", text)]);
        }
        if !self.category.is_empty() {
            query = query.eq("category", &self.category);
        }
        if !self.country.is_empty() {
            query = query.eq("country", &self.country);
        }
        if !self.city.is_empty() {
            query = query.eq("city", &self.city);
        }
        if self.price_narrowed() {
            query = query.gte("price", self.min_price).lte("price", self.max_price);
        }
        if self.currency != DEFAULT_CURRENCY {
            query = query.eq("currency", &self.currency);
        }
        query.order(&self.sort_by, self.ascending)
    }
}

#[derive(Deserialize)]
struct TitleRow {
    title: String,
}

#[derive(Deserialize)]
struct FavoriteRow {
    #[serde(default)]
    products: Option<Product>,
}

// =============================================================================
// CATALOG
// =============================================================================

#[derive(Clone)]
pub struct Catalog {
    rest: RestClient,
}

impl Catalog {
    #[must_use]
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    /// Active products matching `filters`.
    ///
    /// # Errors
    ///
    /// Any data-API failure.
    pub async fn search(&self, filters: &ProductFilters) -> Result<Vec<Product>, BackendError> {
        self.rest.select("products", &filters.to_query()).await
    }

    /// Up to five active product titles containing `text`. Short input
    /// returns nothing without a request; so does a failed request.
    pub async fn suggestions(&self, text: &str) -> Vec<String> {
        let Some(query) = suggestion_query(text) else {
            return Vec::new();
        };
        match self.rest.select::<TitleRow>("products", &query).await {
            Ok(rows) => rows.into_iter().map(|r| r.title).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "suggestion lookup failed");
                Vec::new()
            }
        }
    }

    /// # Errors
    ///
    /// Any data-API failure.
    pub async fn categories(&self) -> Result<Vec<Category>, BackendError> {
        let query = Query::new().select("name, slug").order("name", true);
        self.rest.select("categories", &query).await
    }

    /// Countries from the store, or the built-in list when the store fails
    /// or has none.
    pub async fn countries(&self) -> Vec<Country> {
        let query = Query::new().select("name, code").order("name", true);
        match self.rest.select::<Country>("countries", &query).await {
            Ok(rows) if !rows.is_empty() => rows,
            Ok(_) => {
                tracing::debug!("no stored countries; using built-in list");
                geo::fallback_countries()
            }
            Err(e) => {
                tracing::warn!(error = %e, "country lookup failed; using built-in list");
                geo::fallback_countries()
            }
        }
    }

    /// Cities of `country_code`, with the same fallback as [`Self::countries`].
    pub async fn cities(&self, country_code: &str) -> Vec<City> {
        let code = country_code.trim();
        if code.is_empty() {
            return Vec::new();
        }
        let query = Query::new()
            .select("name, country_code")
            .eq("country_code", code)
            .order("name", true);
        match self.rest.select::<City>("cities", &query).await {
            Ok(rows) if !rows.is_empty() => rows,
            Ok(_) => geo::fallback_cities(code),
            Err(e) => {
                tracing::warn!(error = %e, country = code, "city lookup failed; using built-in list");
                geo::fallback_cities(code)
            }
        }
    }

    /// Products `user_id` marked as favorite. Rows whose product is gone are skipped.
    ///
    /// # Errors
    ///
    /// Any data-API failure.
    pub async fn favorites(&self, user_id: &str) -> Result<Vec<Product>, BackendError> {
        let query = Query::new()
            .select(&format!("products({PRODUCT_COLUMNS})"))
            .eq("user_id", user_id);
        let rows: Vec<FavoriteRow> = self.rest.select("favorites", &query).await?;
        Ok(rows.into_iter().filter_map(|r| r.products).collect())
    }

    /// # Errors
    ///
    /// Any data-API failure.
    pub async fn is_favorite(&self, user_id: &str, product_id: &str) -> Result<bool, BackendError> {
        let rows: Vec<serde_json::Value> = self
            .rest
            .select("favorites", &favorite_query(user_id, product_id).select("id").limit(1))
            .await?;
        Ok(!rows.is_empty())
    }

    /// # Errors
    ///
    /// Any data-API failure, including a duplicate favorite.
    pub async fn add_favorite(&self, user_id: &str, product_id: &str) -> Result<(), BackendError> {
        let row = json!({ "user_id": user_id, "product_id": product_id });
        self.rest
            .insert::<_, serde_json::Value>("favorites", &row)
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Any data-API failure.
    pub async fn remove_favorite(&self, user_id: &str, product_id: &str) -> Result<(), BackendError> {
        self.rest
            .delete("favorites", &favorite_query(user_id, product_id))
            .await
    }

    /// Flip the favorite flag; returns the new state.
    ///
    /// # Errors
    ///
    /// Any data-API failure.
    pub async fn toggle_favorite(&self, user_id: &str, product_id: &str) -> Result<bool, BackendError> {
        if self.is_favorite(user_id, product_id).await? {
            self.remove_favorite(user_id, product_id).await?;
            Ok(false)
        } else {
            self.add_favorite(user_id, product_id).await?;
            Ok(true)
        }
    }
}

fn favorite_query(user_id: &str, product_id: &str) -> Query {
    Query::new().eq("user_id", user_id).eq("product_id", product_id)
}

/// Title lookup for the search box, `None` below the minimum length.
#[must_use]
pub fn suggestion_query(text: &str) -> Option<Query> {
    let text = text.trim();
    if text.chars().count() < MIN_SUGGESTION_CHARS {
        return None;
    }
    Some(
        Query::new()
            .select("title")
            .contains("title", text)
            .eq("is_active", true)
            .limit(MAX_SUGGESTIONS),
    )
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
