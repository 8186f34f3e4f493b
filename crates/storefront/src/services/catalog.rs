//! Product catalog.
//!
//! Listing with filters and pagination, lookups, and the admin create and
//! update flow. Admin forms arrive as multipart text fields, some of them
//! JSON-encoded, and are normalized into [`ProductDetails`] here.

use std::collections::HashMap;
use std::path::Path;

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use hoi_core::{Gender, ParseEnumError, ProductId, ProductStatus};

use crate::db::{Pagination, ProductFilter, ProductStore, RepositoryError};
use crate::models::{Product, ProductDetails, ProductPrice, Seo, SizeStock};

/// Default page size of the public product list.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Public URL prefix of uploaded product images.
pub const UPLOAD_URL_PREFIX: &str = "/uploads/products";

/// Most gallery images accepted in one form.
pub const MAX_GALLERY_IMAGES: usize = 10;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product name is required")]
    MissingName,

    #[error("Price data is required")]
    MissingPrice,

    #[error("Invalid price format")]
    InvalidPrice,

    #[error("{0}")]
    InvalidEnum(#[from] ParseEnumError),

    #[error("Too many gallery images (max {MAX_GALLERY_IMAGES})")]
    TooManyImages,

    #[error("Brand is required")]
    MissingBrand,

    #[error("Product not found")]
    NotFound,

    #[error("A product with this slug already exists")]
    SlugTaken,

    #[error("failed to store upload: {0}")]
    Upload(#[from] std::io::Error),

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(_) => Self::SlugTaken,
            other => Self::Repository(other),
        }
    }
}

/// Turn a name into a URL slug: lower-case, with every run of whitespace
/// and non-word characters collapsed into one `-`.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut in_separator = false;
    for c in text.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
            in_separator = false;
        } else if !in_separator {
            slug.push('-');
            in_separator = true;
        }
    }
    slug
}

/// Query string of `GET /products`. Multi-valued filters are comma lists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub is_featured: Option<String>,
    pub brand: Option<String>,
    pub gender: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
}

fn comma_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl ListQuery {
    /// Parse into a repository filter and page.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEnum` for an unknown gender or status.
    pub fn to_filter(&self) -> Result<(ProductFilter, Pagination), CatalogError> {
        let number = |v: Option<&str>| non_blank(v).and_then(|s| s.parse::<i64>().ok());

        let filter = ProductFilter {
            search: non_blank(self.search.as_deref()).map(str::to_owned),
            categories: comma_list(self.category.as_deref()),
            brands: comma_list(self.brand.as_deref()),
            gender: non_blank(self.gender.as_deref())
                .map(|g| g.to_lowercase().parse::<Gender>())
                .transpose()?,
            color: non_blank(self.color.as_deref()).map(str::to_owned),
            sizes: comma_list(self.size.as_deref()),
            status: non_blank(self.status.as_deref())
                .map(str::parse::<ProductStatus>)
                .transpose()?,
            is_featured: self.is_featured.as_deref().map(|v| v.trim() == "true"),
        };
        let page = Pagination::new(
            number(self.page.as_deref()),
            number(self.limit.as_deref()),
            DEFAULT_PAGE_SIZE,
        );
        Ok((filter, page))
    }
}

/// Pagination block of a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl PageMeta {
    #[must_use]
    pub const fn new(page: Pagination, total: i64) -> Self {
        Self {
            total,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages(total),
        }
    }
}

/// One page of products.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub data: Vec<Product>,
    pub pagination: PageMeta,
}

/// Products of one brand.
#[derive(Debug, Clone, Serialize)]
pub struct BrandProducts {
    pub data: Vec<Product>,
    pub count: usize,
}

/// A product form as posted by the admin panel.
///
/// Text fields are kept verbatim; uploaded images are recorded as their
/// public URLs.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    fields: HashMap<String, String>,
    main_image: Option<String>,
    gallery_images: Vec<String>,
}

/// Number out of a loosely typed JSON value: numbers as-is, numeric strings
/// parsed, anything else zero.
fn coerce_decimal(value: Option<&Value>) -> Decimal {
    match value {
        Some(Value::Number(n)) => n.to_string().parse().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => Decimal::ZERO,
    }
}

fn coerce_stock(value: Option<&Value>) -> i32 {
    let stock = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or_default(),
        _ => 0.0,
    };
    if stock.is_finite() {
        #[allow(clippy::cast_possible_truncation)]
        let stock = stock.trunc().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32;
        stock
    } else {
        0
    }
}

fn parse_price(raw: &str) -> Result<ProductPrice, CatalogError> {
    let value: Value = serde_json::from_str(raw).map_err(|_| CatalogError::InvalidPrice)?;
    let Value::Object(map) = value else {
        return Err(CatalogError::InvalidPrice);
    };
    let sale = coerce_decimal(map.get("sale"));
    Ok(ProductPrice {
        mrp: coerce_decimal(map.get("mrp")),
        discount_percent: coerce_decimal(map.get("discountPercent")),
        sale: (!sale.is_zero()).then_some(sale),
    })
}

fn parse_sizes(raw: &str) -> Option<Vec<SizeStock>> {
    let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(raw) else {
        return None;
    };
    Some(
        entries
            .iter()
            .filter_map(|entry| {
                let label = entry.get("label")?.as_str()?.trim();
                Some(SizeStock {
                    label: label.to_owned(),
                    stock: coerce_stock(entry.get("stock")),
                })
            })
            .collect(),
    )
}

/// A JSON list of strings. Objects with a `label` contribute their label.
fn parse_strings(raw: &str) -> Option<Vec<String>> {
    let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(raw) else {
        return None;
    };
    Some(
        entries
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_owned()),
                Value::Object(o) => o.get("label")?.as_str().map(|s| s.trim().to_owned()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

impl ProductForm {
    /// Record a text field. A repeated name overwrites the earlier value.
    pub fn insert_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Record the uploaded main image.
    pub fn set_main_image(&mut self, url: String) {
        self.main_image = Some(url);
    }

    /// Record one uploaded gallery image.
    ///
    /// # Errors
    ///
    /// Returns `TooManyImages` past [`MAX_GALLERY_IMAGES`].
    pub fn push_gallery_image(&mut self, url: String) -> Result<(), CatalogError> {
        if self.gallery_images.len() >= MAX_GALLERY_IMAGES {
            return Err(CatalogError::TooManyImages);
        }
        self.gallery_images.push(url);
        Ok(())
    }

    fn raw(&self, key: &str) -> Option<&str> {
        non_blank(self.fields.get(key).map(String::as_str))
    }

    fn text(&self, key: &str) -> Option<String> {
        self.raw(key).map(str::to_owned)
    }

    /// Build the details of a new product.
    ///
    /// # Errors
    ///
    /// Returns `MissingName`, `MissingPrice`, `InvalidPrice` or
    /// `InvalidEnum`.
    pub fn build_new(&self) -> Result<ProductDetails, CatalogError> {
        if self.raw("name").is_none() {
            return Err(CatalogError::MissingName);
        }
        if self.raw("price").is_none() {
            return Err(CatalogError::MissingPrice);
        }

        let mut details = ProductDetails::default();
        self.apply_to(&mut details)?;
        if details.slug.is_empty() {
            details.slug = slugify(&details.name);
        }
        Ok(details)
    }

    /// Overwrite every field present in the form. Unparseable JSON list
    /// fields leave the current value alone; an unparseable price is an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPrice` or `InvalidEnum`.
    pub fn apply_to(&self, d: &mut ProductDetails) -> Result<(), CatalogError> {
        if let Some(raw) = self.raw("price") {
            d.price = parse_price(raw)?;
        }
        if let Some(v) = self.raw("gender") {
            d.gender = v.to_lowercase().parse()?;
        }
        if let Some(v) = self.raw("status") {
            d.status = v.parse()?;
        }

        if let Some(v) = self.text("name") {
            d.name = v;
        }
        if let Some(v) = self.text("slug") {
            d.slug = v;
        }
        for (key, slot) in [
            ("brand", &mut d.brand),
            ("category", &mut d.category),
            ("subcategory", &mut d.subcategory),
            ("sku", &mut d.sku),
            ("taxSlab", &mut d.tax_slab),
            ("shortDescription", &mut d.short_description),
            ("description", &mut d.description),
        ] {
            if let Some(v) = self.text(key) {
                *slot = Some(v);
            }
        }
        for (key, slot) in [
            ("sizeGuideUrl", &mut d.size_guide_url),
            ("videoUrl", &mut d.video_url),
            ("mainImage", &mut d.main_image),
        ] {
            if let Some(v) = self.text(key) {
                *slot = v;
            }
        }

        let a = &mut d.attributes;
        for (key, slot) in [
            ("fabric", &mut a.fabric),
            ("composition", &mut a.composition),
            ("coverage", &mut a.coverage),
            ("padding", &mut a.padding),
            ("underwire", &mut a.underwire),
            ("strapType", &mut a.strap_type),
            ("closureType", &mut a.closure_type),
            ("pattern", &mut a.pattern),
            ("occasion", &mut a.occasion),
            ("careInstructions", &mut a.care_instructions),
        ] {
            if let Some(v) = self.text(key) {
                *slot = Some(v);
            }
        }

        if let Some(v) = self.raw("isFeatured") {
            d.is_featured = matches!(v, "true" | "on");
        }

        for (key, slot) in [
            ("tags", &mut d.tags),
            ("colors", &mut d.colors),
            ("collections", &mut d.collections),
        ] {
            if let Some(raw) = self.raw(key) {
                match parse_strings(raw) {
                    Some(list) => *slot = list,
                    None => tracing::debug!(field = key, "Ignoring malformed list field"),
                }
            }
        }
        if let Some(raw) = self.raw("seo") {
            match serde_json::from_str::<Seo>(raw) {
                Ok(seo) => d.seo = seo,
                Err(e) => tracing::debug!(error = %e, "Ignoring malformed seo field"),
            }
        }

        let sizes = self.raw("sizes").and_then(parse_sizes);
        let total_stock = self
            .raw("totalStock")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite());
        match (total_stock, &sizes) {
            #[allow(clippy::cast_possible_truncation)]
            (Some(total), _) => d.total_stock = total.trunc() as i32,
            (None, Some(sizes)) => d.total_stock = sizes.iter().map(|s| s.stock).sum(),
            (None, None) => {}
        }
        if let Some(sizes) = sizes {
            d.sizes = sizes;
        }

        if let Some(url) = &self.main_image {
            d.main_image.clone_from(url);
        }
        if !self.gallery_images.is_empty() {
            d.gallery_images.clone_from(&self.gallery_images);
        }

        Ok(())
    }
}

/// Write an uploaded image under `dir` and return its public URL.
///
/// Files get a unique name of the form `<millis>-<random><.ext>`, keeping the
/// original extension when it is plain ASCII.
///
/// # Errors
///
/// Returns `Upload` if the file cannot be written.
pub async fn store_upload(
    dir: &Path,
    original_name: Option<&str>,
    bytes: &[u8],
) -> Result<String, CatalogError> {
    let extension = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();
    let millis = chrono::Utc::now().timestamp_millis();
    let random: u32 = rand::rng().random_range(0..1_000_000_000);
    let filename = format!("{millis}-{random}{extension}");

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(&filename), bytes).await?;

    tracing::info!(filename = %filename, size = bytes.len(), "Stored product image");
    Ok(format!("{UPLOAD_URL_PREFIX}/{filename}"))
}

/// Catalog operations.
pub struct CatalogService<'a> {
    products: &'a dyn ProductStore,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(products: &'a dyn ProductStore) -> Self {
        Self { products }
    }

    /// # Errors
    ///
    /// Returns `InvalidEnum` for a bad filter value.
    pub async fn list(&self, query: &ListQuery) -> Result<ProductPage, CatalogError> {
        let (filter, page) = query.to_filter()?;
        let (data, total) = self.products.list(&filter, page).await?;
        Ok(ProductPage {
            data,
            pagination: PageMeta::new(page, total),
        })
    }

    /// # Errors
    ///
    /// Returns `NotFound` if no product has this id.
    pub async fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.products
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `NotFound` if no product has this slug.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Product, CatalogError> {
        self.products
            .find_by_slug(slug)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `MissingBrand` for a blank brand.
    pub async fn by_brand(&self, brand: &str) -> Result<BrandProducts, CatalogError> {
        let brand = non_blank(Some(brand)).ok_or(CatalogError::MissingBrand)?;
        let data = self.products.list_by_brand(brand).await?;
        Ok(BrandProducts {
            count: data.len(),
            data,
        })
    }

    /// # Errors
    ///
    /// See [`ProductForm::build_new`]. Returns `SlugTaken` on a duplicate
    /// slug.
    #[tracing::instrument(skip(self, form))]
    pub async fn create(&self, form: &ProductForm) -> Result<Product, CatalogError> {
        let details = form.build_new()?;
        let product = self.products.insert(&details).await?;
        tracing::info!(product_id = %product.id, slug = %product.details.slug, "Product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `NotFound`, a form error, or `SlugTaken`.
    #[tracing::instrument(skip(self, form), fields(product_id = %id))]
    pub async fn update(&self, id: ProductId, form: &ProductForm) -> Result<Product, CatalogError> {
        let mut details = self.get(id).await?.details;
        form.apply_to(&mut details)?;
        let product = self
            .products
            .update(id, &details)
            .await?
            .ok_or(CatalogError::NotFound)?;
        tracing::info!("Product updated");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `NotFound` if no product has this id.
    #[tracing::instrument(skip(self), fields(product_id = %id))]
    pub async fn delete(&self, id: ProductId) -> Result<(), CatalogError> {
        if !self.products.delete(id).await? {
            return Err(CatalogError::NotFound);
        }
        tracing::info!("Product deleted");
        Ok(())
    }
}
