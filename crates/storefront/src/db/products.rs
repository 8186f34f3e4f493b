//! Product repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgArguments;
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};

use hoi_core::{Gender, ProductId, ProductStatus};

use super::{Pagination, ProductStore, RepositoryError};
use crate::models::{
    Product, ProductAttributes, ProductDetails, ProductPrice, Seo, SizeStock,
};

const PRODUCT_COLUMNS: &str = "id, name, slug, brand, gender, category, subcategory, sku, \
     tax_slab, main_image, gallery_images, size_guide_url, video_url, colors, sizes, mrp, \
     discount_percent, sale_price, total_stock, status, is_featured, attributes, \
     short_description, description, tags, collections, seo, created_at, updated_at";

/// Shared `WHERE` clause for listing and counting. Every filter is optional:
/// a `NULL` scalar or an empty array disables it.
const FILTER_CLAUSE: &str = r"
    ($1::text IS NULL OR name ILIKE $1)
    AND (cardinality($2::text[]) = 0 OR category = ANY($2))
    AND (cardinality($3::text[]) = 0 OR LOWER(brand) = ANY($3))
    AND ($4::product_gender IS NULL OR gender = $4)
    AND ($5::text IS NULL OR EXISTS (
        SELECT 1 FROM unnest(colors) AS c WHERE LOWER(c) = LOWER($5)
    ))
    AND (cardinality($6::text[]) = 0 OR EXISTS (
        SELECT 1 FROM jsonb_array_elements(sizes) AS s WHERE s->>'label' = ANY($6)
    ))
    AND ($7::product_status IS NULL OR status = $7)
    AND ($8::bool IS NULL OR is_featured = $8)
";

/// Catalog listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
    pub categories: Vec<String>,
    /// Matched case-insensitively.
    pub brands: Vec<String>,
    pub gender: Option<Gender>,
    /// Matched case-insensitively against any of the product's colors.
    pub color: Option<String>,
    /// Products having at least one of these size labels.
    pub sizes: Vec<String>,
    pub status: Option<ProductStatus>,
    pub is_featured: Option<bool>,
}

impl ProductFilter {
    fn search_pattern(&self) -> Option<String> {
        self.search.as_deref().map(like_pattern)
    }

    fn lower_brands(&self) -> Vec<String> {
        self.brands.iter().map(|b| b.to_lowercase()).collect()
    }
}

/// Build an `ILIKE` pattern matching `text` anywhere, with wildcards escaped.
fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    slug: String,
    brand: Option<String>,
    gender: Gender,
    category: Option<String>,
    subcategory: Option<String>,
    sku: Option<String>,
    tax_slab: Option<String>,
    main_image: String,
    gallery_images: Vec<String>,
    size_guide_url: String,
    video_url: String,
    colors: Vec<String>,
    sizes: Json<Vec<SizeStock>>,
    mrp: Decimal,
    discount_percent: Decimal,
    sale_price: Option<Decimal>,
    total_stock: i32,
    status: ProductStatus,
    is_featured: bool,
    attributes: Json<ProductAttributes>,
    short_description: Option<String>,
    description: Option<String>,
    tags: Vec<String>,
    collections: Vec<String>,
    seo: Json<Seo>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: ProductId::new(r.id),
            details: ProductDetails {
                name: r.name,
                slug: r.slug,
                brand: r.brand,
                gender: r.gender,
                category: r.category,
                subcategory: r.subcategory,
                sku: r.sku,
                tax_slab: r.tax_slab,
                main_image: r.main_image,
                gallery_images: r.gallery_images,
                size_guide_url: r.size_guide_url,
                video_url: r.video_url,
                colors: r.colors,
                sizes: r.sizes.0,
                price: ProductPrice {
                    mrp: r.mrp,
                    discount_percent: r.discount_percent,
                    sale: r.sale_price,
                },
                total_stock: r.total_stock,
                status: r.status,
                is_featured: r.is_featured,
                attributes: r.attributes.0,
                short_description: r.short_description,
                description: r.description,
                tags: r.tags,
                collections: r.collections,
                seo: r.seo.0,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Bind the filter parameters `$1..=$8` of [`FILTER_CLAUSE`].
fn bind_filter<'q>(
    q: QueryAs<'q, Postgres, ProductRow, PgArguments>,
    filter: &'q ProductFilter,
) -> QueryAs<'q, Postgres, ProductRow, PgArguments> {
    q.bind(filter.search_pattern())
        .bind(&filter.categories)
        .bind(filter.lower_brands())
        .bind(filter.gender)
        .bind(filter.color.as_deref())
        .bind(&filter.sizes)
        .bind(filter.status)
        .bind(filter.is_featured)
}

fn bind_filter_count<'q>(
    q: QueryScalar<'q, Postgres, i64, PgArguments>,
    filter: &'q ProductFilter,
) -> QueryScalar<'q, Postgres, i64, PgArguments> {
    q.bind(filter.search_pattern())
        .bind(&filter.categories)
        .bind(filter.lower_brands())
        .bind(filter.gender)
        .bind(filter.color.as_deref())
        .bind(&filter.sizes)
        .bind(filter.status)
        .bind(filter.is_featured)
}

/// Bind the 25 writable product columns starting at the next placeholder.
fn bind_details<'q>(
    q: QueryAs<'q, Postgres, ProductRow, PgArguments>,
    d: &'q ProductDetails,
) -> QueryAs<'q, Postgres, ProductRow, PgArguments> {
    q.bind(&d.name)
        .bind(&d.slug)
        .bind(d.brand.as_deref())
        .bind(d.gender)
        .bind(d.category.as_deref())
        .bind(d.subcategory.as_deref())
        .bind(d.sku.as_deref())
        .bind(d.tax_slab.as_deref())
        .bind(&d.main_image)
        .bind(&d.gallery_images)
        .bind(&d.size_guide_url)
        .bind(&d.video_url)
        .bind(&d.colors)
        .bind(Json(&d.sizes))
        .bind(d.price.mrp)
        .bind(d.price.discount_percent)
        .bind(d.price.sale)
        .bind(d.total_stock)
        .bind(d.status)
        .bind(d.is_featured)
        .bind(Json(&d.attributes))
        .bind(d.short_description.as_deref())
        .bind(d.description.as_deref())
        .bind(&d.tags)
        .bind(&d.collections)
}

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for ProductRepository<'_> {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id.as_i32())
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Product::from))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Product::from))
    }

    async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(raw)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn list(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE {FILTER_CLAUSE} \
             ORDER BY created_at DESC LIMIT $9 OFFSET $10"
        );
        let rows = bind_filter(sqlx::query_as::<_, ProductRow>(&sql), filter)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM products WHERE {FILTER_CLAUSE}");
        let total = bind_filter_count(sqlx::query_scalar::<_, i64>(&count_sql), filter)
            .fetch_one(self.pool)
            .await?;

        Ok((rows.into_iter().map(Product::from).collect(), total))
    }

    async fn list_by_brand(&self, brand: &str) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE LOWER(brand) = LOWER($1) \
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(brand)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn insert(&self, details: &ProductDetails) -> Result<Product, RepositoryError> {
        let sql = format!(
            "INSERT INTO products (name, slug, brand, gender, category, subcategory, sku, \
             tax_slab, main_image, gallery_images, size_guide_url, video_url, colors, sizes, \
             mrp, discount_percent, sale_price, total_stock, status, is_featured, attributes, \
             short_description, description, tags, collections, seo) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21, $22, $23, $24, $25, $26) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = bind_details(sqlx::query_as::<_, ProductRow>(&sql), details)
            .bind(Json(&details.seo))
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "slug"))?;
        Ok(Product::from(row))
    }

    async fn update(
        &self,
        id: ProductId,
        details: &ProductDetails,
    ) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            "UPDATE products SET name = $1, slug = $2, brand = $3, gender = $4, category = $5, \
             subcategory = $6, sku = $7, tax_slab = $8, main_image = $9, gallery_images = $10, \
             size_guide_url = $11, video_url = $12, colors = $13, sizes = $14, mrp = $15, \
             discount_percent = $16, sale_price = $17, total_stock = $18, status = $19, \
             is_featured = $20, attributes = $21, short_description = $22, description = $23, \
             tags = $24, collections = $25, seo = $26, updated_at = NOW() \
             WHERE id = $27 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = bind_details(sqlx::query_as::<_, ProductRow>(&sql), details)
            .bind(Json(&details.seo))
            .bind(id.as_i32())
            .fetch_optional(self.pool)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "slug"))?;
        Ok(row.map(Product::from))
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn save_stock(
        &self,
        id: ProductId,
        total_stock: i32,
        sizes: &[SizeStock],
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE products SET total_stock = $2, sizes = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_i32())
        .bind(total_stock)
        .bind(Json(sizes))
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
