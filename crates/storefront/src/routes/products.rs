//! Product catalog handlers.
//!
//! Reads are public. Writes take a multipart form: scalar text fields,
//! JSON-encoded `price`/`sizes`/`tags`/`colors`/`seo`/`collections`, an
//! optional `mainImage` file and up to ten `galleryImages` files.

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use hoi_core::ProductId;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::services::catalog::{
    CatalogError, CatalogService, ListQuery, MAX_GALLERY_IMAGES, ProductForm, store_upload,
};
use crate::state::AppState;

/// Largest accepted product form, images included.
pub const MAX_FORM_BYTES: usize = 25 * 1024 * 1024;

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    let products = ProductRepository::new(state.pool());
    let page = CatalogService::new(&products).list(&query).await?;
    Ok(Json(page))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    let products = ProductRepository::new(state.pool());
    let product = CatalogService::new(&products).get(id).await?;
    Ok(Json(product))
}

pub async fn show_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let products = ProductRepository::new(state.pool());
    let product = CatalogService::new(&products).get_by_slug(&slug).await?;
    Ok(Json(product))
}

pub async fn by_brand(
    State(state): State<AppState>,
    Path(brand): Path<String>,
) -> Result<impl IntoResponse> {
    let products = ProductRepository::new(state.pool());
    let listing = CatalogService::new(&products).by_brand(&brand).await?;
    Ok(Json(listing))
}

pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let form = read_form(&state, multipart).await?;
    let products = ProductRepository::new(state.pool());
    let product = CatalogService::new(&products).create(&form).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Product created successfully",
            "product": product,
        })),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let form = read_form(&state, multipart).await?;
    let products = ProductRepository::new(state.pool());
    let product = CatalogService::new(&products).update(id, &form).await?;
    Ok(Json(json!({
        "message": "Product updated successfully",
        "product": product,
    })))
}

pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    let products = ProductRepository::new(state.pool());
    CatalogService::new(&products).delete(id).await?;
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}

/// A file part held in memory until the whole form has been read.
struct Upload {
    file_name: Option<String>,
    bytes: Bytes,
}

/// Drain a multipart body into a [`ProductForm`], writing images to the
/// upload directory only once the form is known to be acceptable.
async fn read_form(state: &AppState, mut multipart: Multipart) -> Result<ProductForm> {
    let mut form = ProductForm::default();
    let mut main_image: Option<Upload> = None;
    let mut gallery: Vec<Upload> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match name.as_str() {
            "mainImage" | "galleryImages" => {
                let upload = Upload {
                    file_name: field.file_name().map(str::to_owned),
                    bytes: field.bytes().await.map_err(bad_multipart)?,
                };
                if upload.bytes.is_empty() {
                    continue;
                }
                if name == "mainImage" {
                    main_image = Some(upload);
                } else {
                    if gallery.len() >= MAX_GALLERY_IMAGES {
                        return Err(CatalogError::TooManyImages.into());
                    }
                    gallery.push(upload);
                }
            }
            _ => {
                let value = field.text().await.map_err(bad_multipart)?;
                form.insert_text(name, value);
            }
        }
    }

    let dir = &state.config().upload_dir;
    if let Some(upload) = main_image {
        form.set_main_image(store_upload(dir, upload.file_name.as_deref(), &upload.bytes).await?);
    }
    for upload in gallery {
        form.push_gallery_image(store_upload(dir, upload.file_name.as_deref(), &upload.bytes).await?)?;
    }
    Ok(form)
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> AppError {
    tracing::debug!(error = %err, "Rejected multipart body");
    AppError::BadRequest(err.body_text())
}
