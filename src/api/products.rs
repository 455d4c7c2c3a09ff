use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::{ApiClient, ApiError};
use crate::form::ProductDraft;
use crate::models::{Product, ProductId, ProductImage};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// One page of `GET /products/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductPage {
    pub data: Vec<Product>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl ApiClient {
    pub async fn list_products(&self, page: u32, limit: u32) -> Result<ProductPage, ApiError> {
        let request = self
            .http()
            .get(self.url(&["products", "list"])?)
            .query(&[("page", page), ("limit", limit)]);
        self.fetch(request, "Failed to load products").await
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        let id = id.to_string();
        let request = self.http().get(self.url(&["products", "detail", id.as_str()])?);
        self.fetch(request, "Failed to load product").await
    }

    pub async fn create_product(&self, draft: &ProductDraft) -> Result<(), ApiError> {
        let fallback = "Failed to create product";
        let form = product_form(draft, false, fallback)?;
        let request = self.http().post(self.url(&["products", "create"])?).multipart(form);
        self.submit(request, fallback).await
    }

    pub async fn update_product(&self, id: ProductId, draft: &ProductDraft) -> Result<(), ApiError> {
        let fallback = "Failed to update product";
        let form = product_form(draft, true, fallback)?;
        let id = id.to_string();
        let request = self
            .http()
            .post(self.url(&["products", "update", id.as_str()])?)
            .multipart(form);
        self.submit(request, fallback).await
    }

    pub async fn delete_product(&self, id: ProductId) -> Result<(), ApiError> {
        let id = id.to_string();
        let request = self.http().delete(self.url(&["products", "delete", id.as_str()])?);
        self.submit(request, "Failed to delete product").await
    }
}

/// Multipart body for create/update. A kept remote image is only re-sent
/// when editing; a pending upload is always attached as a file part.
fn product_form(draft: &ProductDraft, editing: bool, fallback: &str) -> Result<Form, ApiError> {
    let mut form = Form::new()
        .text("id", draft.id.to_string())
        .text("name", draft.name.clone())
        .text("price", draft.price.to_string())
        .text("description", draft.description.clone())
        .text("category", draft.category.clone())
        .text("stock", draft.stock.to_string())
        .text("isActive", draft.is_active.to_string());

    match &draft.image {
        Some(ProductImage::PendingUpload(upload)) => {
            let part = Part::bytes(upload.bytes.clone())
                .file_name(upload.file_name.clone())
                .mime_str(&upload.content_type)
                .map_err(|source| ApiError::Transport {
                    message: fallback.to_string(),
                    source,
                })?;
            form = form.part("image", part);
        }
        Some(ProductImage::Remote(path)) if editing && !path.is_empty() => {
            form = form.text("image", path.clone());
        }
        _ => {}
    }
    Ok(form)
}
