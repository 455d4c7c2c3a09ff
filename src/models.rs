use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

pub type ProductId = i64;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub stock: u32,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ProductImage>,
}

fn active_by_default() -> bool {
    true
}

impl Product {
    /// Whether the product can currently be put into a cart.
    pub fn is_purchasable(&self) -> bool {
        self.is_active && self.stock > 0
    }
}

/// Where a product picture lives: on the backend, or still on this machine
/// waiting to be sent with the next create/update.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ProductImage {
    Remote(String),
    PendingUpload(PendingUpload),
}

impl ProductImage {
    /// Resolves the image to something displayable.
    ///
    /// Relative backend paths are joined onto `base_url`; absolute URLs are
    /// returned untouched. Pending uploads resolve to their local preview
    /// handle. An empty remote path means there is no picture.
    pub fn source(&self, base_url: &str) -> Option<String> {
        match self {
            ProductImage::Remote(path) if path.is_empty() => None,
            ProductImage::Remote(path) if is_absolute_url(path) => Some(path.clone()),
            ProductImage::Remote(path) => Some(format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )),
            ProductImage::PendingUpload(upload) => Some(upload.preview_url()),
        }
    }
}

fn is_absolute_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingUpload {
    pub file_name: String,
    pub content_type: String,
    #[serde(serialize_with = "bytes_to_base64", deserialize_with = "bytes_from_base64")]
    pub bytes: Vec<u8>,
    pub preview_id: Uuid,
}

impl PendingUpload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        PendingUpload {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
            preview_id: Uuid::new_v4(),
        }
    }

    /// Local-only handle, valid for previews until the upload is sent.
    pub fn preview_url(&self) -> String {
        format!("blob:{}", self.preview_id)
    }
}

fn bytes_to_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(bytes))
}

fn bytes_from_base64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    BASE64.decode(encoded).map_err(serde::de::Error::custom)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignUpInput {
    pub email: String,
    pub password: String,
}

/// Claims carried by the bearer token the backend issues on login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub iat: i64,
    pub exp: i64, // Expiration time as UTC timestamp
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub email: String,
    pub role: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        AuthUser {
            email: claims.email,
            role: claims.role,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipping,
    Completed,
    Cancelled,
    Unknown,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipping => "shipping",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Awaiting confirmation",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Shipping => "Shipping",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Unknown => "Unknown",
        }
    }
}

impl From<&str> for OrderStatus {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pending" => OrderStatus::Pending,
            "confirmed" => OrderStatus::Confirmed,
            "shipping" => OrderStatus::Shipping,
            "completed" => OrderStatus::Completed,
            "cancelled" => OrderStatus::Cancelled,
            _ => OrderStatus::Unknown,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(OrderStatus::from(raw.as_str()))
    }
}

/// One line of an order as the backend stores it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(alias = "orderId")]
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub products: Vec<OrderLine>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Short reference shown to customers: the last eight characters of the id.
    pub fn short_id(&self) -> &str {
        let start = self
            .id
            .char_indices()
            .rev()
            .nth(7)
            .map(|(index, _)| index)
            .unwrap_or(0);
        &self.id[start..]
    }
}

/// Payload for `POST /orders/create`.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub products: Vec<OrderLine>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub shipping_address: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: OrderStatus,
}

/// What the backend hands back after accepting an order.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    #[serde(default, alias = "id")]
    pub order_id: Option<String>,
}

impl OrderReceipt {
    pub fn reference(&self) -> &str {
        self.order_id.as_deref().unwrap_or("N/A")
    }
}
