//! Editable form contents and their validation.

use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{PendingUpload, Product, ProductId, ProductImage};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormError {
    #[error("Please fill in all required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Product id must be a whole number, got {0:?}")]
    InvalidId(String),
    #[error("Price must be a number of at least 0, got {0:?}")]
    InvalidPrice(String),
    #[error("Stock must be a whole number of at least 0, got {0:?}")]
    InvalidStock(String),
    #[error("Images may not be larger than 5MB")]
    ImageTooLarge,
    #[error("Only PNG, JPEG and GIF images are accepted")]
    UnsupportedImage,
    #[error("Passwords do not match")]
    PasswordMismatch,
}

/// Contents of the create/edit product form, as typed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductForm {
    pub id: String,
    pub name: String,
    pub price: String,
    pub description: String,
    pub category: String,
    pub stock: String,
    pub is_active: bool,
    pub image: Option<ProductImage>,
}

impl Default for ProductForm {
    fn default() -> Self {
        ProductForm {
            id: String::new(),
            name: String::new(),
            price: String::new(),
            description: String::new(),
            category: String::new(),
            stock: String::new(),
            is_active: true,
            image: None,
        }
    }
}

impl From<&Product> for ProductForm {
    fn from(product: &Product) -> Self {
        ProductForm {
            id: product.id.to_string(),
            name: product.name.clone(),
            price: product.price.to_string(),
            description: product.description.clone(),
            category: product.category.clone(),
            stock: product.stock.to_string(),
            is_active: product.is_active,
            image: product.image.clone(),
        }
    }
}

/// A form that passed validation, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub description: String,
    pub category: String,
    pub stock: u32,
    pub is_active: bool,
    pub image: Option<ProductImage>,
}

impl ProductForm {
    pub fn validate(&self) -> Result<ProductDraft, FormError> {
        let required = [
            ("id", &self.id),
            ("name", &self.name),
            ("price", &self.price),
            ("description", &self.description),
            ("category", &self.category),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| *field)
            .collect();
        if !missing.is_empty() {
            return Err(FormError::MissingFields(missing));
        }

        let id = self
            .id
            .trim()
            .parse::<ProductId>()
            .map_err(|_| FormError::InvalidId(self.id.clone()))?;

        let price = Decimal::from_str(self.price.trim())
            .ok()
            .filter(|price| !price.is_sign_negative())
            .ok_or_else(|| FormError::InvalidPrice(self.price.clone()))?;

        let stock = if self.stock.trim().is_empty() {
            0
        } else {
            self.stock
                .trim()
                .parse::<u32>()
                .map_err(|_| FormError::InvalidStock(self.stock.clone()))?
        };

        Ok(ProductDraft {
            id,
            name: self.name.trim().to_string(),
            price,
            description: self.description.trim().to_string(),
            category: self.category.trim().to_string(),
            stock,
            is_active: self.is_active,
            image: self.image.clone(),
        })
    }

    /// Holds a picked file locally until the form is submitted.
    pub fn attach_image(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<(), FormError> {
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(FormError::ImageTooLarge);
        }
        let content_type = image_content_type(file_name).ok_or(FormError::UnsupportedImage)?;
        self.image = Some(ProductImage::PendingUpload(PendingUpload::new(
            file_name,
            content_type,
            bytes,
        )));
        Ok(())
    }

    pub fn remove_image(&mut self) {
        self.image = None;
    }
}

fn image_content_type(file_name: &str) -> Option<&'static str> {
    let extension = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Shipping details entered on the order page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderForm {
    pub address: String,
    pub phone: String,
    pub notes: String,
}

impl OrderForm {
    pub fn validate(&self) -> Result<(), FormError> {
        let mut missing = Vec::new();
        if self.address.trim().is_empty() {
            missing.push("address");
        }
        if self.phone.trim().is_empty() {
            missing.push("phone");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FormError::MissingFields(missing))
        }
    }

    pub fn notes(&self) -> Option<String> {
        let notes = self.notes.trim();
        (!notes.is_empty()).then(|| notes.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), FormError> {
        let mut missing = Vec::new();
        if self.email.trim().is_empty() {
            missing.push("email");
        }
        if self.password.is_empty() {
            missing.push("password");
        }
        if !missing.is_empty() {
            return Err(FormError::MissingFields(missing));
        }
        if self.password != self.confirm_password {
            return Err(FormError::PasswordMismatch);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordRule {
    pub description: &'static str,
    pub satisfied: bool,
}

/// Strength hints shown while a password is typed. They are advisory: the
/// backend decides what it accepts.
pub fn password_rules(password: &str) -> [PasswordRule; 4] {
    [
        PasswordRule {
            description: "At least 6 characters long",
            satisfied: password.chars().count() >= 6,
        },
        PasswordRule {
            description: "At least 1 uppercase letter",
            satisfied: password.chars().any(|c| c.is_ascii_uppercase()),
        },
        PasswordRule {
            description: "At least 1 lowercase letter",
            satisfied: password.chars().any(|c| c.is_ascii_lowercase()),
        },
        PasswordRule {
            description: "At least 1 number or special character",
            satisfied: password
                .chars()
                .any(|c| c.is_ascii_digit() || !(c.is_alphanumeric() || c == '_')),
        },
    ]
}
