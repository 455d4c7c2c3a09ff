//! Client side of a small online shop: product catalog, cart, bearer-token
//! session and orders, backed by a remote REST API.
//!
//! [`Storefront`] owns all client state and exposes the handlers a front end
//! calls; [`views`] turns that state into text.

pub mod api;
pub mod app;
pub mod cart;
pub mod config;
pub mod form;
pub mod models;
pub mod navigation;
pub mod session;
pub mod storage;
pub mod views;

pub use api::{ApiClient, ApiError};
pub use app::{AppError, Storefront};
pub use cart::{Cart, CartItem};
pub use config::{Config, ConfigError};
pub use navigation::{Page, ViewState};
pub use session::{AuthError, SessionStore};
