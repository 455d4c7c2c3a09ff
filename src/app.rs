//! The application store: every piece of client state in one place, plus
//! the handlers user interactions call.

use std::sync::Arc;

use thiserror::Error;

use crate::api::products::DEFAULT_PAGE_SIZE;
use crate::api::{ApiClient, ApiError};
use crate::cart::Cart;
use crate::config::Config;
use crate::form::{FormError, OrderForm, ProductForm, RegisterForm};
use crate::models::{AuthUser, NewOrder, Order, OrderReceipt, OrderStatus, Product, ProductId};
use crate::navigation::{Page, ViewState};
use crate::session::{AuthError, SessionStore};
use crate::storage::{FileStorage, LocalStorage, StorageError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Please log in to continue")]
    LoginRequired,
    #[error("Your cart is empty")]
    EmptyCart,
    #[error("No product is awaiting deletion")]
    NothingToDelete,
    #[error("Product {0} is not available")]
    Unavailable(ProductId),
}

impl AppError {
    /// Whether the user was sent back to the login page because of this error.
    pub fn needs_login(&self) -> bool {
        match self {
            AppError::LoginRequired => true,
            AppError::Api(e) => e.is_authentication_required(),
            _ => false,
        }
    }
}

#[derive(Debug)]
pub struct Storefront {
    api: ApiClient,
    session: SessionStore,
    cart: Cart,
    view: ViewState,
    products: Vec<Product>,
}

impl Storefront {
    pub fn new(config: Config, storage: Arc<dyn LocalStorage>) -> Result<Self, AppError> {
        let session = SessionStore::new(storage.clone());
        let api = ApiClient::new(config, session.clone())?;
        let cart = Cart::load(storage);
        Ok(Storefront {
            api,
            session,
            cart,
            view: ViewState::new(),
            products: Vec::new(),
        })
    }

    /// Storefront whose token and cart live in `config.state_dir`.
    pub fn open(config: Config) -> Result<Self, AppError> {
        let storage = Arc::new(FileStorage::new(config.state_dir.clone()));
        Self::new(config, storage)
    }

    pub fn config(&self) -> &Config {
        self.api.config()
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.session.current_user()
    }

    pub fn is_admin(&self) -> bool {
        self.session.is_admin()
    }

    pub fn navigate(&mut self, page: Page, product: Option<Product>) -> Page {
        let authenticated = self.session.is_authenticated();
        self.view.navigate(page, product, authenticated)
    }

    /// A 401 anywhere outside login/register ends the session and sends the
    /// user to the login page.
    fn guard<T>(&mut self, result: Result<T, ApiError>) -> Result<T, AppError> {
        result.map_err(|error| {
            if error.is_authentication_required() {
                log::warn!("session rejected by backend, signing out");
                self.session.logout();
                self.view.navigate(Page::Login, None, false);
            }
            AppError::Api(error)
        })
    }

    pub async fn load_products(&mut self) -> Result<&[Product], AppError> {
        self.load_products_page(1, DEFAULT_PAGE_SIZE).await
    }

    pub async fn load_products_page(&mut self, page: u32, limit: u32) -> Result<&[Product], AppError> {
        let result = self.api.list_products(page, limit).await;
        let listing = self.guard(result)?;
        log::debug!("loaded {} products", listing.data.len());
        self.products = listing.data;
        Ok(&self.products)
    }

    pub async fn open_detail(&mut self, id: ProductId) -> Result<Page, AppError> {
        let result = self.api.get_product(id).await;
        let product = self.guard(result)?;
        Ok(self.navigate(Page::Detail, Some(product)))
    }

    /// Adds the product to the cart; inactive or sold-out products are refused.
    pub fn add_to_cart(&mut self, product: &Product, quantity: u32) -> Result<u32, AppError> {
        if !product.is_purchasable() {
            return Err(AppError::Unavailable(product.id));
        }
        self.cart.add(product, quantity);
        Ok(self.cart.quantity(product.id))
    }

    pub fn form_mut(&mut self) -> &mut ProductForm {
        self.view.form_mut()
    }

    /// Sends the form as a create or an update, depending on how the form
    /// was entered, then returns home.
    pub async fn submit_form(&mut self) -> Result<ProductId, AppError> {
        if !self.session.is_authenticated() {
            self.navigate(Page::Login, None);
            return Err(AppError::LoginRequired);
        }
        let mut draft = self.view.form().validate()?;

        // An edit always targets the product the form was opened for.
        let editing = self
            .view
            .selected_product()
            .filter(|_| self.view.is_editing())
            .map(|product| product.id);
        let result = match editing {
            Some(id) => {
                draft.id = id;
                self.api.update_product(id, &draft).await
            }
            None => self.api.create_product(&draft).await,
        };
        self.guard(result)?;

        log::info!("saved product {}", draft.id);
        self.navigate(Page::Home, None);
        Ok(draft.id)
    }

    pub fn confirm_delete(&mut self, product: Product) {
        self.view.modals.delete_confirm = Some(product);
    }

    pub fn cancel_delete(&mut self) {
        self.view.modals.delete_confirm = None;
    }

    /// Deletes the product awaiting confirmation. Leaving a detail page for
    /// a product that no longer exists returns home.
    pub async fn delete_confirmed(&mut self) -> Result<ProductId, AppError> {
        let id = match &self.view.modals.delete_confirm {
            Some(product) => product.id,
            None => return Err(AppError::NothingToDelete),
        };

        let result = self.api.delete_product(id).await;
        self.guard(result)?;

        self.products.retain(|p| p.id != id);
        self.view.modals.delete_confirm = None;
        if self.view.page() == Page::Detail {
            self.navigate(Page::Home, None);
        }
        log::info!("deleted product {}", id);
        Ok(id)
    }

    pub fn open_cart(&mut self) {
        self.view.modals.cart_open = true;
    }

    pub fn close_cart(&mut self) {
        self.view.modals.cart_open = false;
    }

    /// Leaves the cart for the order page.
    pub fn checkout(&mut self) -> Result<Page, AppError> {
        if !self.session.is_authenticated() {
            return Err(AppError::LoginRequired);
        }
        if self.cart.is_empty() {
            return Err(AppError::EmptyCart);
        }
        self.close_cart();
        Ok(self.navigate(Page::Order, None))
    }

    /// Submits the cart as an order and empties it once the backend accepts.
    pub async fn place_order(&mut self, form: &OrderForm) -> Result<OrderReceipt, AppError> {
        if !self.session.is_authenticated() {
            self.navigate(Page::Login, None);
            return Err(AppError::LoginRequired);
        }
        if self.cart.is_empty() {
            return Err(AppError::EmptyCart);
        }
        form.validate()?;

        let order = NewOrder {
            products: self.cart.order_lines(),
            total_amount: self.cart.total_price(),
            shipping_address: form.address.trim().to_string(),
            phone_number: form.phone.trim().to_string(),
            notes: form.notes(),
            status: OrderStatus::Pending,
        };
        let result = self.api.create_order(&order).await;
        let receipt = self.guard(result)?;

        log::info!("order {} placed", receipt.reference());
        self.cart.clear();
        Ok(receipt)
    }

    pub async fn order_history(&mut self) -> Result<Vec<Order>, AppError> {
        if self.navigate(Page::Orders, None) != Page::Orders {
            return Err(AppError::LoginRequired);
        }
        let result = self.api.order_history().await;
        self.guard(result)
    }

    pub async fn order(&mut self, id: &str) -> Result<Order, AppError> {
        if !self.session.is_authenticated() {
            self.navigate(Page::Login, None);
            return Err(AppError::LoginRequired);
        }
        let result = self.api.get_order(id).await;
        self.guard(result)
    }

    pub async fn cancel_order(&mut self, id: &str) -> Result<(), AppError> {
        if !self.session.is_authenticated() {
            self.navigate(Page::Login, None);
            return Err(AppError::LoginRequired);
        }
        let result = self.api.cancel_order(id).await;
        self.guard(result)?;
        log::info!("order {} cancelled", id);
        Ok(())
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<AuthUser, AppError> {
        let user = self.session.login(&self.api, email, password).await?;
        self.navigate(Page::Home, None);
        Ok(user)
    }

    pub async fn register(&mut self, form: &RegisterForm) -> Result<AuthUser, AppError> {
        form.validate()?;
        let user = self
            .session
            .register(&self.api, form.email.trim(), &form.password)
            .await?;
        self.navigate(Page::Home, None);
        Ok(user)
    }

    pub fn request_logout(&mut self) {
        self.view.modals.logout_confirm = true;
    }

    pub fn cancel_logout(&mut self) {
        self.view.modals.logout_confirm = false;
    }

    pub fn confirm_logout(&mut self) {
        self.view.modals.logout_confirm = false;
        self.session.logout();
        self.navigate(Page::Home, None);
    }
}
