use std::fmt;
use std::str::FromStr;

use crate::form::ProductForm;
use crate::models::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Home,
    Detail,
    Form,
    Login,
    Register,
    Order,
    Orders,
}

impl Page {
    /// Pages that bounce to the login page for anonymous visitors.
    pub fn requires_auth(self) -> bool {
        matches!(self, Page::Form | Page::Orders)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Page::Home => "home",
            Page::Detail => "detail",
            Page::Form => "form",
            Page::Login => "login",
            Page::Register => "register",
            Page::Order => "order",
            Page::Orders => "orders",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(Page::Home),
            "detail" => Ok(Page::Detail),
            "form" => Ok(Page::Form),
            "login" => Ok(Page::Login),
            "register" => Ok(Page::Register),
            "order" => Ok(Page::Order),
            "orders" => Ok(Page::Orders),
            other => Err(format!("unknown page {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modals {
    /// Product awaiting delete confirmation; the dialog is open while set.
    pub delete_confirm: Option<Product>,
    pub cart_open: bool,
    pub logout_confirm: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    page: Page,
    selected_product: Option<Product>,
    form: ProductForm,
    editing: bool,
    pub modals: Modals,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn selected_product(&self) -> Option<&Product> {
        self.selected_product.as_ref()
    }

    pub fn form(&self) -> &ProductForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ProductForm {
        &mut self.form
    }

    /// True when the form edits an existing product rather than creating one.
    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Moves to `target` and returns the page actually shown.
    ///
    /// Gated pages send anonymous visitors to login without touching any
    /// other state. Entering the form seeds it from `product`, or resets it
    /// to blank defaults when there is none.
    pub fn navigate(&mut self, target: Page, product: Option<Product>, authenticated: bool) -> Page {
        if target.requires_auth() && !authenticated {
            log::debug!("{} needs a login, showing login instead", target);
            self.page = Page::Login;
            return self.page;
        }

        let target = match target {
            Page::Detail if product.is_none() => Page::Home,
            Page::Register if authenticated => Page::Home,
            other => other,
        };

        if target == Page::Form {
            match &product {
                Some(product) => {
                    self.form = ProductForm::from(product);
                    self.editing = true;
                }
                None => {
                    self.form = ProductForm::default();
                    self.editing = false;
                }
            }
        }

        self.page = target;
        self.selected_product = product;
        self.page
    }
}
