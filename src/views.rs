//! Text rendering of each page. Every function here is a pure function of
//! the state handed to it.

use std::fmt::Write as _;

use rust_decimal::Decimal;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cart::Cart;
use crate::form::{PasswordRule, ProductForm};
use crate::models::{AuthUser, Order, Product, ProductId, ProductImage};
use crate::navigation::Modals;

const NO_IMAGE: &str = "(no image)";

pub fn format_price(amount: Decimal) -> String {
    format!("₫{:.2}", amount)
}

#[derive(Tabled)]
struct ProductRow {
    #[tabled(rename = "ID")]
    id: ProductId,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Stock")]
    stock: u32,
    #[tabled(rename = "Status")]
    status: &'static str,
}

fn availability(product: &Product) -> &'static str {
    if !product.is_active {
        "inactive"
    } else if product.stock == 0 {
        "sold out"
    } else {
        "active"
    }
}

pub fn render_home(products: &[Product], authenticated: bool) -> String {
    if products.is_empty() {
        let mut out = String::from("No products yet.\n");
        if authenticated {
            out.push_str("Start by adding the first product.\n");
        }
        return out;
    }

    let rows = products.iter().map(|p| ProductRow {
        id: p.id,
        name: p.name.clone(),
        category: p.category.clone(),
        price: format_price(p.price),
        stock: p.stock,
        status: availability(p),
    });
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    format!("{}\n{} product(s)\n", table, products.len())
}

pub fn render_detail(product: &Product, base_url: &str, authenticated: bool) -> String {
    let image = product
        .image
        .as_ref()
        .and_then(|image| image.source(base_url))
        .unwrap_or_else(|| NO_IMAGE.to_string());

    let mut out = String::new();
    let _ = writeln!(out, "{} (#{})", product.name, product.id);
    let _ = writeln!(out, "  Price:     {}", format_price(product.price));
    let _ = writeln!(out, "  Category:  {}", product.category);
    let _ = writeln!(out, "  Stock:     {}", product.stock);
    let _ = writeln!(out, "  Status:    {}", availability(product));
    let _ = writeln!(out, "  Image:     {}", image);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", product.description);
    if !authenticated {
        let _ = writeln!(out);
        let _ = writeln!(out, "Log in to manage this product.");
    }
    out
}

pub fn render_form(form: &ProductForm, editing: bool) -> String {
    let mut out = String::new();
    let title = if editing { "Update product" } else { "New product" };
    let _ = writeln!(out, "{}", title);
    for (label, value) in [
        ("ID", &form.id),
        ("Name", &form.name),
        ("Price", &form.price),
        ("Category", &form.category),
        ("Stock", &form.stock),
        ("Description", &form.description),
    ] {
        let _ = writeln!(out, "  {:<12} {}", label, value);
    }
    let _ = writeln!(out, "  {:<12} {}", "Active", if form.is_active { "yes" } else { "no" });
    let image = match &form.image {
        Some(ProductImage::PendingUpload(upload)) => {
            format!("{} (not uploaded yet)", upload.file_name)
        }
        Some(ProductImage::Remote(path)) if !path.is_empty() => path.clone(),
        _ => NO_IMAGE.to_string(),
    };
    let _ = writeln!(out, "  {:<12} {}", "Image", image);
    out
}

#[derive(Tabled)]
struct CartRow {
    #[tabled(rename = "ID")]
    id: ProductId,
    #[tabled(rename = "Product")]
    name: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Qty")]
    quantity: u32,
    #[tabled(rename = "In stock")]
    stock: u32,
    #[tabled(rename = "Subtotal")]
    subtotal: String,
}

pub fn render_cart(cart: &Cart, authenticated: bool) -> String {
    if cart.is_empty() {
        return "Your cart is empty. Add some products to start shopping.\n".to_string();
    }

    let rows = cart.items().map(|item| CartRow {
        id: item.id,
        name: item.product.name.clone(),
        price: format_price(item.product.price),
        quantity: item.quantity,
        stock: item.product.stock,
        subtotal: format_price(item.subtotal()),
    });
    let mut table = Table::new(rows);
    table.with(Style::rounded());

    let mut out = format!("Cart ({} items)\n{}\n", cart.total_items(), table);
    let _ = writeln!(out, "Total: {}", format_price(cart.total_price()));
    if authenticated {
        let _ = writeln!(out, "Ready to check out.");
    } else {
        let _ = writeln!(out, "Log in to check out.");
    }
    out
}

pub fn render_order_summary(cart: &Cart, user: Option<&AuthUser>) -> String {
    let mut out = String::new();
    if let Some(user) = user {
        let _ = writeln!(out, "Ordering as {}", user.email);
    }
    for item in cart.items() {
        let _ = writeln!(
            out,
            "  {} x{}  {}",
            item.product.name,
            item.quantity,
            format_price(item.subtotal())
        );
    }
    let _ = writeln!(out, "Total: {}", format_price(cart.total_price()));
    out
}

#[derive(Tabled)]
struct OrderRow {
    #[tabled(rename = "Order")]
    reference: String,
    #[tabled(rename = "Placed")]
    placed: String,
    #[tabled(rename = "Items")]
    items: u32,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Status")]
    status: &'static str,
}

pub fn render_orders(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "You have not placed any orders yet.\n".to_string();
    }
    let rows = orders.iter().map(|order| OrderRow {
        reference: format!("#{}", order.short_id()),
        placed: order.created_at.format("%d/%m/%Y %H:%M").to_string(),
        items: order.products.iter().map(|line| line.quantity).sum(),
        total: format_price(order.total_amount),
        status: order.status.label(),
    });
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    format!("{}\n", table)
}

pub fn render_order(order: &Order) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Order #{} ({})", order.short_id(), order.status.label());
    let _ = writeln!(out, "  Placed:    {}", order.created_at.format("%d/%m/%Y %H:%M"));
    let _ = writeln!(out, "  Ship to:   {}", order.shipping_address);
    let _ = writeln!(out, "  Phone:     {}", order.phone_number);
    if let Some(notes) = order.notes.as_deref().filter(|n| !n.is_empty()) {
        let _ = writeln!(out, "  Notes:     {}", notes);
    }
    for line in &order.products {
        let _ = writeln!(
            out,
            "  product {} x{} at {}",
            line.product_id,
            line.quantity,
            format_price(line.price)
        );
    }
    let _ = writeln!(out, "  Total:     {}", format_price(order.total_amount));
    out
}

pub fn render_password_rules(rules: &[PasswordRule]) -> String {
    rules
        .iter()
        .map(|rule| format!("  [{}] {}\n", if rule.satisfied { "x" } else { " " }, rule.description))
        .collect()
}

/// Prompts for whichever dialog is open, if any.
pub fn render_modals(modals: &Modals) -> String {
    let mut out = String::new();
    if let Some(product) = &modals.delete_confirm {
        let _ = writeln!(
            out,
            "Delete \"{}\"? This cannot be undone. Re-run with --yes to confirm.",
            product.name
        );
    }
    if modals.logout_confirm {
        let _ = writeln!(out, "Are you sure you want to log out? You'll need to sign in again.");
    }
    out
}
