use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use storefront::form::{password_rules, OrderForm, RegisterForm};
use storefront::models::ProductId;
use storefront::{views, AppError, Config, Page, Storefront};

type Error = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Parser)]
#[command(name = "storefront", about = "Browse the shop, fill a cart and place orders", long_about = None)]
struct Cli {
    /// Backend base URL (overrides STOREFRONT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory holding the saved session and cart (overrides STOREFRONT_STATE_DIR)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Browse and manage the catalog
    Products(ProductsCommand),
    /// Inspect and change the cart
    Cart(CartCommand),
    /// Sign in and keep the session for later commands
    Login(LoginArgs),
    /// Create an account and sign in
    Register(RegisterArgs),
    /// Forget the saved session
    Logout {
        #[arg(long)]
        yes: bool,
    },
    /// Show who is signed in
    Whoami,
    /// Place an order for everything in the cart
    Order(OrderArgs),
    /// Past orders
    Orders(OrdersCommand),
    /// Go to a page and show it
    Open(OpenArgs),
}

#[derive(Debug, Args)]
struct ProductsCommand {
    #[command(subcommand)]
    command: ProductsSubcommand,
}

#[derive(Debug, Subcommand)]
enum ProductsSubcommand {
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = storefront::api::products::DEFAULT_PAGE_SIZE)]
        limit: u32,
    },
    Show {
        id: ProductId,
    },
    Create(CreateProductArgs),
    Update {
        id: ProductId,
        #[command(flatten)]
        fields: ProductArgs,
    },
    Delete {
        id: ProductId,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Args)]
struct CreateProductArgs {
    /// Id for the new product
    #[arg(long)]
    id: ProductId,
    #[command(flatten)]
    fields: ProductArgs,
}

#[derive(Debug, Args)]
struct ProductArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    price: Option<Decimal>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    stock: Option<u32>,
    /// Mark the product active or inactive
    #[arg(long)]
    active: Option<bool>,
    /// PNG, JPEG or GIF file to upload
    #[arg(long)]
    image: Option<PathBuf>,
    /// Drop the current image
    #[arg(long, conflicts_with = "image")]
    no_image: bool,
}

#[derive(Debug, Args)]
struct CartCommand {
    #[command(subcommand)]
    command: CartSubcommand,
}

#[derive(Debug, Subcommand)]
enum CartSubcommand {
    Show,
    Add {
        id: ProductId,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a quantity; zero or less removes the item
    Set {
        id: ProductId,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    Remove {
        id: ProductId,
    },
    Clear,
    /// Check the cart is ready to order
    Checkout,
}

#[derive(Debug, Args)]
struct LoginArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Debug, Args)]
struct RegisterArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long, env = "STOREFRONT_CONFIRM_PASSWORD", hide_env_values = true)]
    confirm_password: String,
}

#[derive(Debug, Args)]
struct OrderArgs {
    #[arg(long)]
    address: String,
    #[arg(long)]
    phone: String,
    #[arg(long, default_value = "")]
    notes: String,
}

#[derive(Debug, Args)]
struct OrdersCommand {
    #[command(subcommand)]
    command: OrdersSubcommand,
}

#[derive(Debug, Subcommand)]
enum OrdersSubcommand {
    List,
    Show { id: String },
    Cancel { id: String },
}

#[derive(Debug, Args)]
struct OpenArgs {
    /// home, detail, form, login, register, order or orders
    page: Page,
    /// Product to show or edit
    #[arg(long)]
    product: Option<ProductId>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("warn"));

    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        eprintln!("{}", error);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let mut config = Config::from_env()?;
    if let Some(url) = &cli.api_url {
        config = config.with_api_url(url)?;
    }
    if let Some(dir) = cli.state_dir {
        config = config.with_state_dir(dir);
    }
    log::debug!("using backend {}", config.api_url);

    let mut store = Storefront::open(config)?;

    match cli.command {
        Commands::Products(ProductsCommand { command }) => products(&mut store, command).await,
        Commands::Cart(CartCommand { command }) => cart(&mut store, command).await,
        Commands::Login(args) => {
            let user = store.login(&args.email, &args.password).await?;
            println!("Signed in as {} ({})", user.email, user.role);
            Ok(())
        }
        Commands::Register(args) => {
            let rules = password_rules(&args.password);
            if rules.iter().any(|rule| !rule.satisfied) {
                print!("{}", views::render_password_rules(&rules));
            }
            let form = RegisterForm {
                email: args.email,
                password: args.password,
                confirm_password: args.confirm_password,
            };
            let user = store.register(&form).await?;
            println!("Welcome, {}! You are now signed in.", user.email);
            Ok(())
        }
        Commands::Logout { yes } => {
            store.request_logout();
            if !yes {
                print!("{}", views::render_modals(&store.view().modals));
                store.cancel_logout();
                return Ok(());
            }
            store.confirm_logout();
            println!("Signed out.");
            Ok(())
        }
        Commands::Whoami => {
            match store.current_user() {
                Some(user) if store.is_admin() => println!("{} ({}, can manage products)", user.email, user.role),
                Some(user) => println!("{} ({})", user.email, user.role),
                None => println!("Not signed in."),
            }
            Ok(())
        }
        Commands::Order(args) => {
            store.checkout()?;
            let user = store.current_user();
            print!("{}", views::render_order_summary(store.cart(), user.as_ref()));
            let form = OrderForm {
                address: args.address,
                phone: args.phone,
                notes: args.notes,
            };
            let receipt = store.place_order(&form).await?;
            println!("Thank you! Your order reference is {}.", receipt.reference());
            Ok(())
        }
        Commands::Orders(OrdersCommand { command }) => orders(&mut store, command).await,
        Commands::Open(args) => open(&mut store, args).await,
    }
}

async fn products(store: &mut Storefront, command: ProductsSubcommand) -> Result<(), Error> {
    match command {
        ProductsSubcommand::List { page, limit } => {
            let authenticated = store.is_authenticated();
            let products = store.load_products_page(page, limit).await?;
            print!("{}", views::render_home(products, authenticated));
        }
        ProductsSubcommand::Show { id } => {
            store.open_detail(id).await?;
            show_selected(store);
        }
        ProductsSubcommand::Create(CreateProductArgs { id, fields }) => {
            if store.navigate(Page::Form, None) != Page::Form {
                return Err(AppError::LoginRequired.into());
            }
            store.form_mut().id = id.to_string();
            fill_form(store, fields)?;
            print!("{}", views::render_form(store.view().form(), false));
            let id = store.submit_form().await?;
            println!("Created product {}.", id);
        }
        ProductsSubcommand::Update { id, fields } => {
            if !store.is_authenticated() {
                return Err(AppError::LoginRequired.into());
            }
            store.open_detail(id).await?;
            let product = store.view().selected_product().cloned();
            store.navigate(Page::Form, product);
            fill_form(store, fields)?;
            print!("{}", views::render_form(store.view().form(), true));
            store.submit_form().await?;
            println!("Updated product {}.", id);
        }
        ProductsSubcommand::Delete { id, yes } => {
            if !store.is_authenticated() {
                return Err(AppError::LoginRequired.into());
            }
            store.open_detail(id).await?;
            if let Some(product) = store.view().selected_product().cloned() {
                store.confirm_delete(product);
            }
            if !yes {
                print!("{}", views::render_modals(&store.view().modals));
                store.cancel_delete();
                return Ok(());
            }
            let deleted = store.delete_confirmed().await?;
            println!("Deleted product {}.", deleted);
        }
    }
    Ok(())
}

fn fill_form(store: &mut Storefront, fields: ProductArgs) -> Result<(), Error> {
    let form = store.form_mut();
    if let Some(name) = fields.name {
        form.name = name;
    }
    if let Some(price) = fields.price {
        form.price = price.to_string();
    }
    if let Some(description) = fields.description {
        form.description = description;
    }
    if let Some(category) = fields.category {
        form.category = category;
    }
    if let Some(stock) = fields.stock {
        form.stock = stock.to_string();
    }
    if let Some(active) = fields.active {
        form.is_active = active;
    }
    if fields.no_image {
        form.remove_image();
    }
    if let Some(path) = fields.image {
        let bytes = fs::read(&path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        form.attach_image(&file_name, bytes)?;
    }
    Ok(())
}

fn show_selected(store: &Storefront) {
    match store.view().selected_product() {
        Some(product) => print!(
            "{}",
            views::render_detail(product, &store.config().api_url, store.is_authenticated())
        ),
        None => println!("No product selected."),
    }
}

async fn cart(store: &mut Storefront, command: CartSubcommand) -> Result<(), Error> {
    store.open_cart();
    match command {
        CartSubcommand::Show => {}
        CartSubcommand::Add { id, quantity } => {
            store.open_detail(id).await?;
            let product = store
                .view()
                .selected_product()
                .cloned()
                .ok_or_else(|| format!("product {} not found", id))?;
            let in_cart = store.add_to_cart(&product, quantity)?;
            println!("{} now in cart: {}", product.name, in_cart);
        }
        CartSubcommand::Set { id, quantity } => store.cart_mut().update_quantity(id, quantity),
        CartSubcommand::Remove { id } => store.cart_mut().remove(id),
        CartSubcommand::Clear => store.cart_mut().clear(),
        CartSubcommand::Checkout => {
            store.checkout()?;
            let user = store.current_user();
            print!("{}", views::render_order_summary(store.cart(), user.as_ref()));
            println!("Run `storefront order --address <ADDRESS> --phone <PHONE>` to place the order.");
            return Ok(());
        }
    }
    print!("{}", views::render_cart(store.cart(), store.is_authenticated()));
    Ok(())
}

async fn orders(store: &mut Storefront, command: OrdersSubcommand) -> Result<(), Error> {
    match command {
        OrdersSubcommand::List => {
            let orders = store.order_history().await?;
            print!("{}", views::render_orders(&orders));
        }
        OrdersSubcommand::Show { id } => {
            let order = store.order(&id).await?;
            print!("{}", views::render_order(&order));
        }
        OrdersSubcommand::Cancel { id } => {
            store.cancel_order(&id).await?;
            println!("Order {} cancelled.", id);
        }
    }
    Ok(())
}

async fn open(store: &mut Storefront, args: OpenArgs) -> Result<(), Error> {
    let product = match args.product {
        Some(id) => {
            store.open_detail(id).await?;
            store.view().selected_product().cloned()
        }
        None => None,
    };

    let shown = store.navigate(args.page, product);
    if shown != args.page {
        println!("Redirected to {}.", shown);
    }

    match shown {
        Page::Home => {
            let authenticated = store.is_authenticated();
            let products = store.load_products().await?;
            print!("{}", views::render_home(products, authenticated));
        }
        Page::Detail => show_selected(store),
        Page::Form => print!(
            "{}",
            views::render_form(store.view().form(), store.view().is_editing())
        ),
        Page::Login => println!("Sign in with `storefront login --email <EMAIL> --password <PASSWORD>`."),
        Page::Register => println!(
            "Create an account with `storefront register --email <EMAIL> --password <PASSWORD> --confirm-password <PASSWORD>`."
        ),
        Page::Order => {
            if store.cart().is_empty() {
                println!("There is nothing in your cart to order.");
            } else {
                let user = store.current_user();
                print!("{}", views::render_order_summary(store.cart(), user.as_ref()));
            }
        }
        Page::Orders => {
            let orders = store.order_history().await?;
            print!("{}", views::render_orders(&orders));
        }
    }
    Ok(())
}
