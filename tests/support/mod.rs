//! In-process stand-in for the shop backend, served by actix-web on a random
//! local port. Handlers keep their state in memory and record what they
//! received so tests can inspect it.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::net::TcpListener;
use std::sync::{Arc, Mutex, MutexGuard};

use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;
use serde_json::{json, Value};
use storefront::models::Claims;
use storefront::storage::{LocalStorage, MemoryStorage};
use storefront::{Config, Storefront};
use uuid::Uuid;

const SECRET: &[u8] = b"fake-backend-secret";

pub const ADMIN_EMAIL: &str = "ada@shop.test";
pub const ADMIN_PASSWORD: &str = "Secret!1";

#[derive(Debug)]
struct Account {
    password: String,
    role: String,
}

#[derive(Debug, Default)]
pub struct BackendState {
    accounts: HashMap<String, Account>,
    pub products: BTreeMap<i64, Value>,
    pub orders: Vec<Value>,
    /// Answer 401 to every protected call, as if the session was revoked.
    pub reject_tokens: bool,
    pub last_bearer: Option<String>,
    /// Raw multipart bodies sent to create/update, in arrival order.
    pub product_bodies: Vec<String>,
    pub updated_ids: Vec<i64>,
}

impl BackendState {
    fn seeded() -> Self {
        let mut state = BackendState::default();
        state.accounts.insert(
            ADMIN_EMAIL.to_string(),
            Account {
                password: ADMIN_PASSWORD.to_string(),
                role: "admin".to_string(),
            },
        );
        state.products.insert(
            1,
            json!({
                "id": 1,
                "name": "Desk Lamp",
                "price": 19.5,
                "description": "Warm light for late nights",
                "category": "home",
                "stock": 3,
                "isActive": true,
                "image": "/uploads/lamp.png"
            }),
        );
        state.products.insert(
            2,
            json!({
                "_id": 2,
                "name": "Notebook",
                "price": 4,
                "description": "Dotted pages",
                "category": "office",
                "stock": 0,
                "isActive": true
            }),
        );
        state.products.insert(
            3,
            json!({
                "id": 3,
                "name": "Old Mug",
                "price": 7.25,
                "description": "Discontinued",
                "category": "kitchen",
                "stock": 5,
                "isActive": false,
                "image": ""
            }),
        );
        state
    }
}

type State = web::Data<Mutex<BackendState>>;

fn lock(state: &Mutex<BackendState>) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn issue_token(email: &str, role: &str) -> String {
    let now = Utc::now();
    let claims = Claims {
        email: email.to_string(),
        role: role.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(1)).timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).expect("token encodes")
}

fn unauthorized(message: &str) -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({ "success": false, "message": message }))
}

/// Checks the bearer token the way the real backend's middleware does and
/// returns the caller's email.
fn authorize(req: &HttpRequest, state: &State) -> Result<String, HttpResponse> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| unauthorized("Authorization header missing"))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized("Invalid authorization scheme"))?;

    let mut backend = lock(state);
    backend.last_bearer = Some(token.to_string());
    if backend.reject_tokens {
        return Err(unauthorized("Token revoked"));
    }

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(SECRET),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims.email)
    .map_err(|_| unauthorized("Invalid token"))
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

async fn register(state: State, input: web::Json<Credentials>) -> HttpResponse {
    let mut backend = lock(&state);
    if backend.accounts.contains_key(&input.email) {
        return HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": { "message": "Email already registered" }
        }));
    }
    backend.accounts.insert(
        input.email.clone(),
        Account {
            password: input.password.clone(),
            role: "user".to_string(),
        },
    );
    HttpResponse::Created().json(json!({ "success": true, "data": { "email": input.email } }))
}

async fn login(state: State, input: web::Json<Credentials>) -> HttpResponse {
    let backend = lock(&state);
    match backend.accounts.get(&input.email) {
        Some(account) if account.password == input.password => {
            let token = issue_token(&input.email, &account.role);
            HttpResponse::Ok().json(json!({ "success": true, "data": { "token": token } }))
        }
        _ => unauthorized("Invalid credentials"),
    }
}

#[derive(Deserialize)]
struct ListQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

async fn list_products(state: State, query: web::Query<ListQuery>) -> HttpResponse {
    let backend = lock(&state);
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).max(1);
    let data: Vec<&Value> = backend
        .products
        .values()
        .skip(((page - 1) * limit) as usize)
        .take(limit as usize)
        .collect();
    HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "data": data,
            "total": backend.products.len(),
            "page": page,
            "limit": limit
        }
    }))
}

async fn product_detail(state: State, id: web::Path<i64>) -> HttpResponse {
    match lock(&state).products.get(&id.into_inner()) {
        Some(product) => HttpResponse::Ok().json(json!({ "success": true, "data": product })),
        None => HttpResponse::NotFound().json(json!({
            "success": false,
            "error": { "message": "Product not found" }
        })),
    }
}

async fn create_product(state: State, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    if let Err(response) = authorize(&req, &state) {
        return response;
    }
    lock(&state)
        .product_bodies
        .push(String::from_utf8_lossy(&body).into_owned());
    HttpResponse::Created().json(json!({ "success": true, "message": "Product created" }))
}

async fn update_product(state: State, req: HttpRequest, id: web::Path<i64>, body: web::Bytes) -> HttpResponse {
    if let Err(response) = authorize(&req, &state) {
        return response;
    }
    let id = id.into_inner();
    let mut backend = lock(&state);
    if !backend.products.contains_key(&id) {
        return HttpResponse::NotFound().json(json!({ "success": false, "message": "Product not found" }));
    }
    backend.updated_ids.push(id);
    backend
        .product_bodies
        .push(String::from_utf8_lossy(&body).into_owned());
    HttpResponse::Ok().json(json!({ "success": true }))
}

async fn delete_product(state: State, req: HttpRequest, id: web::Path<i64>) -> HttpResponse {
    if let Err(response) = authorize(&req, &state) {
        return response;
    }
    match lock(&state).products.remove(&id.into_inner()) {
        Some(_) => HttpResponse::Ok().json(json!({ "success": true, "message": "Product deleted" })),
        None => HttpResponse::NotFound().json(json!({ "success": false, "message": "Product not found" })),
    }
}

async fn create_order(state: State, req: HttpRequest, order: web::Json<Value>) -> HttpResponse {
    let email = match authorize(&req, &state) {
        Ok(email) => email,
        Err(response) => return response,
    };
    let mut order = order.into_inner();
    let empty = order
        .get("products")
        .and_then(Value::as_array)
        .map_or(true, |lines| lines.is_empty());
    if empty {
        return HttpResponse::BadRequest().json(json!({
            "success": false,
            "message": "Order must contain products"
        }));
    }

    let id = Uuid::new_v4().simple().to_string();
    order["id"] = json!(id);
    order["userId"] = json!(email);
    order["createdAt"] = json!(Utc::now().to_rfc3339());
    lock(&state).orders.push(order);
    HttpResponse::Created().json(json!({ "success": true, "data": { "orderId": id } }))
}

async fn order_history(state: State, req: HttpRequest) -> HttpResponse {
    let email = match authorize(&req, &state) {
        Ok(email) => email,
        Err(response) => return response,
    };
    let backend = lock(&state);
    let mine: Vec<&Value> = backend
        .orders
        .iter()
        .filter(|order| order["userId"] == json!(email))
        .collect();
    HttpResponse::Ok().json(json!({ "success": true, "data": mine }))
}

async fn order_detail(state: State, req: HttpRequest, id: web::Path<String>) -> HttpResponse {
    if let Err(response) = authorize(&req, &state) {
        return response;
    }
    let id = id.into_inner();
    let backend = lock(&state);
    match backend.orders.iter().find(|order| order["id"] == json!(id)) {
        Some(order) => HttpResponse::Ok().json(json!({ "success": true, "data": order })),
        None => HttpResponse::NotFound().json(json!({ "success": false, "message": "Order not found" })),
    }
}

async fn cancel_order(state: State, req: HttpRequest, id: web::Path<String>) -> HttpResponse {
    if let Err(response) = authorize(&req, &state) {
        return response;
    }
    let id = id.into_inner();
    let mut backend = lock(&state);
    match backend.orders.iter_mut().find(|order| order["id"] == json!(id)) {
        Some(order) if order["status"] == json!("pending") => {
            order["status"] = json!("cancelled");
            order["updatedAt"] = json!(Utc::now().to_rfc3339());
            HttpResponse::Ok().json(json!({ "success": true }))
        }
        Some(_) => HttpResponse::BadRequest().json(json!({
            "success": false,
            "message": "Only pending orders can be cancelled"
        })),
        None => HttpResponse::NotFound().json(json!({ "success": false, "message": "Order not found" })),
    }
}

pub struct TestBackend {
    pub address: String,
    pub state: Arc<Mutex<BackendState>>,
}

impl TestBackend {
    pub fn state(&self) -> MutexGuard<'_, BackendState> {
        lock(&self.state)
    }

    pub fn config(&self) -> Config {
        Config::new(&self.address).expect("backend address is a valid URL")
    }

    /// A fresh storefront talking to this backend, with in-memory storage.
    pub fn storefront(&self) -> Storefront {
        self.storefront_with(Arc::new(MemoryStorage::new()))
    }

    pub fn storefront_with(&self, storage: Arc<dyn LocalStorage>) -> Storefront {
        Storefront::new(self.config(), storage).expect("storefront builds")
    }
}

/// Starts the fake backend on a random port. Must be called from inside a
/// tokio runtime.
pub fn spawn_backend() -> TestBackend {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind random port");
    let port = listener.local_addr().expect("listener has an address").port();

    let state = Arc::new(Mutex::new(BackendState::seeded()));
    let data = web::Data::from(state.clone());

    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/products/list", web::get().to(list_products))
            .route("/products/detail/{id}", web::get().to(product_detail))
            .route("/products/create", web::post().to(create_product))
            .route("/products/update/{id}", web::post().to(update_product))
            .route("/products/delete/{id}", web::delete().to(delete_product))
            .route("/orders/create", web::post().to(create_order))
            .route("/orders/history", web::get().to(order_history))
            .route("/orders/detail/{id}", web::get().to(order_detail))
            .route("/orders/cancel/{id}", web::patch().to(cancel_order))
    })
    .workers(1)
    .listen(listener)
    .expect("failed to listen")
    .run();

    tokio::spawn(server);

    TestBackend {
        address: format!("http://127.0.0.1:{}", port),
        state,
    }
}

/// Starts a server that answers every request with the same status and JSON
/// body, for replies the full fake backend never produces. Returns its base
/// URL.
pub fn spawn_canned(status: u16, body: Value) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind random port");
    let port = listener.local_addr().expect("listener has an address").port();
    let status = StatusCode::from_u16(status).expect("valid status code");

    let server = HttpServer::new(move || {
        let body = body.clone();
        App::new().default_service(web::to(move || {
            let body = body.clone();
            async move { HttpResponse::build(status).json(body) }
        }))
    })
    .workers(1)
    .listen(listener)
    .expect("failed to listen")
    .run();

    tokio::spawn(server);

    format!("http://127.0.0.1:{}", port)
}
