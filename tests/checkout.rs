//! Checkout, settlement and address-book rules that live in SQL. Each test
//! runs against a fresh migrated database provided by `sqlx::test`.

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use toolbear::{
    api,
    config::StoreSettings,
    db::{self, addresses::AddressInput},
    domain::aggregates::{LineItem, NewOrder, Order, PaymentMethod, ShippingAddress},
    domain::pricing::PriceBreakdown,
    domain::value_objects::CouponCode,
    identity::USER_ID_HEADER,
    publisher::EventPublisher,
    state::AppState,
    EcommerceError,
};

fn app(pool: &PgPool) -> Router {
    let settings = StoreSettings { payment_key_secret: "test-secret".into(), ..StoreSettings::default() };
    api::router(AppState::new(pool.clone(), EventPublisher::disabled(), settings))
}

async fn call(pool: &PgPool, user: Uuid, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri).header(USER_ID_HEADER, user.to_string());
    let request = match body {
        Some(body) => builder.header("content-type", "application/json").body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();
    let response = app(pool).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn seed_product(pool: &PgPool, name: &str, price: i64, stock: i32) -> Uuid {
    let category = Uuid::new_v4();
    let brand = Uuid::new_v4();
    sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2)")
        .bind(category)
        .bind(format!("{name} tools"))
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO brands (id, name) VALUES ($1, $2)")
        .bind(brand)
        .bind(format!("{name} works"))
        .execute(pool)
        .await
        .unwrap();
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO products (id, sku, name, category_id, brand_id, price, stock) VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(id)
    .bind(format!("SKU-{name}"))
    .bind(name)
    .bind(category)
    .bind(brand)
    .bind(Decimal::new(price, 0))
    .bind(stock)
    .execute(pool)
    .await
    .unwrap();
    id
}

async fn seed_wallet(pool: &PgPool, user: Uuid, balance: i64) {
    sqlx::query("INSERT INTO wallets (user_id, balance) VALUES ($1, $2)")
        .bind(user)
        .bind(Decimal::new(balance, 0))
        .execute(pool)
        .await
        .unwrap();
}

async fn seed_coupon(pool: &PgPool, code: &str, usage_limit: Option<i32>) {
    sqlx::query(
        "INSERT INTO coupons (id, code, discount_percent, max_discount, usage_limit, expires_at) \
         VALUES ($1, $2, 10, 50, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(code)
    .bind(usage_limit)
    .bind(Utc::now() + Duration::days(30))
    .execute(pool)
    .await
    .unwrap();
}

fn workshop(name: &str) -> AddressInput {
    AddressInput {
        name: name.into(),
        phone: "9876543210".into(),
        line1: "12 Anvil Lane".into(),
        line2: None,
        city: "Pune".into(),
        state: "MH".into(),
        pincode: "411001".into(),
        country: "India".into(),
        is_default: false,
    }
}

async fn seed_address(pool: &PgPool, user: Uuid) -> Uuid {
    let mut conn = pool.acquire().await.unwrap();
    db::addresses::create(&mut conn, user, &workshop("Workshop")).await.unwrap().id
}

async fn stock_of(pool: &PgPool, product: Uuid) -> i32 {
    sqlx::query_scalar("SELECT stock FROM products WHERE id = $1").bind(product).fetch_one(pool).await.unwrap()
}

async fn count(pool: &PgPool, sql: &str, user: Uuid) -> i64 {
    sqlx::query_scalar(sql).bind(user).fetch_one(pool).await.unwrap()
}

async fn add_to_cart(pool: &PgPool, user: Uuid, product: Uuid, quantity: u32) {
    let body = json!({ "product_id": product, "quantity": quantity });
    let (status, _) = call(pool, user, Method::POST, "/api/v1/cart/items", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn checkout(pool: &PgPool, user: Uuid, address: Uuid, method: &str, coupon: Option<&str>) -> (StatusCode, Value) {
    let body = json!({ "address_id": address, "payment_method": method, "coupon_code": coupon });
    call(pool, user, Method::POST, "/api/v1/orders", Some(body)).await
}

#[sqlx::test(migrations = "./migrations")]
async fn test_wallet_checkout_takes_stock_and_clears_cart(pool: PgPool) {
    let user = Uuid::new_v4();
    let drill = seed_product(&pool, "Drill", 100, 5).await;
    seed_wallet(&pool, user, 1000).await;
    let address = seed_address(&pool, user).await;
    add_to_cart(&pool, user, drill, 2).await;

    let (status, order) = checkout(&pool, user, address, "wallet", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "placed");
    assert_eq!(order["payment_status"], "paid");

    assert_eq!(stock_of(&pool, drill).await, 3);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM cart_items WHERE user_id = $1", user).await, 0);
    assert_eq!(db::wallet::balance(&pool, user).await.unwrap(), Decimal::new(800, 0));
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM wallet_transactions WHERE user_id = $1 AND kind = 'debit'", user).await,
        1
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_wallet_checkout_without_funds_writes_nothing(pool: PgPool) {
    let user = Uuid::new_v4();
    let saw = seed_product(&pool, "Saw", 100, 5).await;
    seed_wallet(&pool, user, 50).await;
    let address = seed_address(&pool, user).await;
    add_to_cart(&pool, user, saw, 1).await;

    let (status, body) = checkout(&pool, user, address, "wallet", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Insufficient wallet balance");

    assert_eq!(stock_of(&pool, saw).await, 5);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM orders WHERE user_id = $1", user).await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM wallet_transactions WHERE user_id = $1", user).await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM cart_items WHERE user_id = $1", user).await, 1);
    assert_eq!(db::wallet::balance(&pool, user).await.unwrap(), Decimal::new(50, 0));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_take_stock_refuses_more_than_left(pool: PgPool) {
    let clamp = seed_product(&pool, "Clamp", 40, 2).await;

    let mut tx = pool.begin().await.unwrap();
    assert!(!db::catalog::take_stock(&mut tx, clamp, 3).await.unwrap());
    assert!(db::catalog::take_stock(&mut tx, clamp, 2).await.unwrap());
    assert!(!db::catalog::take_stock(&mut tx, clamp, 1).await.unwrap());
    tx.rollback().await.unwrap();
    assert_eq!(stock_of(&pool, clamp).await, 2);

    // Checkout turns a lost race into a conflict.
    assert_eq!(EcommerceError::InsufficientInventory("Clamp".into()).status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cancel_paid_order_restocks_and_refunds(pool: PgPool) {
    let user = Uuid::new_v4();
    let grinder = seed_product(&pool, "Grinder", 250, 4).await;
    seed_wallet(&pool, user, 1000).await;
    let address = seed_address(&pool, user).await;
    add_to_cart(&pool, user, grinder, 2).await;

    let (status, order) = checkout(&pool, user, address, "wallet", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stock_of(&pool, grinder).await, 2);
    assert_eq!(db::wallet::balance(&pool, user).await.unwrap(), Decimal::new(500, 0));

    let uri = format!("/api/v1/orders/{}/cancel", order["id"].as_str().unwrap());
    let (status, cancelled) = call(&pool, user, Method::POST, &uri, Some(json!({ "reason": "ordered twice" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["payment_status"], "refunded");

    assert_eq!(stock_of(&pool, grinder).await, 4);
    assert_eq!(db::wallet::balance(&pool, user).await.unwrap(), Decimal::new(1000, 0));
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM wallet_transactions WHERE user_id = $1 AND kind = 'credit'", user).await,
        1
    );

    let (status, _) = call(&pool, user, Method::POST, &uri, Some(json!({ "reason": "again" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(db::wallet::balance(&pool, user).await.unwrap(), Decimal::new(1000, 0));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_redeem_guards_usage_limit_and_repeat_use(pool: PgPool) {
    let user = Uuid::new_v4();
    let level = seed_product(&pool, "Level", 100, 10).await;
    seed_coupon(&pool, "ONCE10", Some(1)).await;
    seed_coupon(&pool, "ALWAYS10", None).await;
    let address = seed_address(&pool, user).await;
    add_to_cart(&pool, user, level, 2).await;

    let (status, order) = checkout(&pool, user, address, "cod", Some("once10")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["coupon_code"], "ONCE10");
    let order_id: Uuid = order["id"].as_str().unwrap().parse().unwrap();

    let once = db::coupons::find_by_code(&pool, &CouponCode::new("ONCE10").unwrap()).await.unwrap().unwrap();
    assert_eq!(once.used_count, 1);
    let mut tx = pool.begin().await.unwrap();
    let err = db::coupons::redeem(&mut tx, &once, Uuid::new_v4(), order_id).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);
    tx.rollback().await.unwrap();

    let always = db::coupons::find_by_code(&pool, &CouponCode::new("ALWAYS10").unwrap()).await.unwrap().unwrap();
    let mut tx = pool.begin().await.unwrap();
    db::coupons::redeem(&mut tx, &always, user, order_id).await.unwrap();
    tx.commit().await.unwrap();
    let mut tx = pool.begin().await.unwrap();
    let err = db::coupons::redeem(&mut tx, &always, user, order_id).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);
    assert_eq!(err.to_string(), "Coupon already used");
    tx.rollback().await.unwrap();
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM coupon_usages WHERE user_id = $1", user).await, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_deleting_default_address_promotes_newest(pool: PgPool) {
    let user = Uuid::new_v4();
    let mut conn = pool.acquire().await.unwrap();
    let home = db::addresses::create(&mut conn, user, &workshop("Home")).await.unwrap();
    let _shed = db::addresses::create(&mut conn, user, &workshop("Shed")).await.unwrap();
    let site = db::addresses::create(&mut conn, user, &workshop("Site")).await.unwrap();
    assert!(home.is_default);
    assert!(!site.is_default);

    db::addresses::delete(&mut conn, user, home.id).await.unwrap();
    let remaining = db::addresses::list(&mut *conn, user).await.unwrap();
    assert_eq!(remaining.len(), 2);
    assert_eq!(remaining.iter().filter(|a| a.is_default).count(), 1);
    assert_eq!(remaining[0].id, site.id);
    assert!(remaining[0].is_default);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_taken_order_number_is_redrawn(pool: PgPool) {
    let plane = seed_product(&pool, "Plane", 60, 10).await;
    let price = Decimal::new(60, 0);
    let new_order = || NewOrder {
        order_number: "TB-00000042".into(),
        user_id: Uuid::new_v4(),
        payment_method: PaymentMethod::Cod,
        payment_ref: None,
        pricing: PriceBreakdown::from_lines([(price, price)]),
        coupon_code: None,
        shipping_address: ShippingAddress::default(),
        items: vec![LineItem {
            product_id: plane,
            product_name: "Plane".into(),
            unit_price: price,
            selling_price: price,
            quantity: 1,
            line_total: price,
        }],
    };
    let limit = Decimal::new(1000, 0);

    let mut conn = pool.acquire().await.unwrap();
    let mut first = Order::place(new_order(), limit).unwrap();
    db::orders::insert(&mut conn, &mut first).await.unwrap();
    let mut second = Order::place(new_order(), limit).unwrap();
    db::orders::insert(&mut conn, &mut second).await.unwrap();

    assert_eq!(first.order_number(), "TB-00000042");
    assert_ne!(second.order_number(), "TB-00000042");
    let stored = db::orders::find(&mut conn, second.id(), None, false).await.unwrap();
    assert_eq!(stored.order_number(), second.order_number());
}
