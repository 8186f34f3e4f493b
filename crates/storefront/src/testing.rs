//! In-memory test doubles for the store and notifier traits.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use hoi_core::{
    AddressType, Email, OrderId, OrderStatus, OrderTotals, PaymentMethod, PaymentStatus,
    ProductId, Role, UserId,
};

use crate::db::{
    OrderStore, Pagination, PendingUserStore, ProductFilter, ProductStore, RepositoryError,
    UserStore,
};
use crate::models::{
    NewOrder, NewUser, Order, OrderCustomer, OrderItem, PendingUser, PostalAddress, Product,
    ProductDetails, ProductPrice, SavedAddress, SizeStock, User,
};
use crate::services::email::{EmailError, Notifier, RenderedEmail};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    pending: HashMap<String, PendingUser>,
    products: Vec<Product>,
    orders: Vec<Order>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn customer_of(&self, user_id: UserId) -> Option<OrderCustomer> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| OrderCustomer {
                id: u.id,
                name: u.name.clone(),
                email: u.email.clone(),
                phone: u.phone.clone(),
            })
    }
}

/// One in-memory database implementing every store trait.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn add_user(&self, email: &str, role: Role) -> User {
        let mut t = self.tables.lock().unwrap();
        let id = t.next_id();
        let user = User {
            id: UserId::new(id),
            email: Email::parse(email).unwrap(),
            password_hash: String::new(),
            role,
            name: "Asha Rawat".to_string(),
            phone: "9876543210".to_string(),
            address: String::new(),
            profile_image: String::new(),
            addresses: Vec::new(),
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        t.users.push(user.clone());
        user
    }

    pub fn add_product(&self, details: ProductDetails) -> Product {
        let mut t = self.tables.lock().unwrap();
        let id = t.next_id();
        let product = Product {
            id: ProductId::new(id),
            details,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        t.products.push(product.clone());
        product
    }

    pub fn add_pending(&self, pending: PendingUser) {
        let mut t = self.tables.lock().unwrap();
        t.pending.insert(pending.email.as_str().to_string(), pending);
    }

    pub fn user(&self, id: UserId) -> Option<User> {
        let t = self.tables.lock().unwrap();
        t.users.iter().find(|u| u.id == id).cloned()
    }

    pub fn product(&self, id: ProductId) -> Option<Product> {
        let t = self.tables.lock().unwrap();
        t.products.iter().find(|p| p.id == id).cloned()
    }

    pub fn remove_product(&self, id: ProductId) {
        let mut t = self.tables.lock().unwrap();
        t.products.retain(|p| p.id != id);
    }

    pub fn order(&self, id: OrderId) -> Option<Order> {
        let t = self.tables.lock().unwrap();
        t.orders.iter().find(|o| o.id == id).cloned()
    }

    pub fn order_count(&self) -> usize {
        self.tables.lock().unwrap().orders.len()
    }

    pub fn has_pending(&self, email: &str) -> bool {
        self.tables.lock().unwrap().pending.contains_key(email)
    }
}

fn paginate<T: Clone>(rows: &[T], page: Pagination) -> Vec<T> {
    rows.iter()
        .skip(usize::try_from(page.offset()).unwrap())
        .take(usize::try_from(page.limit).unwrap())
        .cloned()
        .collect()
}

fn matches_filter(p: &Product, f: &ProductFilter) -> bool {
    let d = &p.details;
    let lower = |s: &str| s.to_lowercase();
    f.search
        .as_deref()
        .is_none_or(|s| lower(&d.name).contains(&lower(s)))
        && (f.categories.is_empty()
            || d.category.as_ref().is_some_and(|c| f.categories.contains(c)))
        && (f.brands.is_empty()
            || d.brand
                .as_deref()
                .is_some_and(|b| f.brands.iter().any(|x| lower(x) == lower(b))))
        && f.gender.is_none_or(|g| g == d.gender)
        && f
            .color
            .as_deref()
            .is_none_or(|c| d.colors.iter().any(|x| lower(x) == lower(c)))
        && (f.sizes.is_empty() || d.sizes.iter().any(|s| f.sizes.contains(&s.label)))
        && f.status.is_none_or(|s| s == d.status)
        && f.is_featured.is_none_or(|v| v == d.is_featured)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.user(id))
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| &u.email == email).cloned())
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let t = self.tables.lock().unwrap();
        Ok(t.users
            .iter()
            .find(|u| {
                u.reset_token_hash.as_deref() == Some(token_hash)
                    && u.reset_token_expires_at.is_some_and(|exp| exp > now)
            })
            .cloned())
    }

    async fn create(&self, new: &NewUser) -> Result<User, RepositoryError> {
        let mut t = self.tables.lock().unwrap();
        if t.users.iter().any(|u| u.email == new.email) {
            return Err(RepositoryError::Conflict("email already exists".to_string()));
        }
        let id = t.next_id();
        let user = User {
            id: UserId::new(id),
            email: new.email.clone(),
            password_hash: new.password_hash.clone(),
            role: new.role,
            name: new.name.clone(),
            phone: new.phone.clone(),
            address: new.address.clone(),
            profile_image: String::new(),
            addresses: Vec::new(),
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().rev().cloned().collect())
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let mut t = self.tables.lock().unwrap();
        let before = t.users.len();
        t.users.retain(|u| u.id != id);
        for order in t.orders.iter_mut().filter(|o| o.user_id == Some(id)) {
            order.user_id = None;
            order.customer = None;
        }
        Ok(t.users.len() < before)
    }

    async fn save_addresses(
        &self,
        id: UserId,
        addresses: &[SavedAddress],
    ) -> Result<(), RepositoryError> {
        let mut t = self.tables.lock().unwrap();
        let user = t
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepositoryError::NotFound)?;
        user.addresses = addresses.to_vec();
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut t = self.tables.lock().unwrap();
        if let Some(user) = t.users.iter_mut().find(|u| u.id == id) {
            user.reset_token_hash = Some(token_hash.to_string());
            user.reset_token_expires_at = Some(expires_at);
        }
        Ok(())
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut t = self.tables.lock().unwrap();
        if let Some(user) = t.users.iter_mut().find(|u| u.id == id) {
            user.password_hash = password_hash.to_string();
            user.reset_token_hash = None;
            user.reset_token_expires_at = None;
        }
        Ok(())
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<(), RepositoryError> {
        let mut t = self.tables.lock().unwrap();
        let user = t
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepositoryError::NotFound)?;
        user.role = role;
        Ok(())
    }
}

#[async_trait]
impl PendingUserStore for MemoryStore {
    async fn upsert(&self, pending: &PendingUser) -> Result<(), RepositoryError> {
        self.add_pending(pending.clone());
        Ok(())
    }

    async fn find(&self, email: &Email) -> Result<Option<PendingUser>, RepositoryError> {
        let t = self.tables.lock().unwrap();
        Ok(t.pending.get(email.as_str()).cloned())
    }

    async fn record_failed_attempt(&self, email: &Email) -> Result<i32, RepositoryError> {
        let mut t = self.tables.lock().unwrap();
        let pending = t
            .pending
            .get_mut(email.as_str())
            .ok_or(RepositoryError::NotFound)?;
        pending.otp_attempts += 1;
        Ok(pending.otp_attempts)
    }

    async fn delete(&self, email: &Email) -> Result<(), RepositoryError> {
        let mut t = self.tables.lock().unwrap();
        t.pending.remove(email.as_str());
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.product(id))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let t = self.tables.lock().unwrap();
        Ok(t.products.iter().find(|p| p.details.slug == slug).cloned())
    }

    async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let t = self.tables.lock().unwrap();
        Ok(t.products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn list(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let t = self.tables.lock().unwrap();
        let matching: Vec<Product> = t
            .products
            .iter()
            .rev()
            .filter(|p| matches_filter(p, filter))
            .cloned()
            .collect();
        let total = i64::try_from(matching.len()).unwrap();
        Ok((paginate(&matching, page), total))
    }

    async fn list_by_brand(&self, brand: &str) -> Result<Vec<Product>, RepositoryError> {
        let t = self.tables.lock().unwrap();
        Ok(t.products
            .iter()
            .rev()
            .filter(|p| {
                p.details
                    .brand
                    .as_deref()
                    .is_some_and(|b| b.eq_ignore_ascii_case(brand))
            })
            .cloned()
            .collect())
    }

    async fn insert(&self, details: &ProductDetails) -> Result<Product, RepositoryError> {
        {
            let t = self.tables.lock().unwrap();
            if t.products.iter().any(|p| p.details.slug == details.slug) {
                return Err(RepositoryError::Conflict("slug already exists".to_string()));
            }
        }
        Ok(self.add_product(details.clone()))
    }

    async fn update(
        &self,
        id: ProductId,
        details: &ProductDetails,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut t = self.tables.lock().unwrap();
        if t
            .products
            .iter()
            .any(|p| p.id != id && p.details.slug == details.slug)
        {
            return Err(RepositoryError::Conflict("slug already exists".to_string()));
        }
        Ok(t.products.iter_mut().find(|p| p.id == id).map(|p| {
            p.details = details.clone();
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut t = self.tables.lock().unwrap();
        let before = t.products.len();
        t.products.retain(|p| p.id != id);
        Ok(t.products.len() < before)
    }

    async fn save_stock(
        &self,
        id: ProductId,
        total_stock: i32,
        sizes: &[SizeStock],
    ) -> Result<(), RepositoryError> {
        let mut t = self.tables.lock().unwrap();
        if let Some(p) = t.products.iter_mut().find(|p| p.id == id) {
            p.details.total_stock = total_stock;
            p.details.sizes = sizes.to_vec();
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert(&self, new: &NewOrder) -> Result<Order, RepositoryError> {
        let mut t = self.tables.lock().unwrap();
        let id = t.next_id();
        let order = Order {
            id: OrderId::new(id),
            order_number: new.order_number.clone(),
            user_id: Some(new.user_id),
            customer: t.customer_of(new.user_id),
            items: new.items.clone(),
            shipping_address: new.shipping_address.clone(),
            totals: new.totals,
            total_savings: new.totals.total_savings(),
            payment_method: new.payment_method,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Placed,
            notes: new.notes.clone(),
            gateway_order_id: None,
            gateway_payment_id: None,
            cancel_requested: false,
            cancel_reason: None,
            cancel_reason_note: None,
            cancel_requested_at: None,
            cancel_approved_at: None,
            cancelled_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        t.orders.push(order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.order(id))
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let t = self.tables.lock().unwrap();
        Ok(t.orders
            .iter()
            .find(|o| o.gateway_order_id.as_deref() == Some(gateway_order_id))
            .cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let t = self.tables.lock().unwrap();
        Ok(t.orders
            .iter()
            .rev()
            .filter(|o| o.user_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn list(
        &self,
        status: Option<OrderStatus>,
        page: Pagination,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let t = self.tables.lock().unwrap();
        let matching: Vec<Order> = t
            .orders
            .iter()
            .rev()
            .filter(|o| status.is_none_or(|s| s == o.status))
            .cloned()
            .collect();
        let total = i64::try_from(matching.len()).unwrap();
        Ok((paginate(&matching, page), total))
    }

    async fn save(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut t = self.tables.lock().unwrap();
        let slot = t
            .orders
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = order.clone();
        Ok(())
    }
}

/// Records every email instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, RenderedEmail)>>,
    attempts: AtomicUsize,
    fail: bool,
}

impl RecordingNotifier {
    /// A notifier whose every send fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, RenderedEmail)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent().into_iter().map(|(to, _)| to).collect()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, e)| e.subject).collect()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, email: &RenderedEmail) -> Result<(), EmailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EmailError::InvalidAddress(to.to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), email.clone()));
        Ok(())
    }
}

pub fn shipping_address() -> PostalAddress {
    PostalAddress {
        name: "Asha Rawat".to_string(),
        phone: "9876543210".to_string(),
        pincode: "248001".to_string(),
        address_line1: "12 Rajpur Road".to_string(),
        address_line2: None,
        city: "Dehradun".to_string(),
        state: "Uttarakhand".to_string(),
        landmark: None,
        address_type: AddressType::Home,
    }
}

/// Product with MRP 999, sale 799 and sizes S (2) and M (0).
pub fn bralette() -> ProductDetails {
    ProductDetails {
        name: "Lace Bralette".to_string(),
        slug: "lace-bralette".to_string(),
        brand: Some("Amante".to_string()),
        category: Some("bras".to_string()),
        main_image: "/uploads/products/bralette.jpg".to_string(),
        colors: vec!["Black".to_string()],
        sizes: vec![
            SizeStock {
                label: "S".to_string(),
                stock: 2,
            },
            SizeStock {
                label: "M".to_string(),
                stock: 0,
            },
        ],
        price: ProductPrice {
            mrp: Decimal::from(999),
            discount_percent: Decimal::from(20),
            sale: Some(Decimal::from(799)),
        },
        total_stock: 2,
        ..ProductDetails::default()
    }
}

/// A placed COD order for one bralette, owned by user 1.
pub fn sample_order() -> Order {
    let item = OrderItem {
        product_id: ProductId::new(10),
        name: "Lace Bralette".to_string(),
        image: "/uploads/products/bralette.jpg".to_string(),
        color: Some("Black".to_string()),
        size: Some("S".to_string()),
        mrp: Decimal::from(999),
        sale_price: Decimal::from(799),
        quantity: 1,
        line_total: Decimal::from(799),
        line_mrp_total: Decimal::from(999),
    };
    let totals = OrderTotals::from_lines([(item.line_mrp_total, item.line_total)]);

    Order {
        id: OrderId::new(1),
        order_number: "HOI2610161234".to_string(),
        user_id: Some(UserId::new(1)),
        customer: Some(OrderCustomer {
            id: UserId::new(1),
            name: "Asha Rawat".to_string(),
            email: Email::parse("asha@example.in").unwrap(),
            phone: "9876543210".to_string(),
        }),
        items: vec![item],
        shipping_address: shipping_address(),
        totals,
        total_savings: totals.total_savings(),
        payment_method: PaymentMethod::Cod,
        payment_status: PaymentStatus::Pending,
        status: OrderStatus::Placed,
        notes: None,
        gateway_order_id: None,
        gateway_payment_id: None,
        cancel_requested: false,
        cancel_reason: None,
        cancel_reason_note: None,
        cancel_requested_at: None,
        cancel_approved_at: None,
        cancelled_by: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Application state over a lazily connecting pool. Nothing touches the
/// database or the SMTP relay until a handler needs them.
pub fn test_state() -> crate::state::AppState {
    use secrecy::SecretString;

    use crate::config::{EmailConfig, StorefrontConfig};

    let config = StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/hoi_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 8000,
        frontend_url: "http://localhost:3000".to_string(),
        jwt_secret: SecretString::from("k3Jx9-Qm2vTz7LpR4wYc8NbF6hGd1sAe"),
        token_ttl_days: 7,
        upload_dir: std::env::temp_dir().join("hoi-test-uploads"),
        admin_emails: vec!["owner@hoi.in".to_string()],
        email: EmailConfig {
            smtp_host: "smtp.hoi.in".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: SecretString::from("smtp-test-password"),
            from_address: "orders@hoi.in".to_string(),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    };
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgres://localhost/hoi_test")
        .unwrap();
    crate::state::AppState::new(config, pool).unwrap()
}
