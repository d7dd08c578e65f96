//! Aggregates module
pub mod cart;
pub mod coupon;
pub mod order;
pub mod product;

pub use cart::{Cart, CartError, CartItem, CartLine, CartView};
pub use coupon::{Coupon, CouponError};
pub use order::{Actor, LineItem, NewOrder, Order, OrderError, OrderStatus, PaymentMethod, PaymentStatus, Settlement, ShippingAddress};
pub use product::{CatalogRef, Product, ProductError, ProductView};
