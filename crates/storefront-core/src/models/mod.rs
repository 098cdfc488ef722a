//! Data models for storefront API payloads.
//!
//! Every server response is decoded into one of these explicit schemas at the
//! client boundary, so shape mismatches fail fast instead of leaking loosely
//! typed JSON into callers:
//!
//! - Auth types: `TokenPair`, `RefreshedAccess`, `Profile`, `Registration`
//! - Catalog: `Product`
//! - Cart: `Cart`, `CartItem`
//! - Orders: `Order`, `OrderItem`, `OrderStatus`

pub mod auth;
pub mod cart;
mod decimal;
pub mod order;
pub mod product;

pub use auth::{Credentials, Profile, RefreshRequest, RefreshedAccess, Registration, TokenPair};
pub use cart::{Cart, CartItem, CartItemUpdate, NewCartItem};
pub use order::{Order, OrderItem, OrderOwner, OrderStatus};
pub use product::Product;
