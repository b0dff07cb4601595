//! Core types for Atelier.
//!
//! This module provides type-safe wrappers for marketplace concepts.

pub mod brand;
pub mod category;
pub mod checkout;
pub mod id;
pub mod item;
pub mod price;
pub mod principal;
pub mod profile;

pub use brand::{BrandConfig, BrandError};
pub use category::{Category, CategoryError};
pub use checkout::{
    CheckoutError, CheckoutSession, ShoppingItem, StripeConfiguration, StripeSessionStatus,
};
pub use id::ItemId;
pub use item::{Item, PLACEHOLDER_IMAGE, fallback_description};
pub use price::{PriceCents, PriceError};
pub use principal::{Principal, PrincipalError};
pub use profile::{UserProfile, UserRole};
