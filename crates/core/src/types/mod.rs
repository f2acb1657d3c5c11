//! Core types for Mercata.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod audit;
pub mod coupon;
pub mod email;
pub mod id;
pub mod role;

pub use audit::{AuditAction, AuditEntity};
pub use coupon::CouponType;
pub use email::{Email, EmailError};
pub use id::*;
pub use role::Role;
