//! SkillForge Types - Shared domain types
//!
//! This crate contains the domain types used across SkillForge services:
//! - User identity
//! - Subscription tiers and lifecycle status
//! - Subscription records and usage summaries

pub mod id;
pub mod subscription;
pub mod tier;

pub use id::*;
pub use subscription::*;
pub use tier::*;
