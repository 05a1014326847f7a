//! REST API handlers

pub mod access;
pub mod health;
pub mod subscription;
pub mod usage;
pub mod webhook;

pub use access::*;
pub use health::*;
pub use subscription::*;
pub use usage::*;
pub use webhook::*;
