// Library exports for testing and reuse
pub mod config;
pub mod error;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use crate::config::{Config, IAPConfig};
pub use crate::error::{ReceiptError, Result};
pub use crate::models::{AutoRenewable, InApp, StateMask, SubscriptionState, VerifyReceiptError};
pub use crate::services::ReceiptService;
