// App Store wire types and the derived subscription model
pub mod notification;
pub mod receipt;
pub mod response;
pub mod status;
pub mod subscription;
pub mod timestamp;

pub use receipt::{InApp, LegacyInApp, PendingRenewal, Receipt, ReceiptRequest};
pub use response::{Environment, ReceiptPayload, ReceiptResponse};
pub use status::VerifyReceiptError;
pub use subscription::{AutoRenewable, StateMask, SubscriptionState};
pub use timestamp::ReceiptTime;
