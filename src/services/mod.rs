// Service modules
pub mod receipt_service;
pub mod transport;

pub use receipt_service::ReceiptService;
pub use transport::verify_receipt;
