//! Service layer.
//!
//! Each service owns the orchestration for one area; HTTP handlers only
//! parse input and serialize output.

pub mod cart_service;
pub mod checkout_service;
pub mod order_service;

pub use cart_service::CartService;
pub use checkout_service::CheckoutService;
pub use order_service::{IssueCreditNote, OrderService};
