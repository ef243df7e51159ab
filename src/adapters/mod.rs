pub mod api_errors;
pub mod contact;
pub mod donations;
pub mod paypal;
pub mod ticket_orders;
pub mod tickets;
pub mod validate;
pub mod webhook;
