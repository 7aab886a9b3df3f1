pub mod account;
pub mod ticker;
pub mod trade;
