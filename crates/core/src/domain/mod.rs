pub mod account;
pub mod discount;
pub mod quote;
pub mod unit;
