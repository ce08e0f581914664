pub mod token;
pub mod unit;

pub use token::{IssuedToken, TokenRecord};
pub use unit::Unit;
