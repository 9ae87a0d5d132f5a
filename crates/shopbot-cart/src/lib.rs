pub mod catalog;
pub mod checkout;
pub mod engine;
pub mod error;
pub mod knowledge;
pub mod types;

pub use catalog::{Catalog, Product, Review};
pub use engine::{CartEngine, CartSettings};
pub use error::{CartError, ErrorKind, ProductRef};
pub use types::*;
