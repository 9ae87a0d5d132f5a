pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::ShopConfig;
pub use error::{Result, ShopError};
pub use events::{ClientMessage, ServerEvent, ShoppingData};
pub use types::*;
