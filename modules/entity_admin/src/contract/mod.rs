pub mod client;
pub mod error;
pub mod model;

pub use client::EntityAdminApi;
pub use error::AdminError;
pub use model::*;
