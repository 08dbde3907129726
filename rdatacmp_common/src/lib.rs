pub mod config;
pub mod error;
pub mod scheme;
pub mod source;
pub mod types;

pub use config::*;
pub use error::*;
pub use scheme::*;
pub use source::*;
pub use types::*;
