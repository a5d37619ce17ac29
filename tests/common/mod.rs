pub mod interop_service;
pub mod strategies;

pub use interop_service::*;
pub use strategies::*;
