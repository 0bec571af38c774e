pub mod endpoints;
pub mod errors;
pub mod service;
pub mod types;

pub use errors::LinkServiceError;
