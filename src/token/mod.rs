pub mod claim;
pub mod service;
pub mod store;
