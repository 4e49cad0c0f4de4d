pub mod pricing;
pub mod service;
