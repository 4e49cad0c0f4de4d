pub mod fees;
pub mod service;
