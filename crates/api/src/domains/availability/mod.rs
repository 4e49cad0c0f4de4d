pub mod grid;
pub mod service;
