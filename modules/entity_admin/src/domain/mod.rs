pub mod error;
pub mod form;
pub mod repo;
pub mod service;
