pub mod engagement;
pub mod repository;
