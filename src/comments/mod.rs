pub mod repository;
pub mod threading;
