pub mod blob_store;
pub mod memory;
pub mod pg_post_repository;
pub mod post_repository;
