pub mod upload_repository;
