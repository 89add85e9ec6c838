pub mod auth_store;
