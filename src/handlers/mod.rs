pub mod chat;
pub mod group;
