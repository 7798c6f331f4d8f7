pub mod chat;
pub mod servers;
pub mod tools;
