pub mod access;
pub mod common;
pub mod files;
pub mod reports;
pub mod users;
