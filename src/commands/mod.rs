pub mod clean;
pub mod config;
pub mod init;
pub mod list;
pub mod render;
pub mod status;
