pub mod auth;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod middleware;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod utils;

pub use engine::FilesystemEngine;
pub use server::Server;
