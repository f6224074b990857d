//! aigo - chat backend for learning English with an AI tutor
//!
//! Solo conversations with the tutor, and shared rooms where every message
//! is rewritten into English by the model before anyone sees it.
//! The server binary is in `main.rs`, admin CLI in `bin/aigo-admin.rs`.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod model;
pub mod paths;
pub mod prompt;
pub mod ratelimit;
pub mod server;
pub mod state;
pub mod text;
