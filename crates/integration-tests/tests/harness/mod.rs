#![allow(dead_code)]

pub mod config;
pub mod fixtures;
pub mod identity;
pub mod mock_llm;
pub mod server;
