//! tubeup MCP server
//!
//! Exposes video upload, authentication status, category listing and
//! credential setup as Model Context Protocol tools over stdio.

pub mod handlers;
pub mod server;
pub mod tools;

pub use handlers::YouTubeTools;
pub use server::TubeupService;
