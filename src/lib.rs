//! Sentinel Files - minimal HTTP/1.1 file server
//!
//! Core library: accept loop, bounded dispatcher, connection worker,
//! request-line parsing, path containment and response headers.

pub mod config;
pub mod files;
pub mod http;
pub mod server;
