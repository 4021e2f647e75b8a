//! schemals - Schema-driven Language Server Library
//!
//! Serves completion and document symbols for block-structured
//! configuration files over the Language Server Protocol. Analysis is
//! delegated to a decoder; the built-in one reads its vocabulary from a
//! core schema loaded in the background.

pub mod cli;
pub mod config;
pub mod error;
pub mod infra;
pub mod langserver;
pub mod models;
pub mod services;

pub use error::LangError;
