//! Footman core library: parameter schemas, prompting, dynamic forms,
//! script plumbing, and LLM access used by both the CLI and desktop
//! applications.

pub mod coerce;
pub mod config;
pub mod form;
pub mod init;
pub mod llm;
pub mod navigator;
pub mod prompt;
pub mod registry;
pub mod schema;
pub mod script;
pub mod scripts;
