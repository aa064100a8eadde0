//! Dictionary-mediated translation.
//!
//! Detects known dictionary terms in free text, shields them from an
//! external translation service with `{{...}}` markers, and substitutes the
//! dictionary's own translation for each target language afterwards.

pub mod config;
pub mod db;
pub mod editor;
pub mod pipeline;
pub mod retry;
pub mod scheduler;
pub mod security;
pub mod server;
pub mod store;
pub mod terms;
pub mod translation;
