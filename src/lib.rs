#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::doc_markdown,
    clippy::cast_possible_truncation
)]

//! Stateless, AEAD-sealed cookie sessions for the timelog web service.

pub mod auth;
pub mod config;
pub mod gateway;
pub mod security;
pub mod session;

pub use auth::Identity;
pub use config::Config;
