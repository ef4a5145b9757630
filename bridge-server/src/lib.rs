// bridge-server/src/lib.rs
//! Firebase to Supabase token bridge.
//!
//! `POST /supabase-token` verifies a Firebase ID token and answers with a
//! Supabase JWT for the same uid. `GET /resolve-userid` maps a human-facing
//! user id to the email used for password sign-in.

pub mod api;
pub mod bridge;
pub mod directory;
pub mod error;
pub mod firebase;
pub mod google;
pub mod middleware;
pub mod resolver;
pub mod state;
pub mod utils;

pub use state::{AppState, StartupError};
