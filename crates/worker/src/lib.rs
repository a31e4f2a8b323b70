//! Background worker that turns pending teacher avatars into finished
//! image sets.
//!
//! [`config::WorkerConfig`] reads the environment, [`services`] builds the
//! pipeline collaborators from it, and [`dispatcher::GenerationDispatcher`]
//! claims pending avatars and runs them one at a time.

pub mod config;
pub mod dispatcher;
pub mod services;
