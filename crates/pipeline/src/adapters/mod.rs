//! Port implementations over the concrete clients.
//!
//! - [`db`]: PostgreSQL repositories, pricing with fallback, token ledger.
//! - [`replicate`]: image generation and background removal.
//! - [`openai`]: comment chat completions.
//! - [`cloud`]: S3/local storage and the HTTP fetcher.
//! - [`events`]: notifications over the in-process event bus.

pub mod cloud;
pub mod db;
pub mod events;
pub mod openai;
pub mod replicate;
