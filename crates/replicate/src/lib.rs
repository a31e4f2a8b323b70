//! Replicate REST client for avatar image generation.
//!
//! [`api::ReplicateApi`] wraps the prediction endpoints;
//! [`client::ReplicateClient`] adds model selection, generation inputs
//! and completion polling on top of it.

pub mod api;
pub mod client;
pub mod input;
