//! Row structs and insert DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row and, where rows are inserted, a create DTO.

pub mod ai_cost;
pub mod avatar;
pub mod avatar_comment;
pub mod avatar_image;
pub mod notification;
pub mod token;
