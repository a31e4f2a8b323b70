//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod ai_cost_rate_repo;
pub mod ai_usage_log_repo;
pub mod avatar_comment_repo;
pub mod avatar_image_repo;
pub mod avatar_repo;
pub mod token_repo;
pub mod user_notification_repo;

pub use ai_cost_rate_repo::AiCostRateRepo;
pub use ai_usage_log_repo::AiUsageLogRepo;
pub use avatar_comment_repo::AvatarCommentRepo;
pub use avatar_image_repo::AvatarImageRepo;
pub use avatar_repo::AvatarRepo;
pub use token_repo::TokenRepo;
pub use user_notification_repo::UserNotificationRepo;
