pub mod catalog;
pub mod comment;
pub mod error;
pub mod generation;
pub mod ledger;
pub mod mitigation;
pub mod pricing;
pub mod profile;
pub mod prompt;
pub mod storage;
pub mod types;
