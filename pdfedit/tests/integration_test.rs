#[path = "integration/common/mod.rs"]
mod common;

#[path = "integration/manager.rs"]
mod manager;

#[path = "integration/safe_save.rs"]
mod safe_save;

#[path = "integration/merge_split.rs"]
mod merge_split;

#[path = "integration/error_cases.rs"]
mod error_cases;
