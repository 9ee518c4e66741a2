// src/config/mod.rs

//! Plan description files.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a file from disk.
//! - `validate.rs`: references and hard-edge cycles.
//! - `convert.rs`: wiring a validated file into a `PlanBuilder`.

pub mod convert;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{PlanFile, PlanSection, RawPlanFile, RequestSection, TaskConfig};
