//! mv-core: Relocation engine for the s3mv CLI
//!
//! This crate provides the core functionality for s3mv, including:
//! - Configuration and alias management
//! - Path parsing and normalization
//! - The ObjectStore trait the engine talks to
//! - Source resolution, prefix expansion and chunked server-side copy
//! - The Relocator that ties them into copy-then-delete moves
//!
//! This crate is independent of any specific S3 SDK, so the engine can be
//! tested against in-memory and mock stores.

pub mod alias;
pub mod config;
pub mod error;
pub mod multipart;
pub mod path;
pub mod relocate;
pub mod resolve;
pub mod traits;

#[cfg(test)]
mod testing;

pub use alias::{Alias, AliasManager, RetryConfig, TimeoutConfig};
pub use config::{Config, ConfigManager, TransferConfig};
pub use error::{Error, Result};
pub use multipart::{CopyPlan, PartPlan, copy_in_parts, plan_parts};
pub use path::{ObjectLocation, ObjectPath, RemotePath, parse_path};
pub use relocate::{MoveObserver, MoveOptions, MoveRequest, MoveSummary, MovedObject, Relocator};
pub use resolve::{Resolution, resolve};
pub use traits::{ByteRange, ObjectInfo, ObjectStore, PartResult};
