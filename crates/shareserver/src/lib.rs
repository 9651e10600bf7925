//! LAN file sharing server
//!
//! This crate keeps an in-memory registry of shared files and serves them
//! over HTTP: inline for embedding, as attachments for download, and as an
//! HTML preview page that picks a viewer based on the file's MIME type.
//!
//! Share links carry no authentication. Anyone who learns a share id can
//! fetch the file it points at until the share is revoked.

pub mod config;
mod error;
pub mod network;
pub mod preview;
mod registry;
mod server;
mod share_id;

pub use config::ShareConfig;
pub use error::ShareError;
pub use registry::{ShareEntry, ShareRegistry};
pub use server::{HistoryItem, ShareServer, SharedFile};
pub use share_id::ShareId;

/// Result type alias for share server operations
pub type Result<T> = std::result::Result<T, ShareError>;
