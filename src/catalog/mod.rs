//! Media catalog collaborators.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Engine/Verifier │  ← Uses traits only
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │     traits      │  ← SearchApi, MediaApi, ThumbnailProbe, ContentOracle, Curator
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │ client/adapter  │  ← HTTP + DTO → domain conversion
//! └─────────────────┘
//! ```

mod adapter;
mod client;
pub mod curator;
pub mod domain;
mod dto;
pub mod traits;

pub use client::CatalogClient;
pub use curator::FileCurator;
pub use domain::{
    CatalogTrack, FailureReason, MediaDownload, ServiceError, StreamLocation, Suggestion,
};
pub use traits::{
    Catalog, ContentOracle, Curator, MediaApi, MediaDownloader, SearchApi, ThumbnailProbe,
};
