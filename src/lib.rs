//! Hearth Gateway - smart-home fulfillment gateway
//!
//! Bridges a voice-assistant smart-home platform to a realtime device state
//! store:
//! - the four fulfillment intents (SYNC, QUERY, EXECUTE, DISCONNECT)
//! - OAuth account-linking stubs
//! - report-state pushes on every state-store write
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              Assistant platform                  │
//! │   SYNC │ QUERY │ EXECUTE │ DISCONNECT │ OAuth   │
//! └───────────────────┬─────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────┐
//! │               Hearth Gateway                     │
//! │  Intent handlers │ Trait table │ State store    │
//! └───────────────────┬─────────────────────────────┘
//!                     │ report state / request sync
//! ┌───────────────────▼─────────────────────────────┐
//! │              HomeGraph API                       │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod directory;
pub mod error;
pub mod homegraph;
pub mod notifier;
pub mod store;
pub mod traits;
pub mod upstream;

pub use config::Config;
pub use directory::{DeviceDescriptor, DeviceDirectory, DirectorySource};
pub use error::{Error, Result};
pub use homegraph::{HomeGraphClient, ReportStatePayload};
pub use notifier::Notifier;
pub use store::{StateChange, StateStore};
pub use traits::{DeviceTrait, StateObject};
pub use upstream::DeviceApiClient;
