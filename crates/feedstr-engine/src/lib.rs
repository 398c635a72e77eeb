// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The feedstr synchronization engine.
//!
//! Tracked feeds live in an aggregate record owned by the service identity.
//! A single controller task polls them, republishes new items as signed
//! records under per-feed identities, and keeps the service's follow list
//! in step with what is tracked.

pub mod assets;
pub mod cleanup;
pub mod controller;
pub mod driver;
pub mod entity_store;
pub mod fanout;
pub mod follows;
pub mod policy;
pub mod publisher;
pub mod registry;
pub mod scheduler;
pub mod settings;
pub mod shutdown;

pub use controller::{Collaborators, Controller, ControllerHandle};
pub use driver::{IngestionDriver, TickReport};
pub use entity_store::{EntityStore, FeedSummary};
pub use fanout::FanOut;
pub use follows::{reconcile_follows, FollowAction, FollowReconciler};
pub use policy::{PolicyGate, Whitelist};
pub use registry::{ImportEntry, ImportOutcome, Registrar};
pub use scheduler::{is_due, Cadence};
pub use settings::EngineSettings;
pub use shutdown::install_signal_handler;
