// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity derivation and record signing.
//!
//! Every tracked feed signs its records with a keypair derived from the
//! feed URL and a server-wide secret, so re-registering a feed yields the
//! same identity without storing key material anywhere else.

pub mod derive;
pub mod keypair;
pub mod record;

pub use derive::derive_identity;
pub use keypair::FeedKeypair;
pub use record::{record_id, verify_record};
