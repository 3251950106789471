//! # trigsync-app
//!
//! Application layer — the synchronization engines and **port definitions**
//! (traits).
//!
//! ## Responsibilities
//! - Define the **surface port** ([`ports::Surface`]) — the capability
//!   interface (`locate`, `click`, `set_value`, `signal`, waits) that
//!   adapters implement against the real external application
//! - Define the **progress port** ([`ports::ProgressSink`]) for UI-only
//!   completed/total signals
//! - Run the [`applier::Applier`] (IR → surface) and the
//!   [`extractor::Extractor`] (surface → IR)
//! - Provide the shared [`wait::wait_until`] polling primitive and the
//!   data-driven [`selectors`] locator tables
//!
//! ## Dependency rule
//! Depends on `trigsync-domain` only (plus `tokio::sync`/`tokio::time` for
//! channels and timers). Never imports adapter crates. Adapters depend on
//! *this* crate, not the reverse.

pub mod applier;
pub mod error;
pub mod extractor;
pub mod ports;
pub mod progress;
pub mod selectors;
pub mod wait;
