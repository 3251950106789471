//! # trigsync-domain
//!
//! Pure domain model for the trigsync synchronization system.
//!
//! ## Responsibilities
//! - Define the **script IR**: [`script::Script`], [`script::TriggerBlock`],
//!   and the [`script::Action`] tree (commands, timers, conditionals)
//! - Define **conditions**: left/operator/right comparisons and the
//!   operator vocabulary
//! - Convert **text → IR** ([`parse`]) and **IR → text** ([`serialize`])
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod parse;
pub mod script;
pub mod serialize;
