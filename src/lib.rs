//! Spoke: a shared-bicycle fleet and rental state engine.
//!
//! The engine models each bicycle as a small state machine, extends
//! individual bicycles with runtime capabilities (GPS tracking, coded smart
//! lock, anti-theft alarm) through a decoration chain, prices trips via
//! pluggable per-plan strategies, fans status events out to subscribed
//! observers, and persists its records to flat CSV files.
//!
//! Construction is explicit: build a [`fleet::Fleet`] from a
//! [`config::FleetConfig`], hand it record stores, and drive it through
//! [`rental::RentalService`] and [`repair::RepairService`]. There is no
//! global state.
//!
//! # Environment Variables
//! Configuration can be customized via SPOKE_-prefixed environment
//! variables; see [`config::FleetConfig`].

pub mod bicycle; // Bicycle state machine and operation surface
pub mod capability; // GPS / smart-lock / anti-theft decorations
pub mod config; // Configuration management
pub mod error; // Error types and handling
pub mod fleet; // Live bicycle registry and capability attachment
pub mod location; // Static named-location directory
pub mod models; // Data structures and persisted record types
pub mod notify; // Observer fan-out for status events
pub mod pricing; // Per-plan pricing strategies
pub mod rental; // Rent/return transaction manager
pub mod repair; // Repair report workflow with auto-complete timer
pub mod store; // Replace-by-key record stores (CSV and in-memory)
