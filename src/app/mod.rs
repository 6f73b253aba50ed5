//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the geofence controller:
//! event routing, command dispatch with correlated completions, and
//! position reporting.  All interaction with vendor SDKs happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without a receiver, an LED or a modem.

pub mod commands;
pub mod dispatcher;
pub mod events;
pub mod ports;
pub mod registry;
pub mod reporter;
pub mod router;
pub mod service;
