//! geosignal library.
//!
//! Geofence-triggered actuation: boundary crossings for one subject drive
//! a status light and an SMS notification, with every asynchronous
//! completion correlated back on a single event loop.  Exposes the
//! pure-logic modules for integration testing.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod geo;
pub mod runtime;
