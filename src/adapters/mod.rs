//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                  |
//! |----------------|--------------------|------------------------------|
//! | `config_file`  | ConfigPort         | JSON file on disk            |
//! | `geofence`     | GeofenceEngine     | Scripted boundary crossings  |
//! | `gnss`         | PositionSource     | Scripted position readings   |
//! | `log_sink`     | EventSink          | `log` facade / console       |
//! | `simulated`    | IndicatorActuator  | Simulated status light       |
//! |                | MessagingGateway   | Simulated SMS modem          |
//! | `time`         | Clock              | `std::time::Instant`         |
//!
//! `scenario` builds the scripts the simulated collaborators replay.

pub mod config_file;
pub mod geofence;
pub mod gnss;
pub mod log_sink;
pub mod scenario;
pub mod simulated;
pub mod time;
pub(super) mod utils;
