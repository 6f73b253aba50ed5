//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock or simulated adapters.  All tests run on the host with no
//! receiver, status light or modem required.

mod controller_tests;
mod mock_hw;
