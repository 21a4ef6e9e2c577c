//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the mock board.  All tests run on the host (x86_64) with no
//! real hardware required.

mod connectivity_tests;
mod mock_board;
mod pulse_stress_tests;
mod scheduler_tests;
