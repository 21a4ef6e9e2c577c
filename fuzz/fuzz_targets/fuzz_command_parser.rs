//! Fuzz target: `Command::parse`
//!
//! Drives arbitrary payloads, as the broker could deliver them on the
//! command topic, into the decoder and asserts that it never panics and
//! that decoding is deterministic.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use flowmeter::app::commands::Command;
use flowmeter::app::ports::InboundMessage;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Anything larger never reaches the parser on the device.
    let Some(msg) = InboundMessage::new("water_meter/command/fuzz", data) else {
        return;
    };

    assert_eq!(Command::parse(&msg.payload), Command::parse(data));
});
