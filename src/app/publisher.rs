//! Outbound messages: pulse events and status heartbeats.
//!
//! The publisher is stateless apart from its topics and boot timestamp.
//! It never retries: a refused publish is reported to the caller, who
//! decides (per [`PublishFailurePolicy`]) what happens to drained pulses.
//!
//! [`PublishFailurePolicy`]: crate::config::PublishFailurePolicy

use log::{info, warn};
use serde::Serialize;

use super::messages::{PulseEvent, StatusReport, liters};
use super::ports::{ClockPort, NetworkPort, SessionPort, SystemPort};
use super::topics::Topics;
use crate::context::DeviceContext;
use crate::error::{Error, Result};

pub struct MessagePublisher {
    topics: Topics,
    boot_ms: u64,
}

impl MessagePublisher {
    /// `boot_ms` is the clock reading taken at boot; uptime is measured
    /// from it.
    pub fn new(topics: Topics, boot_ms: u64) -> Self {
        Self { topics, boot_ms }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Publish a pulse event for `pulse_count` already-drained pulses.
    pub fn publish_pulses(
        &self,
        io: &mut (impl SessionPort + ClockPort),
        ctx: &DeviceContext,
        pulse_count: u32,
    ) -> Result<PulseEvent> {
        let id = &ctx.identity;
        let event = PulseEvent {
            controller_id: id.controller_id.as_str().into(),
            meter_name: id.meter_name.clone(),
            pulse_count,
            liters: liters(pulse_count, id.liters_per_pulse),
            timestamp: io.uptime_ms(),
        };

        match send(io, &self.topics.pulse, &event) {
            Ok(()) => {
                info!("Pulse: sent {} pulses ({}L)", event.pulse_count, event.liters);
                Ok(event)
            }
            Err(e) => {
                warn!("Pulse: failed to send {} pulses: {}", pulse_count, e);
                Err(e)
            }
        }
    }

    /// Build the current status report without publishing it.
    pub fn status_report(
        &self,
        io: &(impl NetworkPort + SystemPort + ClockPort),
        ctx: &DeviceContext,
    ) -> StatusReport {
        let id = &ctx.identity;
        let now = io.uptime_ms();
        let total = ctx.pulses.total();
        StatusReport {
            controller_id: id.controller_id.as_str().into(),
            status: "online".into(),
            ip_address: io
                .local_ip()
                .map_or_else(|| "0.0.0.0".into(), |ip| ip.to_string()),
            rssi: io.rssi().map_or(0, i32::from),
            free_heap: io.free_heap(),
            uptime: now.saturating_sub(self.boot_ms) / 1000,
            total_pulses: total,
            total_liters: liters(total, id.liters_per_pulse),
            firmware_version: id.firmware_version.clone(),
            timestamp: now,
        }
    }

    /// Publish a status heartbeat.  Never touches `pending`.
    pub fn publish_status(
        &self,
        io: &mut (impl SessionPort + NetworkPort + SystemPort + ClockPort),
        ctx: &DeviceContext,
    ) -> Result<StatusReport> {
        let report = self.status_report(&*io, ctx);
        match send(io, &self.topics.status, &report) {
            Ok(()) => {
                info!("Status: sent (total={} pulses)", report.total_pulses);
                Ok(report)
            }
            Err(e) => {
                warn!("Status: failed to send: {}", e);
                Err(e)
            }
        }
    }
}

fn send(io: &mut impl SessionPort, topic: &str, body: &impl Serialize) -> Result<()> {
    let payload = serde_json::to_vec(body).map_err(|_| Error::Codec("payload serialisation failed"))?;
    io.publish(topic, &payload).map_err(Error::Publish)
}
