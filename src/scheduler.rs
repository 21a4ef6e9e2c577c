//! Cooperative main loop.
//!
//! One pass of [`Scheduler::run_once`] performs, strictly in order:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  1. link        observe_link → ensure_connected (blocking)   │
//! │  2. transport   poll inbound → CommandHandler                │
//! │  3. pulses      PulseDue && Connected → drain → publish      │
//! │  4. heartbeat   HeartbeatDue → publish_status if Connected   │
//! │  5. yield       delay_ms(loop_yield_ms)                      │
//! └──────────────────────────────────────────────────────────────┘
//!          ▲                                       ▲
//!          │ EventFlags::raise                     │
//!  ┌───────┴──────┐                        ┌───────┴────────┐
//!  │ pulse ISR    │                        │ heartbeat timer│
//!  └──────────────┘                        └────────────────┘
//! ```
//!
//! The interrupt and timer contexts only flip flags and bump counters;
//! every byte of I/O happens here.

use log::{error, info, warn};

use crate::app::commands::CommandHandler;
use crate::app::connectivity::ConnectivityManager;
use crate::app::ports::Platform;
use crate::app::publisher::MessagePublisher;
use crate::config::{DeviceConfig, PublishFailurePolicy};
use crate::context::DeviceContext;
use crate::error::{Error, Result};
use crate::events::Event;

pub struct Scheduler<'a> {
    ctx: &'a DeviceContext,
    link: ConnectivityManager,
    publisher: MessagePublisher,
    commands: CommandHandler,
    loop_yield_ms: u32,
    on_publish_failure: PublishFailurePolicy,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        ctx: &'a DeviceContext,
        link: ConnectivityManager,
        publisher: MessagePublisher,
        loop_yield_ms: u32,
        on_publish_failure: PublishFailurePolicy,
    ) -> Self {
        Self {
            ctx,
            link,
            publisher,
            commands: CommandHandler::new(),
            loop_yield_ms,
            on_publish_failure,
        }
    }

    /// Wire every component from a validated configuration.
    /// `boot_ms` is the clock reading uptime is measured from.
    pub fn from_config(cfg: &DeviceConfig, ctx: &'a DeviceContext, boot_ms: u64) -> Result<Self> {
        let topics = cfg.topics(&ctx.identity.controller_id)?;
        let link = ConnectivityManager::new(
            cfg.join_policy(),
            cfg.mqtt_retry_delay_ms,
            topics.command.clone(),
        );
        info!(
            "Scheduler: pulse={} status={} command={}",
            topics.pulse, topics.status, topics.command
        );
        Ok(Self::new(
            ctx,
            link,
            MessagePublisher::new(topics, boot_ms),
            cfg.loop_yield_ms,
            cfg.publish_failure,
        ))
    }

    pub fn link(&self) -> &ConnectivityManager {
        &self.link
    }

    pub fn publisher(&self) -> &MessagePublisher {
        &self.publisher
    }

    /// Run forever.  Returns only on a non-recoverable error, which on
    /// real hardware is preceded by a restart and so never observed.
    pub fn run(&mut self, io: &mut impl Platform) -> Error {
        info!("Scheduler: entering main loop");
        loop {
            if let Err(e) = self.run_once(io) {
                if !e.is_recoverable() {
                    error!("Scheduler: stopping: {}", e);
                    return e;
                }
                warn!("Scheduler: {}", e);
            }
        }
    }

    /// One pass of the loop.
    pub fn run_once(&mut self, io: &mut impl Platform) -> Result<()> {
        self.link.observe_link(&*io);
        if !self.link.is_connected() {
            self.link.ensure_connected(io, self.ctx, &self.publisher)?;
        }

        self.service_transport(io);
        self.flush_pulses(io);

        // A tick while disconnected is dropped; reconnecting publishes
        // its own heartbeat.
        if self.ctx.events.take(Event::HeartbeatDue) && self.link.is_connected() {
            let _ = self.publisher.publish_status(io, self.ctx);
        }

        io.delay_ms(self.loop_yield_ms);
        Ok(())
    }

    fn service_transport(&mut self, io: &mut impl Platform) {
        while let Some(msg) = io.poll() {
            let raw = msg.payload.as_slice();
            info!(
                "Command: received on {}: {}",
                msg.topic,
                String::from_utf8_lossy(raw)
            );
            if msg.topic.as_str() != self.publisher.topics().command {
                warn!("Command: ignoring message on unexpected topic {}", msg.topic);
                continue;
            }
            if let Err(e) = self.commands.handle(raw, io, self.ctx, &self.publisher) {
                warn!("Command: dropped ({}): {}", e, String::from_utf8_lossy(raw));
            }
        }
    }

    fn flush_pulses(&mut self, io: &mut impl Platform) {
        if !self.link.is_connected() || !self.ctx.events.is_pending(Event::PulseDue) {
            return;
        }

        // Clear before draining: an edge landing after the drain re-raises
        // the flag and is picked up next pass.
        self.ctx.events.clear(Event::PulseDue);
        let count = self.ctx.pulses.drain();
        if count == 0 {
            return;
        }

        if self.publisher.publish_pulses(io, self.ctx, count).is_err()
            && self.on_publish_failure == PublishFailurePolicy::Requeue
        {
            self.ctx.pulses.requeue(count);
            self.ctx.events.raise(Event::PulseDue);
            info!("Pulse: requeued {} pulses", count);
        }
    }
}
