//! Heartbeat timer.
//!
//! A periodic `esp_timer` whose callback raises
//! [`Event::HeartbeatDue`](crate::events::Event::HeartbeatDue) through
//! [`DeviceContext::on_heartbeat_tick`].  The callback runs in the ESP
//! timer task and never performs I/O.
//!
//! On simulation targets a background thread does the same, so host runs
//! see heartbeats at the configured interval.

use crate::context::DeviceContext;
use crate::drivers::hw_init::HwInitError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(not(target_os = "espidf"))]
use std::sync::Arc;
#[cfg(not(target_os = "espidf"))]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(not(target_os = "espidf"))]
use std::time::{Duration, Instant};

/// Owns the periodic heartbeat source.  Dropping it stops the timer.
pub struct HeartbeatTimer {
    #[cfg(target_os = "espidf")]
    handle: esp_timer_handle_t,
    #[cfg(not(target_os = "espidf"))]
    stop: Arc<AtomicBool>,
    #[cfg(not(target_os = "espidf"))]
    thread: Option<std::thread::JoinHandle<()>>,
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn heartbeat_cb(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the `&'static DeviceContext` passed to `start`.
    let ctx = unsafe { &*(arg as *const DeviceContext) };
    ctx.on_heartbeat_tick();
}

impl HeartbeatTimer {
    #[cfg(target_os = "espidf")]
    pub fn start(interval_ms: u32, ctx: &'static DeviceContext) -> Result<Self, HwInitError> {
        let args = esp_timer_create_args_t {
            callback: Some(heartbeat_cb),
            arg: core::ptr::from_ref(ctx).cast_mut().cast(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"heartbeat".as_ptr(),
            skip_unhandled_events: true,
        };
        let mut handle: esp_timer_handle_t = core::ptr::null_mut();
        // SAFETY: `args` outlives the call; `handle` is a valid out-param.
        esp!(unsafe { esp_timer_create(&args, &mut handle) })
            .map_err(|e| HwInitError::TimerFailed(e.code()))?;
        // SAFETY: `handle` was just created.
        if let Err(e) = esp!(unsafe { esp_timer_start_periodic(handle, u64::from(interval_ms) * 1_000) }) {
            unsafe { esp_timer_delete(handle) };
            return Err(HwInitError::TimerFailed(e.code()));
        }
        log::info!("hw_timer: heartbeat every {} ms", interval_ms);
        Ok(Self { handle })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn start(interval_ms: u32, ctx: &'static DeviceContext) -> Result<Self, HwInitError> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let period = Duration::from_millis(u64::from(interval_ms));
        let thread = std::thread::Builder::new()
            .name("heartbeat".into())
            .spawn(move || {
                let mut next = Instant::now() + period;
                while !flag.load(Ordering::Acquire) {
                    let now = Instant::now();
                    if now >= next {
                        ctx.on_heartbeat_tick();
                        next += period;
                    } else {
                        std::thread::park_timeout(next - now);
                    }
                }
            })
            .map_err(|_| HwInitError::TimerFailed(-1))?;
        log::info!("hw_timer(sim): heartbeat every {} ms", interval_ms);
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }
}

impl Drop for HeartbeatTimer {
    #[cfg(target_os = "espidf")]
    fn drop(&mut self) {
        // SAFETY: `handle` is valid for the lifetime of `self`.
        unsafe {
            esp_timer_stop(self.handle);
            esp_timer_delete(self.handle);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            let _ = thread.join();
        }
    }
}
