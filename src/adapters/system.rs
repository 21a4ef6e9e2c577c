//! Chip services: heap statistics and restart.
//!
//! On the host, the heap figure decays slowly from 300 KB so status
//! reports show plausible movement, and restart is recorded instead of
//! performed.

use log::error;

use crate::app::ports::SystemPort;

pub struct SystemAdapter {
    #[cfg(not(target_os = "espidf"))]
    sim_heap: core::cell::Cell<u32>,
    #[cfg(not(target_os = "espidf"))]
    sim_restarts: u32,
}

impl Default for SystemAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            sim_heap: core::cell::Cell::new(300 * 1024),
            #[cfg(not(target_os = "espidf"))]
            sim_restarts: 0,
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl SystemAdapter {
    /// Restart requests seen so far.
    pub fn sim_restarts(&self) -> u32 {
        self.sim_restarts
    }
}

impl SystemPort for SystemAdapter {
    #[cfg(target_os = "espidf")]
    fn free_heap(&self) -> u32 {
        unsafe { esp_idf_svc::sys::esp_get_free_heap_size() }
    }

    #[cfg(not(target_os = "espidf"))]
    fn free_heap(&self) -> u32 {
        let heap = self.sim_heap.get();
        self.sim_heap.set(heap.saturating_sub(16).max(200 * 1024));
        heap
    }

    #[cfg(target_os = "espidf")]
    fn restart(&mut self) {
        error!("System: restarting");
        log::logger().flush();
        unsafe { esp_idf_svc::sys::esp_restart() }
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self) {
        error!("System(sim): restart requested");
        self.sim_restarts += 1;
    }
}
