//! Pulse input bring-up.
//!
//! Configures the meter's pulse GPIO (input, pull-up, falling edge) and
//! registers the edge ISR through the per-pin GPIO ISR service.  The ISR
//! receives the [`DeviceContext`] as its argument pointer; it reads the
//! microsecond system timer and calls [`DeviceContext::on_edge`], nothing
//! more.  Called once from `main()` before the scheduler loop starts.

use core::fmt;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::info;

use crate::context::DeviceContext;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrAddFailed(i32),
    TimerFailed(i32),
}

impl fmt::Display for HwInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrAddFailed(rc) => write!(f, "GPIO ISR handler add failed (rc={})", rc),
            Self::TimerFailed(rc) => write!(f, "esp_timer setup failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

impl From<HwInitError> for crate::error::Error {
    fn from(_: HwInitError) -> Self {
        Self::Init("peripheral bring-up failed")
    }
}

// ── GPIO ISR ──────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn pulse_gpio_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the `&'static DeviceContext` registered in
    // `attach_pulse_input`; it is never freed.
    let ctx = unsafe { &*(arg as *const DeviceContext) };
    // SAFETY: esp_timer_get_time is a counter read; safe in ISR context.
    let now_ms = (unsafe { esp_timer_get_time() } / 1_000) as u64;
    ctx.on_edge(now_ms);
}

/// Configure `gpio` as the pulse input and route its falling edges into
/// `ctx`.
#[cfg(target_os = "espidf")]
pub fn attach_pulse_input(gpio: i32, ctx: &'static DeviceContext) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << gpio,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_NEGEDGE,
    };
    // SAFETY: plain register configuration from the single main task.
    esp!(unsafe { gpio_config(&cfg) }).map_err(|e| HwInitError::GpioConfigFailed(e.code()))?;

    // ESP_ERR_INVALID_STATE means the service is already installed.
    let ret = unsafe { gpio_install_isr_service(0) };
    if ret != ESP_OK as esp_err_t && ret != ESP_ERR_INVALID_STATE as esp_err_t {
        return Err(HwInitError::IsrInstallFailed(ret));
    }

    let arg = core::ptr::from_ref(ctx).cast_mut().cast::<core::ffi::c_void>();
    // SAFETY: `ctx` is 'static, and the handler only touches its
    // interrupt-safe fields.
    esp!(unsafe { gpio_isr_handler_add(gpio, Some(pulse_gpio_isr), arg) })
        .map_err(|e| HwInitError::IsrAddFailed(e.code()))?;
    esp!(unsafe { gpio_intr_enable(gpio) }).map_err(|e| HwInitError::IsrAddFailed(e.code()))?;

    info!("hw_init: pulse input on GPIO{} (pull-up, falling edge)", gpio);
    Ok(())
}

/// Simulation: there is no pin; tests and the host build drive
/// [`DeviceContext::on_edge`] directly.
#[cfg(not(target_os = "espidf"))]
pub fn attach_pulse_input(gpio: i32, _ctx: &'static DeviceContext) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): pulse input GPIO{} not attached", gpio);
    Ok(())
}
