//! WiFi station-mode adapter.
//!
//! Implements [`NetworkPort`], the hexagonal boundary for the network
//! join.  Each call to [`NetworkPort::join`] is a single attempt; the
//! retry budget and the restart on exhaustion belong to
//! [`ConnectivityManager`](crate::app::connectivity::ConnectivityManager).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.

use core::net::Ipv4Addr;

use log::{info, warn};

use crate::app::ports::{NetworkError, NetworkPort};

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

/// Space through tilde; SSIDs outside this range are rejected.
fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), NetworkError> {
    if ssid.is_empty() || ssid.len() > 32 {
        return Err(NetworkError::InvalidSsid);
    }
    if !is_printable_ascii(ssid) {
        return Err(NetworkError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), NetworkError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(NetworkError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    #[cfg(target_os = "espidf")]
    driver: BlockingWifi<EspWifi<'static>>,
    /// Simulation: link flag flipped by join / `sim_drop`.
    #[cfg(not(target_os = "espidf"))]
    sim_joined: bool,
    /// Simulation: number of upcoming join attempts that fail.
    #[cfg(not(target_os = "espidf"))]
    sim_failures: u32,
    /// Simulation: counts platform_join() calls.
    #[cfg(not(target_os = "espidf"))]
    sim_attempts: u32,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(driver: BlockingWifi<EspWifi<'static>>) -> Self {
        Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            driver,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            sim_joined: false,
            sim_failures: 0,
            sim_attempts: 0,
        }
    }

    /// Validate and store the station credentials.  An empty password
    /// selects an open network.
    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), NetworkError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|()| NetworkError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|()| NetworkError::InvalidPassword)?;
        info!("WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_join(&mut self) -> Result<(), NetworkError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| NetworkError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| NetworkError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        self.driver.set_configuration(&config).map_err(|e| {
            warn!("WiFi: set_configuration failed: {}", e);
            NetworkError::ConnectionFailed
        })?;
        if !self.driver.is_started().unwrap_or(false) {
            self.driver.start().map_err(|e| {
                warn!("WiFi: start failed: {}", e);
                NetworkError::ConnectionFailed
            })?;
        }
        self.driver.connect().map_err(|e| {
            warn!("WiFi: connect failed: {}", e);
            NetworkError::AuthFailed
        })?;
        self.driver.wait_netif_up().map_err(|e| {
            warn!("WiFi: no address: {}", e);
            NetworkError::ConnectionFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_join(&mut self) -> Result<(), NetworkError> {
        self.sim_attempts = self.sim_attempts.wrapping_add(1);
        if self.sim_failures > 0 {
            self.sim_failures -= 1;
            warn!("WiFi(sim): simulated join failure (attempt {})", self.sim_attempts);
            return Err(NetworkError::ConnectionFailed);
        }
        self.sim_joined = true;
        info!("WiFi(sim): joined '{}' (attempt {})", self.ssid, self.sim_attempts);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_joined(&self) -> bool {
        self.driver.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_joined(&self) -> bool {
        self.sim_joined
    }

    #[cfg(target_os = "espidf")]
    fn platform_ip(&self) -> Option<Ipv4Addr> {
        let info = self.driver.wifi().sta_netif().get_ip_info().ok()?;
        Some(Ipv4Addr::from(info.ip.octets()))
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_ip(&self) -> Option<Ipv4Addr> {
        Some(Ipv4Addr::new(192, 168, 12, 50))
    }

    #[cfg(target_os = "espidf")]
    fn platform_rssi(&self) -> Option<i8> {
        let mut ap_info = esp_idf_svc::sys::wifi_ap_record_t::default();
        // SAFETY: `ap_info` is a valid, exclusively borrowed out-parameter.
        esp_idf_svc::sys::esp!(unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut ap_info) })
            .ok()?;
        Some(ap_info.rssi)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_rssi(&self) -> Option<i8> {
        // Drift a little with each attempt, between -66 and -55 dBm.
        let oscillation = ((self.sim_attempts % 12) as i8) - 6;
        Some(-60_i8.saturating_add(oscillation))
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Simulation controls ───────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    /// Make the next `n` join attempts fail.
    pub fn sim_fail_next(&mut self, n: u32) {
        self.sim_failures = n;
    }

    /// Drop the association, as if the AP went away.
    pub fn sim_drop(&mut self) {
        info!("WiFi(sim): association dropped");
        self.sim_joined = false;
    }

    pub fn sim_attempts(&self) -> u32 {
        self.sim_attempts
    }
}

// ───────────────────────────────────────────────────────────────
// NetworkPort
// ───────────────────────────────────────────────────────────────

impl NetworkPort for WifiAdapter {
    fn join(&mut self) -> Result<(), NetworkError> {
        if self.ssid.is_empty() {
            return Err(NetworkError::NoCredentials);
        }
        info!("WiFi: connecting to '{}'", self.ssid);
        self.platform_join()
    }

    fn is_joined(&self) -> bool {
        self.platform_is_joined()
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        if !self.is_joined() {
            return None;
        }
        self.platform_ip()
    }

    fn rssi(&self) -> Option<i8> {
        if !self.is_joined() {
            return None;
        }
        self.platform_rssi()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
