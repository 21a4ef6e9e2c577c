//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to              |
//! |-------------|--------------------|--------------------------|
//! | `wifi`      | NetworkPort        | ESP-IDF WiFi STA         |
//! | `mqtt`      | SessionPort        | ESP-IDF MQTT client      |
//! | `system`    | SystemPort         | heap stats, esp_restart  |
//! | `time`      | ClockPort          | ESP32 system timer       |
//! | `board`     | Platform           | all of the above + delay |
//! | `device_id` | —                  | factory MAC (eFuse)      |

pub mod board;
pub mod device_id;
pub mod mqtt;
pub mod system;
pub mod time;
pub mod wifi;
