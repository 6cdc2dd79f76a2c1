//! Optional host GPIO control
//!
//! Some flashing rigs wire the ESP32's EN and IO0 lines (and sometimes its
//! power) to host GPIOs so a device can be dropped into the serial bootloader
//! without touching it. This is strictly best-effort: when the Linux sysfs
//! GPIO interface is absent every operation is a silent no-op, and failures
//! never abort a flash attempt. Sequencing uses fixed sleeps only.

use log::{debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::GpioConfig;
use crate::models::TerminalMessage;

const SYSFS_GPIO: &str = "/sys/class/gpio";

/// Low-level sysfs pin driver with runtime availability detection
#[derive(Debug)]
pub struct GpioController {
    root: PathBuf,
    available: bool,
}

impl GpioController {
    pub fn new() -> Self {
        Self::with_root(SYSFS_GPIO)
    }

    /// Use an alternate sysfs root (tests point this at a temp directory)
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let available = root.exists();
        if available {
            debug!("GPIO support detected at {}", root.display());
        } else {
            debug!("GPIO support not available, pin operations are no-ops");
        }
        Self { root, available }
    }

    pub fn available(&self) -> bool {
        self.available
    }

    /// Export a pin and configure it as an output
    pub fn setup_pin(&self, pin: u32) -> bool {
        if !self.available {
            return false;
        }

        let pin_dir = self.pin_dir(pin);
        if !pin_dir.exists() {
            if let Err(e) = write_sysfs(&self.root.join("export"), &pin.to_string()) {
                warn!("GPIO export failed for pin {}: {}", pin, e);
                return false;
            }
        }

        match write_sysfs(&pin_dir.join("direction"), "out") {
            Ok(()) => true,
            Err(e) => {
                warn!("GPIO setup failed for pin {}: {}", pin, e);
                false
            }
        }
    }

    /// Drive a pin high or low
    pub fn set_pin(&self, pin: u32, value: bool) -> bool {
        if !self.available {
            return false;
        }

        let value_str = if value { "1" } else { "0" };
        match write_sysfs(&self.pin_dir(pin).join("value"), value_str) {
            Ok(()) => true,
            Err(e) => {
                warn!("GPIO set failed for pin {}: {}", pin, e);
                false
            }
        }
    }

    /// Pulse a pin for the given duration and return it to its idle level
    pub async fn pulse_pin(&self, pin: u32, duration: Duration, active_low: bool) -> bool {
        if !self.available {
            return false;
        }

        // idle level is the inactive one
        let idle = active_low;
        self.set_pin(pin, !idle);
        tokio::time::sleep(duration).await;
        self.set_pin(pin, idle)
    }

    fn pin_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{}", pin))
    }
}

impl Default for GpioController {
    fn default() -> Self {
        Self::new()
    }
}

fn write_sysfs(path: &Path, value: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new().write(true).open(path)?;
    file.write_all(value.as_bytes())
}

/// High-level flash-mode sequencing from the manifest's gpio section
#[derive(Debug)]
pub struct FlashGpio {
    controller: GpioController,
    config: Option<GpioConfig>,
}

impl FlashGpio {
    pub fn new(config: Option<GpioConfig>) -> Self {
        Self::with_controller(GpioController::new(), config)
    }

    pub fn with_controller(controller: GpioController, config: Option<GpioConfig>) -> Self {
        let flash_gpio = Self { controller, config };
        flash_gpio.setup_pins();
        flash_gpio
    }

    fn setup_pins(&self) {
        let Some(config) = &self.config else {
            return;
        };
        if !self.controller.available() {
            return;
        }

        for pin in [config.reset_pin, config.boot_pin, config.power_pin]
            .into_iter()
            .flatten()
        {
            if self.controller.setup_pin(pin) {
                info!("GPIO pin {} configured", pin);
            }
        }
    }

    /// Hold boot, pulse reset, release boot: device enters the serial bootloader
    pub async fn enter_flash_mode(&self, tx: &UnboundedSender<TerminalMessage>) -> bool {
        let Some(config) = &self.config else {
            return false;
        };
        if !self.controller.available() {
            return false;
        }
        if config.boot_pin.is_none() && config.reset_pin.is_none() {
            return false;
        }

        let _ = tx.send(TerminalMessage::info("Entering flash mode via GPIO..."));

        if let Some(boot_pin) = config.boot_pin {
            // Assert boot select
            self.controller.set_pin(boot_pin, !config.boot_active_low);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        if let Some(reset_pin) = config.reset_pin {
            self.controller
                .pulse_pin(
                    reset_pin,
                    Duration::from_millis(config.reset_duration_ms),
                    config.reset_active_low,
                )
                .await;
            tokio::time::sleep(Duration::from_millis(200)).await;
        }

        if let Some(boot_pin) = config.boot_pin {
            // Release boot select
            self.controller.set_pin(boot_pin, config.boot_active_low);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        true
    }

    /// Pulse reset so the device boots the freshly flashed firmware
    pub async fn exit_flash_mode(&self, tx: &UnboundedSender<TerminalMessage>) -> bool {
        let Some(config) = &self.config else {
            return false;
        };
        if !self.controller.available() {
            return false;
        }
        let Some(reset_pin) = config.reset_pin else {
            return false;
        };

        let _ = tx.send(TerminalMessage::info("Resetting device via GPIO..."));

        self.controller
            .pulse_pin(
                reset_pin,
                Duration::from_millis(config.reset_duration_ms),
                config.reset_active_low,
            )
            .await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        true
    }

    /// Cycle device power, when a power pin is wired
    pub async fn power_cycle(&self, tx: &UnboundedSender<TerminalMessage>) -> bool {
        let Some(config) = &self.config else {
            return false;
        };
        let Some(power_pin) = config.power_pin else {
            return false;
        };
        if !self.controller.available() {
            return false;
        }

        let _ = tx.send(TerminalMessage::info("Power cycling device via GPIO..."));

        self.controller.set_pin(power_pin, false);
        tokio::time::sleep(Duration::from_secs(1)).await;
        self.controller.set_pin(power_pin, true);
        tokio::time::sleep(Duration::from_secs(2)).await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> GpioConfig {
        GpioConfig {
            reset_pin: Some(17),
            boot_pin: Some(27),
            power_pin: None,
            reset_duration_ms: 1,
            reset_active_low: true,
            boot_active_low: true,
        }
    }

    #[test]
    fn test_controller_unavailable_without_sysfs() {
        let controller = GpioController::with_root("/nonexistent/gpio-root");
        assert!(!controller.available());
        assert!(!controller.setup_pin(17));
        assert!(!controller.set_pin(17, true));
    }

    #[tokio::test]
    async fn test_flash_gpio_noop_without_hardware() {
        let controller = GpioController::with_root("/nonexistent/gpio-root");
        let gpio = FlashGpio::with_controller(controller, Some(test_config()));

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        assert!(!gpio.enter_flash_mode(&tx).await);
        assert!(!gpio.exit_flash_mode(&tx).await);
        assert!(!gpio.power_cycle(&tx).await);
        // Silent: no terminal messages when GPIO is absent
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_flash_gpio_noop_without_config() {
        let gpio = FlashGpio::with_controller(GpioController::with_root("/nonexistent"), None);
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        assert!(!gpio.enter_flash_mode(&tx).await);
    }

    #[tokio::test]
    async fn test_pulse_sequence_writes_pin_values() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path();
        std::fs::write(root.join("export"), "").unwrap();
        let pin_dir = root.join("gpio17");
        std::fs::create_dir(&pin_dir).unwrap();
        std::fs::write(pin_dir.join("direction"), "").unwrap();
        std::fs::write(pin_dir.join("value"), "").unwrap();

        let controller = GpioController::with_root(root);
        assert!(controller.available());
        assert!(controller.setup_pin(17));
        assert!(controller.pulse_pin(17, Duration::from_millis(1), true).await);

        // Pin ends at its idle (inactive) level: high for active-low reset
        assert_eq!(std::fs::read_to_string(pin_dir.join("value")).unwrap(), "1");
    }
}
