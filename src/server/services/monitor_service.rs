//! Serial monitor task tracking
//!
//! Each WebSocket terminal connection owns one registry. Monitor tasks stream
//! serial output into the connection's message channel and are cancelled when
//! the connection goes away.

use std::collections::HashMap;

use log::info;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::models::TerminalMessage;

/// Active serial monitor tasks, keyed by port device path
pub struct MonitorRegistry {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    /// Start monitoring a port, or fail if it is already being monitored
    pub fn start(
        &mut self,
        port: &str,
        baudrate: u32,
        tx: UnboundedSender<TerminalMessage>,
    ) -> Result<(), String> {
        self.reap_finished();

        if self.tasks.contains_key(port) {
            return Err(format!("Already monitoring {}", port));
        }

        let port_name = port.to_string();
        let task_port = port_name.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = crate::serial::monitor_port(task_port.clone(), baudrate, tx.clone()).await
            {
                let _ = tx.send(TerminalMessage::error(format!(
                    "Monitor for {} stopped: {}",
                    task_port, e
                )));
            }
        });

        info!("Started serial monitor for {}", port_name);
        self.tasks.insert(port_name, handle);
        Ok(())
    }

    /// Stop monitoring a port, returning whether a monitor was running
    pub fn stop(&mut self, port: &str) -> bool {
        match self.tasks.remove(port) {
            Some(handle) => {
                handle.abort();
                info!("Stopped serial monitor for {}", port);
                true
            }
            None => false,
        }
    }

    /// Drop handles of monitors that already exited on their own
    pub fn reap_finished(&mut self) {
        self.tasks.retain(|_, handle| !handle.is_finished());
    }

    /// Cancel every running monitor (connection teardown)
    pub fn abort_all(&mut self) {
        for (port, handle) in self.tasks.drain() {
            handle.abort();
            info!("Aborted serial monitor for {}", port);
        }
    }
}

impl Default for MonitorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MonitorRegistry {
    fn drop(&mut self) {
        self.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_monitor_rejected() {
        let mut registry = MonitorRegistry::new();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();

        // The port is fake; the task fails quickly, but the entry exists
        // until the registry reaps it.
        registry
            .start("/dev/ttyTEST0", 115200, tx.clone())
            .unwrap();
        assert!(registry.tasks.contains_key("/dev/ttyTEST0"));

        registry.abort_all();
        assert!(registry.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_stop_unknown_port_is_false() {
        let mut registry = MonitorRegistry::new();
        assert!(!registry.stop("/dev/ttyNOPE"));
    }
}
