//! Utility functions for hardware testing.
//!
//! Provides environment-driven port setup and a timing helper.

use serial_link::{Port, PortConfig};
use std::env;
use std::time::{Duration, Instant};

/// Test port configuration from environment.
pub struct TestPortConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub loopback_enabled: bool,
}

impl TestPortConfig {
    /// Get test configuration from environment variables.
    pub fn from_env() -> Option<Self> {
        let port_name = env::var("TEST_PORT").ok()?;
        let baud_rate = env::var("TEST_BAUD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(9600);
        let loopback_enabled = env::var("TEST_LOOPBACK").ok().as_deref() == Some("1");

        Some(TestPortConfig {
            port_name,
            baud_rate,
            loopback_enabled,
        })
    }

    /// Create a port configuration for testing.
    pub fn to_port_config(&self) -> PortConfig {
        PortConfig::new(&self.port_name, self.baud_rate).read_timeout(Duration::from_millis(1000))
    }
}

/// Open the configured test port, or explain why the test is skipped.
pub fn open_test_port() -> Option<(Port, TestPortConfig)> {
    let config = match TestPortConfig::from_env() {
        Some(c) => c,
        None => {
            println!("Skipping hardware test: TEST_PORT not set");
            return None;
        }
    };

    println!("Opening {} at {} baud", config.port_name, config.baud_rate);
    match Port::open(&config.to_port_config()) {
        Ok(port) => Some((port, config)),
        Err(e) => panic!("Port open failed: {}", e),
    }
}

/// Read until `want` bytes arrive or `limit` elapses.
pub fn read_for(port: &Port, want: usize, limit: Duration) -> Vec<u8> {
    let deadline = Instant::now() + limit;
    let mut received = Vec::new();
    let mut buffer = [0u8; 256];
    while received.len() < want && Instant::now() < deadline {
        match port.read(&mut buffer) {
            Ok(n) => received.extend_from_slice(&buffer[..n]),
            Err(e) => panic!("read failed: {}", e),
        }
    }
    received
}

/// Timing helper for measuring operation duration.
pub struct TimingHelper {
    start: Instant,
    name: String,
}

impl TimingHelper {
    pub fn new(name: &str) -> Self {
        println!("Starting: {}", name);
        TimingHelper {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        println!("Completed: {} in {:?}", self.name, elapsed);
        elapsed
    }
}
