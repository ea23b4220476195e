//! Tests requiring actual serial hardware.
//!
//! These tests are skipped if no hardware is available.
//!
//! # Running Hardware Tests
//!
//! ```bash
//! # Set environment variables
//! export TEST_PORT=COM3                  # or /dev/ttyUSB0 on Linux
//! export TEST_BAUD=9600                  # optional, default: 9600
//! export TEST_LOOPBACK=1                 # if port has TX-RX loopback
//!
//! # Run tests
//! cargo test --features hardware-tests -- --ignored
//! ```
//!
//! # Hardware Requirements
//!
//! - **Real port tests**: Any available serial port
//! - **Loopback tests**: Port with TX and RX connected together

use super::utils::{open_test_port, read_for, TestPortConfig, TimingHelper};
use serial_link::{Port, PortConfig, Signal};
use std::time::Duration;

#[test]
#[ignore] // Run with --ignored flag
fn test_real_port_open_close() {
    let Some((port, config)) = open_test_port() else {
        return;
    };

    assert_eq!(port.name(), config.port_name);
    port.close().expect("close");
}

#[test]
#[ignore]
fn test_real_port_read_timeout() {
    let Some(config) = TestPortConfig::from_env() else {
        return;
    };
    let port = Port::open(
        &PortConfig::new(&config.port_name, config.baud_rate)
            .read_timeout(Duration::from_millis(200)),
    )
    .expect("Failed to open port");
    port.flush().expect("flush");

    let timing = TimingHelper::new("idle read");
    let mut buffer = [0u8; 64];
    let n = port.read(&mut buffer).expect("read");
    let elapsed = timing.finish();

    // An idle line times out with nothing; a chatty device may answer early.
    if n == 0 {
        assert!(elapsed >= Duration::from_millis(150));
    }
}

#[test]
#[ignore]
fn test_real_port_line_control() {
    let Some((port, _)) = open_test_port() else {
        return;
    };

    for signal in [Signal::Dtr, Signal::Rts] {
        port.set_signal(signal, false).expect("clear line");
        port.set_signal(signal, true).expect("assert line");
    }

    let status = port.modem_status().expect("modem status");
    println!("Modem status: {}", status);
}

#[test]
#[ignore]
fn test_real_port_loopback_communication() {
    let Some((port, config)) = open_test_port() else {
        return;
    };
    if !config.loopback_enabled {
        println!("Skipping loopback test: TEST_LOOPBACK not set to 1");
        return;
    }

    port.flush().expect("Failed to clear buffers");

    let test_data = b"LOOPBACK TEST\r\n";
    let written = port.write(test_data).expect("Failed to write to port");
    assert_eq!(written, test_data.len());

    let received = read_for(&port, test_data.len(), Duration::from_secs(2));
    assert_eq!(
        received, test_data,
        "Loopback data should match written data"
    );
}

#[test]
#[ignore]
fn test_real_port_loopback_large_transfer() {
    let Some((port, config)) = open_test_port() else {
        return;
    };
    if !config.loopback_enabled {
        println!("Skipping loopback test: TEST_LOOPBACK not set to 1");
        return;
    }

    port.flush().expect("Failed to clear buffers");
    let payload: Vec<u8> = (0..=255u8).cycle().take(1024).collect();

    let mut received = Vec::with_capacity(payload.len());
    for chunk in payload.chunks(64) {
        let mut sent = 0;
        while sent < chunk.len() {
            sent += port.write(&chunk[sent..]).expect("write");
        }
        received.extend(read_for(&port, chunk.len(), Duration::from_secs(2)));
    }

    assert_eq!(received, payload);
}
