// ABOUTME: Test support utilities.
// ABOUTME: Provides the scripted transport and host helpers for integration tests.

use sshbatch::ssh::Host;
use std::sync::Once;

// Each test binary only uses some of these helpers, so allow dead_code.
#[allow(dead_code)]
pub mod scripted;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("sshbatch=debug".parse().unwrap())
            .add_directive("russh=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A host for the scripted connector. Nothing is dialed.
#[allow(dead_code)]
pub fn test_host(address: &str) -> Host {
    Host::new(address, "ops")
}
