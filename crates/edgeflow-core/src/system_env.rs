//! Production `Environment` implementation using system time and RNG.
//!
//! Uses `std::time::Instant::now()` for time, `tokio::time::sleep()` for async sleeping, and
//! getrandom for cryptographic randomness. Production behavior is non-deterministic, but
//! provides real-world timing.

use std::time::Duration;

use crate::env::Environment;

/// Production environment using system time and cryptographic RNG.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - worker cannot mint session ids");
    }

    #[allow(clippy::disallowed_methods, clippy::expect_used)]
    fn wall_clock_secs_f64(&self) -> f64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("invariant: system clock is after Unix epoch (1970-01-01)")
            .as_secs_f64()
    }
}
