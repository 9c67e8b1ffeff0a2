//! ARM debug architecture: ADIv5 debug and access ports, Cortex-M cores.

pub mod ap;
pub mod core;
pub mod dp;

use std::time::{Duration, Instant};

use crate::{Error, TimeoutKind};

/// Poll `done` until it reports `true`, failing once `timeout` has passed.
///
/// The condition is always checked at least once.
pub(crate) fn poll_until(
    what: &'static str,
    timeout: Duration,
    mut done: impl FnMut() -> Result<bool, Error>,
) -> Result<(), Error> {
    let start = Instant::now();

    loop {
        if done()? {
            return Ok(());
        }
        if start.elapsed() >= timeout {
            tracing::debug!("{} timed out after {:?}", what, timeout);
            return Err(Error::TransferTimeout(TimeoutKind::Poll { what, timeout }));
        }
        // Wait a bit before polling again.
        std::thread::sleep(Duration::from_millis(1));
    }
}
