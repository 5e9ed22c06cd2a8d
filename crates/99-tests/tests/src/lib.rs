//! Cross-thread end-to-end tests for rayframe.
//!
//! Slow tests are `#[ignore]`d and prefixed with `slow_`.

#[cfg(test)]
mod channels_e2e;

#[cfg(test)]
mod session_e2e;
