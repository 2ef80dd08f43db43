//! Integration test crate for Ringwatch.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! Every video here is synthesized in memory, so no ffmpeg, network or model
//! file is needed.

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod detection;

#[cfg(test)]
mod reporting;
