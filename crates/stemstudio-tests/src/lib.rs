//! Integration test crate for Stem Studio.
//!
//! This crate exists solely to hold cross-crate integration tests.

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod cache;

#[cfg(test)]
mod mix;

#[cfg(test)]
mod export;

#[cfg(test)]
mod gestures;

#[cfg(test)]
mod session;
