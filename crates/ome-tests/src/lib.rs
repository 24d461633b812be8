//! Integration test crate for Ome.
//!
//! This crate exists solely to hold cross-crate integration tests. Every
//! test runs against in-memory sources and the null output backend, so no
//! audio device is needed.

#[cfg(test)]
mod fixture;

#[cfg(test)]
mod engine;

#[cfg(test)]
mod config;

#[cfg(test)]
mod control;
