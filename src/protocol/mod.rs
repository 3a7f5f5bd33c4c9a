//! # x-BIMU Protocol Module
//!
//! Implementation of the x-BIMU binary packet protocol.
//!
//! This module handles:
//! - Typed packet definitions (orientation, raw sensors, battery)
//! - Incremental frame decoding with silent resynchronization
//! - Frame encoding for tests and stream tooling
//! - Additive frame checksum calculation

pub mod checksum;
pub mod decoder;
pub mod encoder;
pub mod packet;
