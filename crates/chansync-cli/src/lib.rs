//! Channel sync demo
//!
//! Drives a complete session lifecycle through the generic
//! [`chansync_app::Runtime`] against the in-memory backend from
//! [`chansync_harness`], logging every channel list the session publishes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod demo;
