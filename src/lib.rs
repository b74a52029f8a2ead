//! Asynchronous flyer devices for scientific data acquisition.
//!
//! A flyer is a device that performs a background activity (typically
//! hardware acquisition) independently of the caller and later yields its
//! batched data, as opposed to synchronous point-measurement devices. This
//! crate provides the lifecycle engine, the resolve-once status objects used
//! to coordinate caller and worker, and the record/schema types handed to an
//! orchestrating run engine.

pub mod activity;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod flyer;
pub mod status;
