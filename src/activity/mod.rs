//! Concrete flyer activity variants.
//!
//! Each variant implements [`crate::flyer::FlyerActivity`] and is injected
//! into a [`crate::flyer::Flyer`] at construction. Hardware-backed variants
//! belong here too; the engine itself never knows what the activity does.

pub mod interval;

pub use interval::IntervalActivity;
