//! Protocol bridge for remote-automation drivers.
//!
//! The bridge sits between automation clients and a concrete driver. It
//! negotiates session capabilities across both wire dialects, compiles a
//! declarative method map into HTTP routes, and decides per request whether
//! a command is executed locally by the driver or forwarded verbatim to a
//! downstream endpoint.
//!
//! Drivers plug in through the [`driver::Driver`] trait: they declare a
//! capability [`capabilities::ConstraintSchema`], optionally extend the
//! base [`routing::MethodMap`], and implement command execution.

pub mod capabilities;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod driver;
pub mod routing;
pub mod server;
pub mod session;
