//! The interface microservice: the long-running supervisor bridging one
//! bidirectional device link and the central streaming store.
//!
//! Inbound packets move link → supervisor → packet handler → telemetry
//! topics. Outbound commands move command topics → command worker → link,
//! with raw and decommutated echoes fanned back out to the store.
//! Lifecycle directives (connect, disconnect, telemetry injection, raw
//! writes) short-circuit from the command worker into the supervisor.

pub use commands::{CmdWorker, HAZARDOUS_ERROR, SUCCESS};
pub use interface::InterfaceHandle;
pub use microservice::InterfaceMicroservice;
pub use packets::PacketHandler;
pub use reporter::{ExceptionSink, FsExceptionSink};
pub use supervisor::Supervisor;

mod commands;
mod interface;
mod microservice;
mod packets;
mod reporter;
mod supervisor;

#[cfg(test)]
mod tests;
