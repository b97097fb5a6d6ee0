//! Topic naming. All topics are `__`-delimited and prefixed by an opaque
//! scope which is never parsed, only prepended.

/// Discriminator for lifecycle directives routed to an interface.
pub const CMD_INTERFACE: &str = "CMDINTERFACE";
/// Structured commands routed to an interface.
pub const CMD: &str = "CMD";
/// Raw command echoes.
pub const COMMAND: &str = "COMMAND";
/// Decommutated command echoes.
pub const DECOM_CMD: &str = "DECOMCMD";
/// Telemetry output.
pub const TELEMETRY: &str = "TELEMETRY";

const DELIMITER: &str = "__";

pub fn cmd_interface_topic(scope: &str, interface: &str) -> String {
    format!("{scope}{DELIMITER}{CMD_INTERFACE}{DELIMITER}{interface}")
}

pub fn cmd_topic(scope: &str, interface: &str) -> String {
    format!("{scope}{DELIMITER}{CMD}{DELIMITER}{interface}")
}

pub fn command_topic(scope: &str, target: &str, packet: &str) -> String {
    format!("{scope}{DELIMITER}{COMMAND}{DELIMITER}{target}{DELIMITER}{packet}")
}

pub fn decom_cmd_topic(scope: &str, target: &str, packet: &str) -> String {
    format!("{scope}{DELIMITER}{DECOM_CMD}{DELIMITER}{target}{DELIMITER}{packet}")
}

pub fn telemetry_topic(scope: &str, target: &str, packet: &str) -> String {
    format!("{scope}{DELIMITER}{TELEMETRY}{DELIMITER}{target}{DELIMITER}{packet}")
}

/// Splits a `<scope>__<kind>__<interface>` microservice name into its scope
/// and interface components.
pub fn split_microservice_name(name: &str) -> Option<(&str, &str)> {
    let mut parts = name.splitn(3, DELIMITER);
    let scope = parts.next()?;
    let _kind = parts.next()?;
    let interface = parts.next()?;

    if scope.is_empty() || interface.is_empty() {
        return None;
    }

    Some((scope, interface))
}
