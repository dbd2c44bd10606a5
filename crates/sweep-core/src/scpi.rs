//! IEEE-488.2 common-command helpers shared by the SCPI adapters.
//!
//! The interesting piece is fault translation: after a failed transport call
//! an adapter queries the standard event status register (`*ESR?`) and maps
//! the register bits onto the error taxonomy, turning an opaque wire fault
//! into an actionable class.
//!
//! Register bits (IEEE-488.2 §11.5.1):
//! - bit 5 (32): command error
//! - bit 4 (16): execution error
//! - bit 3 (8):  device-dependent error

use crate::error::SweepError;
use crate::transport::{Transport, TransportError};

/// Identity query.
pub const IDN: &str = "*IDN?";
/// Standard event status register query.
pub const ESR: &str = "*ESR?";
/// Operation-complete query: `1` once all queued commands have executed.
pub const OPC: &str = "*OPC?";

const ESR_COMMAND_ERROR: u8 = 0x20;
const ESR_EXECUTION_ERROR: u8 = 0x10;
const ESR_DEVICE_ERROR: u8 = 0x08;

/// Classify an event-status-register value into an error, if it reports one.
pub fn classify_esr(esr: u8, name: &str, context: &str) -> Option<SweepError> {
    if esr & ESR_COMMAND_ERROR != 0 {
        Some(SweepError::Command {
            name: name.to_string(),
            context: context.to_string(),
        })
    } else if esr & ESR_EXECUTION_ERROR != 0 {
        Some(SweepError::Execution {
            name: name.to_string(),
            context: context.to_string(),
        })
    } else if esr & ESR_DEVICE_ERROR != 0 {
        Some(SweepError::DeviceDependent {
            name: name.to_string(),
            context: context.to_string(),
        })
    } else {
        None
    }
}

/// Translate a transport fault by interrogating the device's error register.
///
/// Queried immediately after the failed call; if the register reports a
/// command/execution/device error that classification wins, otherwise the
/// original transport fault is surfaced unchanged.
pub async fn translate_fault(
    transport: &dyn Transport,
    name: &str,
    context: &str,
    fault: TransportError,
) -> SweepError {
    match transport.query(ESR).await {
        Ok(response) => match response.trim().parse::<u8>() {
            Ok(esr) => classify_esr(esr, name, context).unwrap_or_else(|| {
                tracing::debug!(name, esr, "error register clear, surfacing transport fault");
                SweepError::Transport(fault)
            }),
            Err(_) => {
                tracing::warn!(name, response, "unparseable *ESR? response");
                SweepError::Transport(fault)
            }
        },
        Err(_) => SweepError::Transport(fault),
    }
}

/// Interrogate the error register after a set command.
///
/// A write the instrument accepts on the wire can still fail during
/// execution; this is the check that catches it. A response that does not
/// parse as a register value is surfaced as a device-dependent error, since
/// the device cannot be assumed healthy on that evidence.
pub async fn check_error_register(
    transport: &dyn Transport,
    name: &str,
    context: &str,
) -> Result<(), SweepError> {
    let response = transport
        .query(ESR)
        .await
        .map_err(SweepError::Transport)?;
    match response.trim().parse::<u8>() {
        Ok(esr) => match classify_esr(esr, name, context) {
            Some(err) => Err(err),
            None => Ok(()),
        },
        Err(_) => {
            tracing::warn!(name, response, "unparseable *ESR? response");
            Err(SweepError::DeviceDependent {
                name: name.to_string(),
                context: format!("{context}: unparseable *ESR? response '{response}'"),
            })
        }
    }
}

/// Query `*OPC?`: `true` once every queued command has finished executing.
pub async fn operation_complete(transport: &dyn Transport) -> Result<bool, TransportError> {
    let response = transport.query(OPC).await?;
    Ok(response.trim() == "1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_esr_command_error() {
        let err = classify_esr(32, "laser", "setting wavelength").unwrap();
        assert!(matches!(err, SweepError::Command { .. }));
    }

    #[test]
    fn test_classify_esr_execution_error() {
        let err = classify_esr(16, "laser", "setting power").unwrap();
        assert!(matches!(err, SweepError::Execution { .. }));
    }

    #[test]
    fn test_classify_esr_device_error() {
        let err = classify_esr(8, "meter", "reading").unwrap();
        assert!(matches!(err, SweepError::DeviceDependent { .. }));
    }

    #[test]
    fn test_classify_esr_clear_register() {
        assert!(classify_esr(0, "laser", "anything").is_none());
    }

    #[test]
    fn test_classify_esr_command_wins_over_device() {
        // Multiple bits set: highest-severity class is reported.
        let err = classify_esr(32 | 8, "laser", "ctx").unwrap();
        assert!(matches!(err, SweepError::Command { .. }));
    }
}
