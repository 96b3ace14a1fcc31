//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{TransportConfig, WeldConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &WeldConfig) -> ConfigResult<()> {
    if config.pipeline.timeout_ms == 0 {
        return Err(ConfigError::validation(
            "Pipeline timeout must be greater than 0",
        ));
    }

    if config.shutdown.drain_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "Drain timeout must be greater than 0",
        ));
    }

    if config.logging.output == super::schema::LogOutput::File
        && config.logging.file_path.is_none()
    {
        return Err(ConfigError::validation(
            "File log output requires logging.file_path",
        ));
    }

    if let Some(transport) = &config.transport {
        validate_transport_config(transport)?;
    }

    Ok(())
}

/// Validates the transport binding.
fn validate_transport_config(transport: &TransportConfig) -> ConfigResult<()> {
    match transport {
        TransportConfig::EventSocket { host, port } => {
            if host.is_empty() {
                return Err(ConfigError::validation("Bind host cannot be empty"));
            }
            if *port == 0 {
                return Err(ConfigError::InvalidPort(*port));
            }
        }
        TransportConfig::QueueWorker {
            recv_addr,
            send_addr,
            identity,
        } => {
            validate_addr(recv_addr)?;
            validate_addr(send_addr)?;
            if identity.is_empty() {
                return Err(ConfigError::validation(
                    "Queue worker identity cannot be empty",
                ));
            }
        }
    }

    Ok(())
}

/// Validates a broker `host:port` address.
fn validate_addr(addr: &str) -> ConfigResult<()> {
    if addr.is_empty() {
        return Err(ConfigError::invalid_addr(addr, "address cannot be empty"));
    }
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => {
            port.parse::<u16>()
                .map_err(|_| ConfigError::invalid_addr(addr, "port is not a number"))?;
        }
        _ => {
            return Err(ConfigError::invalid_addr(
                addr,
                "expected host:port",
            ));
        }
    }
    Ok(())
}
