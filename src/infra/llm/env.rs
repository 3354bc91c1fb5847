use std::time::Duration;

use crate::domain::ProviderError;

pub(crate) fn read_env_var(name: &str) -> Result<Option<String>, ProviderError> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(error) => Err(ProviderError::validation(format!(
            "{name} could not be read: {error}"
        ))),
    }
}

/// Reads a credential from the primary crate-scoped variable, then the
/// conventional provider variable. Absence is not an error here; the
/// provider reports it per call so fallback can continue.
pub(crate) fn read_optional_api_key(
    primary: &str,
    fallback: &str,
) -> Result<Option<String>, ProviderError> {
    let key = read_env_var(primary)?.or(read_env_var(fallback)?);
    Ok(key.filter(|key| !key.trim().is_empty()))
}

pub(crate) fn parse_timeout_seconds(name: &str, value: &str) -> Result<Duration, ProviderError> {
    let parsed = value.trim().parse::<u64>().map_err(|_| {
        ProviderError::validation(format!("{name} must be a positive integer in seconds"))
    })?;
    if parsed == 0 {
        return Err(ProviderError::validation(format!(
            "{name} must be greater than 0 seconds"
        )));
    }
    Ok(Duration::from_secs(parsed))
}

pub(crate) fn read_timeout_from_env(name: &str) -> Result<Option<Duration>, ProviderError> {
    let Some(value) = read_env_var(name)? else {
        return Ok(None);
    };
    Ok(Some(parse_timeout_seconds(name, &value)?))
}

pub(crate) fn resolve_timeout_with_global_fallback<F>(
    provider_timeout: Option<Duration>,
    read_global_timeout: F,
    default_timeout: Duration,
) -> Result<Duration, ProviderError>
where
    F: FnOnce() -> Result<Option<Duration>, ProviderError>,
{
    if let Some(timeout) = provider_timeout {
        return Ok(timeout);
    }

    Ok(read_global_timeout()?.unwrap_or(default_timeout))
}

pub(crate) fn read_bool_env(name: &str) -> Result<bool, ProviderError> {
    let Some(value) = read_env_var(name)? else {
        return Ok(false);
    };

    parse_bool(&value).ok_or_else(|| {
        ProviderError::validation(format!(
            "{name} must be one of: true,false,1,0,yes,no,on,off"
        ))
    })
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
