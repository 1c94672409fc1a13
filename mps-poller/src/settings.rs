use std::{str::FromStr, time::Duration};
use derive_getters::Getters;
use mps_can::{CanFilter, Id};
use crate::PollerError;

pub const ENV_CHANNEL: &str = "MPS_CHANNEL";
pub const ENV_TIMEOUT_MS: &str = "MPS_TIMEOUT_MS";
pub const ENV_POLL_INTERVAL_MS: &str = "MPS_POLL_INTERVAL_MS";
pub const ENV_CYCLES: &str = "MPS_CYCLES";

/// Identifier of the request frames sent to the unit.
pub const REQUEST_ID: u16 = 0x641;
/// Identifier the unit answers with.
pub const RESPONSE_ID: u16 = 0x5C1;

#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Settings {
    channel: String,
    #[getter(copy)]
    request_id: u16,
    #[getter(copy)]
    response_id: u16,
    #[getter(copy)]
    timeout_ms: u64,
    #[getter(copy)]
    poll_interval_ms: u64,
    /// `None` polls until the first error.
    #[getter(copy)]
    cycles: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            channel: "can0".into(),
            request_id: REQUEST_ID,
            response_id: RESPONSE_ID,
            timeout_ms: 100,
            poll_interval_ms: 10,
            cycles: None,
        }
    }
}

impl Settings {
    /// Reads `MPS_*` variables, after loading a `.env` file when one exists.
    pub fn from_env() -> Result<Self, PollerError> {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("MPS - loaded {}", path.display()),
            Err(e) if e.not_found() => {},
            Err(e) => return Err(PollerError::Config(e.to_string())),
        }

        Self::from_vars(std::env::vars())
    }

    /// Unrelated variables are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, PollerError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::default();
        for (key, value) in vars {
            let value = value.as_ref().trim();
            match key.as_ref() {
                ENV_CHANNEL => {
                    if value.is_empty() {
                        return Err(PollerError::Config(format!("{} is empty", ENV_CHANNEL)));
                    }
                    settings.channel = value.to_owned();
                },
                ENV_TIMEOUT_MS => settings.timeout_ms = parse(ENV_TIMEOUT_MS, value)?,
                ENV_POLL_INTERVAL_MS => settings.poll_interval_ms = parse(ENV_POLL_INTERVAL_MS, value)?,
                ENV_CYCLES => settings.cycles = Some(parse(ENV_CYCLES, value)?),
                _ => {},
            }
        }

        if settings.poll_interval_ms == 0 {
            return Err(PollerError::Config(format!("{} must be positive", ENV_POLL_INTERVAL_MS)));
        }

        Ok(settings)
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[inline]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[inline]
    pub fn request_can_id(&self) -> Id {
        Id::new_standard(self.request_id)
    }

    #[inline]
    pub fn response_can_id(&self) -> Id {
        Id::new_standard(self.response_id)
    }

    /// Kernel filter letting only the unit's answers through.
    #[inline]
    pub fn filters(&self) -> Vec<CanFilter> {
        vec![CanFilter::standard(self.response_id)]
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T, PollerError>
where
    T::Err: std::fmt::Display,
{
    value.parse()
        .map_err(|e| PollerError::Config(format!("{}={:?}: {}", name, value, e)))
}
