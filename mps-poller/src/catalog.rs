use derive_getters::Getters;
use serde::{Deserialize, Deserializer};
use mps_can::{utils::{check_len, data_resize}, MAX_FRAME_SIZE};
use crate::PollerError;

const BUILTIN: &str = include_str!("catalog.yaml");

/// One labeled request of a frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Getters)]
#[serde(deny_unknown_fields)]
pub struct Request {
    label: String,
    #[serde(deserialize_with = "payload_from_hex")]
    payload: Vec<u8>,
    /// Blocking wait before the request is sent.
    #[serde(default)]
    #[getter(copy)]
    pre_delay_ms: u64,
    /// Blocking wait after the reply (or timeout).
    #[serde(default)]
    #[getter(copy)]
    post_delay_ms: u64,
}

impl Request {
    pub fn new<S: Into<String>>(label: S, payload: &[u8]) -> Self {
        Self {
            label: label.into(),
            payload: payload.to_vec(),
            pre_delay_ms: 0,
            post_delay_ms: 0,
        }
    }

    /// `payload` as hex pairs, whitespace between bytes is ignored.
    pub fn from_hex<S: Into<String>>(label: S, payload: &str) -> Result<Self, PollerError> {
        Ok(Self::new(label, &decode_hex(payload)?))
    }

    pub fn with_pre_delay(mut self, ms: u64) -> Self {
        self.pre_delay_ms = ms;
        self
    }

    pub fn with_post_delay(mut self, ms: u64) -> Self {
        self.post_delay_ms = ms;
        self
    }
}

/// Ordered list of requests making up one frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    requests: Vec<Request>,
}

impl Catalog {
    /// The request list of the MPS unit.
    pub fn builtin() -> Result<Self, PollerError> {
        Self::from_yaml(BUILTIN)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, PollerError> {
        let catalog: Self = serde_yaml::from_str(yaml)?;
        catalog.normalize()
    }

    pub fn from_requests(requests: Vec<Request>) -> Result<Self, PollerError> {
        Self { requests }.normalize()
    }

    #[inline]
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Rejects empty lists and oversized payloads, pads short ones to a full frame.
    fn normalize(mut self) -> Result<Self, PollerError> {
        if self.requests.is_empty() {
            return Err(PollerError::Config("request catalog is empty".into()));
        }

        for request in self.requests.iter_mut() {
            if request.label.is_empty() {
                return Err(PollerError::Config("request without label".into()));
            }
            check_len(request.payload.len())?;
            data_resize(&mut request.payload, MAX_FRAME_SIZE);
        }

        Ok(self)
    }
}

#[inline]
fn decode_hex(payload: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let compact: String = payload.split_whitespace().collect();
    hex::decode(compact)
}

fn payload_from_hex<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let payload = String::deserialize(deserializer)?;
    decode_hex(&payload).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin() -> anyhow::Result<()> {
        let catalog = Catalog::builtin()?;
        assert_eq!(catalog.len(), 18);

        let labels: Vec<&str> = catalog.requests().iter()
            .map(|r| r.label().as_str())
            .collect();
        assert_eq!(&labels[..6], &["heatersState", "heliumLevel", "unknown_032001", "unknown_032002", "init_cmd_1", "init_cmd_2"]);
        assert_eq!(labels[17], "canSecond");

        let helium = &catalog.requests()[1];
        assert_eq!(helium.payload(), &hex::decode("400A200400000000")?);

        let delays: Vec<(u64, u64)> = catalog.requests().iter()
            .map(|r| (r.pre_delay_ms(), r.post_delay_ms()))
            .collect();
        assert_eq!(delays.iter().filter(|(pre, post)| *pre + *post > 0).count(), 2);
        assert_eq!(delays[4], (500, 0));
        assert_eq!(delays[5], (500, 0));

        assert!(catalog.requests().iter().all(|r| r.payload().len() == MAX_FRAME_SIZE));
        Ok(())
    }

    #[test]
    fn test_padding() -> anyhow::Result<()> {
        let catalog = Catalog::from_yaml("requests:\n  - { label: short, payload: \"2F 20\" }\n")?;
        assert_eq!(catalog.requests()[0].payload(), &hex::decode("2F20000000000000")?);
        Ok(())
    }

    #[test]
    fn test_rejected() {
        assert!(matches!(Catalog::from_yaml("requests: []"), Err(PollerError::Config(_))));
        assert!(matches!(
            Catalog::from_yaml("requests:\n  - { label: bad, payload: \"4G\" }\n"),
            Err(PollerError::Catalog(_))
        ));
        assert!(matches!(
            Catalog::from_requests(vec![Request::new("long", &[0; 9])]),
            Err(PollerError::Can(_))
        ));
        assert!(matches!(Request::from_hex("odd", "40 0"), Err(PollerError::Hex(_))));
    }

    #[test]
    fn test_unknown_key_rejected() {
        // a misspelled delay must not silently drop the wait
        let ret = Catalog::from_yaml(
            "requests:\n  - { label: init_cmd_1, payload: \"2F 20 20 00 01\", pre_delay: 500 }\n"
        );
        match ret {
            Err(PollerError::Catalog(e)) => assert!(e.to_string().contains("pre_delay"), "{}", e),
            other => panic!("unexpected result: {:?}", other),
        }

        let ret = Catalog::from_yaml("request:\n  - { label: a, payload: \"40\" }\n");
        assert!(matches!(ret, Err(PollerError::Catalog(_))));
    }
}
