#![allow(dead_code)]

use std::{collections::VecDeque, sync::{Arc, Mutex}, thread, time::{Duration, Instant}};
use mps_can::{utils, CanDriver, CanError, Direct, Frame, Id};
use mps_poller::{Catalog, Settings};

pub const CHANNEL: &str = "mock0";

#[derive(Debug, Clone, PartialEq)]
pub struct MockFrame {
    id: Id,
    data: Vec<u8>,
    channel: String,
    direct: Direct,
    timestamp: u64,
}

impl Frame for MockFrame {
    type Channel = String;

    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        utils::check_len(data.len()).ok()?;
        Some(Self {
            id: id.into(),
            data: data.to_vec(),
            channel: CHANNEL.into(),
            direct: Direct::Transmit,
            timestamp: 0,
        })
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn set_timestamp(&mut self, value: Option<u64>) -> &mut Self {
        self.timestamp = value.unwrap_or_else(utils::system_timestamp);
        self
    }

    fn id(&self) -> Id {
        self.id
    }

    fn is_remote(&self) -> bool {
        false
    }

    fn is_extended(&self) -> bool {
        self.id.is_extended()
    }

    fn direct(&self) -> Direct {
        self.direct
    }

    fn set_direct(&mut self, direct: Direct) -> &mut Self {
        self.direct = direct;
        self
    }

    fn is_error_frame(&self) -> bool {
        false
    }

    fn channel(&self) -> Self::Channel {
        self.channel.clone()
    }

    fn set_channel(&mut self, value: Self::Channel) -> &mut Self {
        self.channel = value;
        self
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn length(&self) -> usize {
        self.data.len()
    }
}

struct Script {
    trigger: Vec<u8>,
    delay: Duration,
    reply: MockFrame,
}

#[derive(Default)]
struct Inner {
    scripts: Vec<Script>,
    pending: VecDeque<(Instant, MockFrame)>,
    transmitted: Vec<(Instant, MockFrame)>,
    transmit_error: Option<(Vec<u8>, CanError)>,
    receive_error: Option<CanError>,
    receive_calls: usize,
    last_wait: Option<u32>,
    shutdown: bool,
}

/// In-memory bus answering scripted requests after a delay, in real time.
#[derive(Clone, Default)]
pub struct MockDriver {
    inner: Arc<Mutex<Inner>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request carrying `trigger` with `reply` from 0x5C1 after `delay`.
    pub fn reply(&self, trigger: &[u8], reply: &[u8], delay: Duration) -> &Self {
        self.reply_from(trigger, Id::Standard(0x5C1), reply, delay)
    }

    pub fn reply_from(&self, trigger: &[u8], id: Id, reply: &[u8], delay: Duration) -> &Self {
        let mut reply = MockFrame::new(id, reply).unwrap();
        reply.set_direct(Direct::Receive);
        self.inner.lock().unwrap().scripts.push(Script { trigger: trigger.to_vec(), delay, reply });
        self
    }

    /// Queue a frame nobody asked for, due right now.
    pub fn inject(&self, data: &[u8]) {
        let frame = MockFrame::new(Id::Standard(0x5C1), data).unwrap();
        self.inner.lock().unwrap().pending.push_back((Instant::now(), frame));
    }

    pub fn fail_transmit(&self, trigger: &[u8], error: CanError) {
        self.inner.lock().unwrap().transmit_error = Some((trigger.to_vec(), error));
    }

    pub fn fail_receive(&self, error: CanError) {
        self.inner.lock().unwrap().receive_error = Some(error);
    }

    pub fn transmitted(&self) -> Vec<(Instant, MockFrame)> {
        self.inner.lock().unwrap().transmitted.clone()
    }

    pub fn pending(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    pub fn receive_calls(&self) -> usize {
        self.inner.lock().unwrap().receive_calls
    }

    /// Timeout passed to the latest `receive` call.
    pub fn last_wait(&self) -> Option<u32> {
        self.inner.lock().unwrap().last_wait
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.lock().unwrap().shutdown
    }
}

impl CanDriver for MockDriver {
    type Channel = String;
    type Frame = MockFrame;

    fn opened_channels(&self) -> Vec<Self::Channel> {
        if self.is_shutdown() { vec![] } else { vec![CHANNEL.into()] }
    }

    fn transmit(&self, msg: Self::Frame) -> Result<(), CanError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some((trigger, error)) = &inner.transmit_error {
            if trigger.as_slice() == msg.data() {
                return Err(error.clone());
            }
        }

        let now = Instant::now();
        let replies: Vec<(Instant, MockFrame)> = inner.scripts.iter()
            .filter(|s| s.trigger.as_slice() == msg.data())
            .map(|s| (now + s.delay, s.reply.clone()))
            .collect();
        inner.pending.extend(replies);
        inner.pending.make_contiguous().sort_by_key(|(due, _)| *due);
        inner.transmitted.push((now, msg));

        Ok(())
    }

    fn receive(&self, channel: Self::Channel, timeout: Option<u32>) -> Result<Vec<Self::Frame>, CanError> {
        let start = Instant::now();
        let due = {
            let mut inner = self.inner.lock().unwrap();
            inner.receive_calls += 1;
            inner.last_wait = timeout;
            if let Some(e) = inner.receive_error.take() {
                return Err(e);
            }
            inner.pending.front().map(|(due, _)| *due)
        };
        let timeout = Duration::from_millis(timeout.unwrap_or(0) as u64);

        match due {
            Some(due) if due <= start + timeout => {
                if let Some(wait) = due.checked_duration_since(Instant::now()) {
                    thread::sleep(wait);
                }
                let frame = self.inner.lock().unwrap().pending.pop_front();
                Ok(frame.map(|(_, f)| f).into_iter().collect())
            },
            _ => {
                thread::sleep(timeout);
                Err(CanError::channel_timeout(channel))
            }
        }
    }

    fn shutdown(&mut self) {
        self.inner.lock().unwrap().shutdown = true;
    }
}

/// Settings as the unit is polled in the field, with an optional shorter timeout.
pub fn settings(timeout_ms: Option<u64>) -> Settings {
    let mut vars = vec![("MPS_CHANNEL".to_string(), CHANNEL.to_string())];
    if let Some(ms) = timeout_ms {
        vars.push(("MPS_TIMEOUT_MS".into(), ms.to_string()));
    }
    Settings::from_vars(vars).unwrap()
}

pub fn small_catalog() -> Catalog {
    Catalog::from_yaml(r#"
requests:
  - { label: heatersState, payload: "40 03 20 04 00 00 00 00" }
  - { label: heliumLevel,  payload: "40 0A 20 04 00 00 00 00" }
  - { label: canDay,       payload: "40 01 20 01 00 00 00 00" }
"#).unwrap()
}
