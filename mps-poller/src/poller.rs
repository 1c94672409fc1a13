use std::{io::Write, thread, time::{Duration, Instant}};
use derive_getters::Getters;
use mps_can::{utils::hex_string, CanDriver, CanError, Frame, Id};
use crate::{table, Catalog, PollerError, Settings};

/// Received cell of a request nothing answered in time.
pub const PLACEHOLDER: &str = "—";
pub const HEADER: [&str; 3] = ["Command", "Sent Packet", "Received Packet"];

/// What one request sent and what came back.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Row {
    label: String,
    sent: String,
    received: String,
}

impl Row {
    #[inline]
    pub fn is_answered(&self) -> bool {
        self.received != PLACEHOLDER
    }

    #[inline]
    pub fn cells(&self) -> [&str; 3] {
        [self.label.as_str(), self.sent.as_str(), self.received.as_str()]
    }
}

/// Result of one pass over the catalog.
#[derive(Debug, Clone, Getters)]
pub struct Cycle {
    #[getter(copy)]
    index: u64,
    rows: Vec<Row>,
    #[getter(copy)]
    elapsed: Duration,
}

impl Cycle {
    /// Header followed by one line per request.
    pub fn table(&self) -> Vec<[&str; 3]> {
        std::iter::once(HEADER)
            .chain(self.rows.iter().map(Row::cells))
            .collect()
    }
}

/// Owns the bus handle for its whole life and shuts it down on drop.
///
/// Replies are trusted to come from the unit: the kernel filter installed at
/// open time is the only identifier check. A late reply stays queued and is
/// taken as the answer to the next request.
pub struct Poller<D: CanDriver> {
    device: D,
    channel: D::Channel,
    request_id: Id,
    response_id: Id,
    timeout: Duration,
    poll_interval: Duration,
    catalog: Catalog,
    frame_count: u64,
}

impl<D: CanDriver> Poller<D> {
    pub fn new(device: D, channel: D::Channel, settings: &Settings, catalog: Catalog) -> Self {
        Self {
            device,
            channel,
            request_id: settings.request_can_id(),
            response_id: settings.response_can_id(),
            timeout: settings.timeout(),
            poll_interval: settings.poll_interval(),
            catalog,
            frame_count: 0,
        }
    }

    #[inline]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Number of cycles started so far.
    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `payload` and take the first frame received within `timeout` as its answer.
    pub fn send_and_log(&self, payload: &[u8], label: &str, timeout: Duration) -> Result<Row, PollerError> {
        let mut msg = D::Frame::new(self.request_id, payload)
            .ok_or(CanError::DataOutOfRange(payload.len()))?;
        msg.set_channel(self.channel.clone());
        self.device.transmit(msg)?;

        let start = Instant::now();
        let received = match self.wait_reply(timeout)? {
            Some(frame) => {
                log::debug!("MPS - {}: answered after {:?}", label, start.elapsed());
                hex_string(frame.data())
            },
            None => {
                log::debug!("MPS - {}: no answer within {:?}", label, timeout);
                PLACEHOLDER.to_owned()
            },
        };

        Ok(Row {
            label: label.to_owned(),
            sent: hex_string(payload),
            received,
        })
    }

    /// Block the calling thread for `ms` milliseconds.
    #[inline]
    pub fn delay(&self, ms: u64) {
        if ms > 0 {
            thread::sleep(Duration::from_millis(ms));
        }
    }

    /// Run every catalog request once, in order.
    pub fn run_cycle(&mut self) -> Result<Cycle, PollerError> {
        self.frame_count += 1;
        let start = Instant::now();

        let mut rows = Vec::with_capacity(self.catalog.len());
        for request in self.catalog.requests() {
            self.delay(request.pre_delay_ms());
            rows.push(self.send_and_log(request.payload(), request.label(), self.timeout)?);
            self.delay(request.post_delay_ms());
        }

        let cycle = Cycle {
            index: self.frame_count,
            rows,
            elapsed: start.elapsed(),
        };
        log::debug!(
            "MPS - frame #{}: {}/{} answered",
            cycle.index,
            cycle.rows.iter().filter(|r| r.is_answered()).count(),
            cycle.rows.len()
        );

        Ok(cycle)
    }

    /// Print banner, table and frame time for each cycle until `limit`
    /// cycles have run or one fails; the failing cycle prints nothing more.
    pub fn run_cycles<W: Write>(&mut self, out: &mut W, limit: Option<u64>) -> Result<(), PollerError> {
        while limit.map_or(true, |limit| self.frame_count < limit) {
            writeln!(out, "\n================ FRAME #{} ================", self.frame_count + 1)?;
            let cycle = self.run_cycle()?;
            out.write_all(table::render(&cycle.table()).as_bytes())?;
            writeln!(out, ">>>> FRAME TIME: {:.2} seconds", cycle.elapsed.as_secs_f64())?;
            out.flush()?;
        }

        Ok(())
    }

    /// Poll until the first error, which is returned.
    #[inline]
    pub fn run_forever<W: Write>(&mut self, out: &mut W) -> Result<(), PollerError> {
        self.run_cycles(out, None)
    }

    fn wait_reply(&self, timeout: Duration) -> Result<Option<D::Frame>, CanError> {
        let start = Instant::now();
        loop {
            let remaining = match timeout.checked_sub(start.elapsed()) {
                Some(v) if !v.is_zero() => v,
                _ => return Ok(None),
            };
            // never wait past the window, but at least 1ms so the driver does not spin
            let wait = remaining.min(self.poll_interval)
                .as_millis()
                .clamp(1, u32::MAX as u128) as u32;

            match self.device.receive(self.channel.clone(), Some(wait)) {
                Ok(frames) => {
                    if let Some(frame) = frames.into_iter().next() {
                        if frame.id() != self.response_id {
                            log::warn!("MPS - accepted reply with unexpected id {} (expected {})",
                                       frame.id(), self.response_id);
                        }
                        return Ok(Some(frame));
                    }
                },
                Err(e) if e.is_timeout() => {},
                Err(e) => return Err(e),
            }
        }
    }
}

impl<D: CanDriver> Drop for Poller<D> {
    fn drop(&mut self) {
        self.device.shutdown();
        log::debug!("MPS - channel {} shut down after {} frame(s)", self.channel, self.frame_count);
    }
}
