//! TCP connector.
//!
//! Newline-delimited JSON frames over a plain TCP stream. Connecting,
//! reading and writing happen on background threads; the session only
//! ever sees crossbeam channels, so `open`, `send` and `poll` never block.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use sortis_shared::constants::MAX_FRAME_SIZE;
use sortis_shared::Frame;
use tracing::{debug, warn};

use super::{Connector, ConnectorEvent};
use crate::error::{TransportError, TransportResult};

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Socket of one `open()`, shared with its connect thread.
#[derive(Debug, Default)]
struct StreamSlot {
    stream: Option<TcpStream>,
    closed: bool,
}

impl StreamSlot {
    /// Parks the stream, unless `close` already ran. Then the stream is
    /// handed back.
    fn park(&mut self, stream: TcpStream) -> Option<TcpStream> {
        if self.closed {
            return Some(stream);
        }
        self.stream = Some(stream);
        None
    }

    fn close(&mut self) {
        self.closed = true;
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                warn!(error = %e, "tcp shutdown failed");
            }
        }
    }
}

/// TCP connector.
#[derive(Debug)]
pub struct TcpConnector {
    addr: SocketAddr,
    connect_timeout: Duration,
    events: Option<Receiver<ConnectorEvent>>,
    frames: Option<Sender<Frame>>,
    slot: Option<Arc<Mutex<StreamSlot>>>,
}

impl TcpConnector {
    /// Connector for `addr`.
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            events: None,
            frames: None,
            slot: None,
        }
    }

    /// Overrides the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Server address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }
}

fn read_loop(stream: TcpStream, events: &Sender<ConnectorEvent>) {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        line.clear();
        // One byte past the limit is enough to tell an oversized frame.
        let limit = MAX_FRAME_SIZE as u64 + 1;
        match reader.by_ref().take(limit).read_line(&mut line) {
            Ok(0) => break,
            Ok(n) if n > MAX_FRAME_SIZE => {
                let _ = events.send(ConnectorEvent::Failed(TransportError::Codec(format!(
                    "frame exceeds {MAX_FRAME_SIZE} bytes"
                ))));
                break;
            }
            Ok(_) => {
                if line.trim().is_empty() {
                    continue;
                }
                let event = match Frame::decode(&line) {
                    Ok(frame) => ConnectorEvent::Frame(frame),
                    Err(e) => ConnectorEvent::Failed(e.into()),
                };
                if events.send(event).is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = events.send(ConnectorEvent::Failed(e.into()));
                break;
            }
        }
    }
    let _ = events.send(ConnectorEvent::Closed);
}

fn write_loop(mut stream: TcpStream, frames: &Receiver<Frame>, events: &Sender<ConnectorEvent>) {
    for frame in frames {
        let result = frame
            .encode()
            .map_err(TransportError::from)
            .and_then(|mut line| {
                line.push('\n');
                stream.write_all(line.as_bytes()).map_err(TransportError::from)
            });
        if let Err(e) = result {
            let _ = events.send(ConnectorEvent::Failed(e));
            let _ = events.send(ConnectorEvent::Closed);
            return;
        }
    }
    debug!("tcp writer finished");
}

impl Connector for TcpConnector {
    fn open(&mut self) -> TransportResult<()> {
        self.close();

        let (event_tx, event_rx) = unbounded();
        let (frame_tx, frame_rx) = unbounded::<Frame>();
        self.events = Some(event_rx);
        self.frames = Some(frame_tx);

        let addr = self.addr;
        let timeout = self.connect_timeout;
        let slot = Arc::new(Mutex::new(StreamSlot::default()));
        self.slot = Some(Arc::clone(&slot));

        thread::Builder::new()
            .name("sortis-net-io".into())
            .spawn(move || {
                let stream = match TcpStream::connect_timeout(&addr, timeout) {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = event_tx.send(ConnectorEvent::Failed(
                            TransportError::ConnectionRefused(e.to_string()),
                        ));
                        let _ = event_tx.send(ConnectorEvent::Closed);
                        return;
                    }
                };
                let _ = stream.set_nodelay(true);
                let clones = stream
                    .try_clone()
                    .and_then(|r| stream.try_clone().map(|s| (r, s)));
                let (reader, shutdown_handle) = match clones {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = event_tx.send(ConnectorEvent::Failed(e.into()));
                        let _ = event_tx.send(ConnectorEvent::Closed);
                        return;
                    }
                };
                if let Some(late) = slot.lock().park(shutdown_handle) {
                    debug!("connector closed while connecting, dropping socket");
                    let _ = late.shutdown(Shutdown::Both);
                    return;
                }

                let reader_events = event_tx.clone();
                let spawned = thread::Builder::new()
                    .name("sortis-net-read".into())
                    .spawn(move || read_loop(reader, &reader_events));
                if let Err(e) = spawned {
                    let _ = event_tx.send(ConnectorEvent::Failed(e.into()));
                    let _ = event_tx.send(ConnectorEvent::Closed);
                    return;
                }

                let _ = event_tx.send(ConnectorEvent::Opened);
                write_loop(stream, &frame_rx, &event_tx);
            })?;
        Ok(())
    }

    fn close(&mut self) {
        // Dropping the sender ends the writer; shutdown ends the reader.
        self.frames = None;
        self.events = None;
        if let Some(slot) = self.slot.take() {
            slot.lock().close();
        }
    }

    fn send(&mut self, frame: Frame) -> TransportResult<()> {
        self.frames
            .as_ref()
            .ok_or(TransportError::NotConnected)?
            .send(frame)
            .map_err(|_| TransportError::ConnectionClosed)
    }

    fn poll(&mut self) -> Option<ConnectorEvent> {
        self.events.as_ref()?.try_recv().ok()
    }
}

impl Drop for TcpConnector {
    fn drop(&mut self) {
        self.close();
    }
}
