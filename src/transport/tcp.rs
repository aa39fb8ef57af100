//! TCP/TLS transport on tokio.
//!
//! Each [`Transport::connect`] spawns one connection task that owns the
//! socket for its whole life, reconnects within the configured policy, and
//! reports through the event channel handed out by [`TcpTransport::new`].
//! Timers are small sleeping tasks that report `TimerFired`.

use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use slirc_wire::{LineCodec, Message, WireError};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use super::{Scheduler, TimerHandle, Transport, TransportConfig, TransportEvent, tls};

/// Flags shared between the transport handle and its connection task.
#[derive(Debug, Default)]
struct Shared {
    /// Bumped by every `connect`; tasks from older generations go quiet.
    generation: u64,
    connected: bool,
    /// An `end` was requested; never reconnect.
    ended: bool,
    /// Drop queued lines instead of flushing them.
    discard_pending: bool,
    /// Reconnect attempts since the last successful registration.
    attempts: u32,
}

#[derive(Debug)]
enum Outbound {
    Line(String),
    End(Option<String>),
}

/// The tokio transport.
#[derive(Debug)]
pub struct TcpTransport {
    events: mpsc::UnboundedSender<TransportEvent>,
    shared: Arc<Mutex<Shared>>,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    task: Option<JoinHandle<()>>,
    timers: HashMap<TimerHandle, JoinHandle<()>>,
    next_timer: u64,
}

impl TcpTransport {
    /// A disconnected transport and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let transport = Self {
            events,
            shared: Arc::new(Mutex::new(Shared::default())),
            outbound: None,
            task: None,
            timers: HashMap::new(),
            next_timer: 0,
        };
        (transport, rx)
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
    }
}

impl Scheduler for TcpTransport {
    fn schedule_after(&mut self, delay: Duration) -> TimerHandle {
        self.timers.retain(|_, timer| !timer.is_finished());
        self.next_timer += 1;
        let handle = TimerHandle(self.next_timer);
        let events = self.events.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(TransportEvent::TimerFired(handle));
        });
        self.timers.insert(handle, timer);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(timer) = self.timers.remove(&handle) {
            timer.abort();
        }
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, config: &TransportConfig) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let generation = {
            let mut shared = self.shared.lock();
            shared.generation += 1;
            shared.connected = false;
            shared.ended = false;
            shared.discard_pending = false;
            shared.attempts = 0;
            shared.generation
        };

        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound = Some(tx);
        let link = Link {
            generation,
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
        };
        self.task = Some(tokio::spawn(run(link, config.clone(), rx)));
    }

    fn write(&mut self, line: &str) {
        match &self.outbound {
            Some(tx) if tx.send(Outbound::Line(line.to_owned())).is_ok() => {}
            _ => debug!(line = %line, "write without a connection dropped"),
        }
    }

    fn end(&mut self, final_line: Option<&str>, immediate: bool) {
        {
            let mut shared = self.shared.lock();
            shared.ended = true;
            shared.discard_pending = immediate;
        }
        if let Some(tx) = &self.outbound {
            let _ = tx.send(Outbound::End(final_line.map(str::to_owned)));
        }
    }

    fn is_connected(&self) -> bool {
        self.shared.lock().connected
    }

    fn registered_successfully(&mut self) {
        self.shared.lock().attempts = 0;
    }
}

// ============================================================================
// Connection task
// ============================================================================

/// The connection task's view of the transport.
struct Link {
    generation: u64,
    shared: Arc<Mutex<Shared>>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl Link {
    fn is_current(&self) -> bool {
        self.shared.lock().generation == self.generation
    }

    fn emit(&self, event: TransportEvent) {
        if self.is_current() {
            let _ = self.events.send(event);
        }
    }

    fn set_connected(&self, connected: bool) {
        let mut shared = self.shared.lock();
        if shared.generation == self.generation {
            shared.connected = connected;
        }
    }

    fn ended(&self) -> bool {
        self.shared.lock().ended
    }
}

/// How a live connection finished.
enum Finish {
    /// `end` was requested or the transport went away.
    Requested,
    /// The peer or the network closed it.
    Lost { had_error: bool },
}

async fn run(link: Link, config: TransportConfig, mut outbound: mpsc::UnboundedReceiver<Outbound>) {
    loop {
        link.emit(TransportEvent::Connecting);
        let finish = match open(&config).await {
            Ok(stream) => match LineCodec::new(&config.encoding) {
                Ok(codec) => {
                    info!(host = %config.host, port = config.port, tls = config.tls, "connected");
                    link.set_connected(true);
                    link.emit(TransportEvent::SocketConnected);
                    let finish = pump(&link, Framed::new(stream, codec), &mut outbound).await;
                    link.set_connected(false);
                    finish
                }
                Err(e) => {
                    warn!(encoding = %config.encoding, error = %e, "unusable encoding");
                    link.emit(TransportEvent::Error(e.to_string()));
                    link.emit(TransportEvent::Close { had_error: true });
                    return;
                }
            },
            Err(e) => {
                warn!(host = %config.host, port = config.port, error = %e, "connect failed");
                link.emit(TransportEvent::Error(e.to_string()));
                Finish::Lost { had_error: true }
            }
        };

        match finish {
            Finish::Requested => {
                link.emit(TransportEvent::Close { had_error: false });
                return;
            }
            Finish::Lost { had_error } => link.emit(TransportEvent::Close { had_error }),
        }

        if !config.auto_reconnect || link.ended() || !link.is_current() {
            return;
        }
        let attempt = {
            let mut shared = link.shared.lock();
            shared.attempts += 1;
            shared.attempts
        };
        if attempt > config.auto_reconnect_max_retries {
            info!(attempts = attempt - 1, "giving up reconnecting");
            return;
        }

        let wait = config.backoff(attempt);
        info!(attempt, wait_ms = wait.as_millis() as u64, "reconnecting");
        link.emit(TransportEvent::Reconnecting {
            attempt,
            max_retries: config.auto_reconnect_max_retries,
            wait,
        });

        let sleep = tokio::time::sleep(wait);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                () = &mut sleep => break,
                command = outbound.recv() => match command {
                    Some(Outbound::Line(line)) => debug!(line = %line, "dropping line while reconnecting"),
                    Some(Outbound::End(_)) | None => return,
                },
            }
        }
    }
}

async fn open(config: &TransportConfig) -> io::Result<ClientStream> {
    let tcp = TcpStream::connect((config.host.as_str(), config.port)).await?;
    tcp.set_nodelay(true)?;
    if config.tls {
        let stream = tls::connect(tcp, &config.host, config.tls_verify).await?;
        Ok(ClientStream::Tls(Box::new(stream)))
    } else {
        Ok(ClientStream::Plain(tcp))
    }
}

/// Move lines both ways until either side finishes.
async fn pump(
    link: &Link,
    mut framed: Framed<ClientStream, LineCodec>,
    outbound: &mut mpsc::UnboundedReceiver<Outbound>,
) -> Finish {
    loop {
        tokio::select! {
            frame = framed.next() => match frame {
                Some(Ok(raw)) => {
                    if raw.trim().is_empty() {
                        continue;
                    }
                    match raw.parse::<Message>() {
                        Ok(message) => link.emit(TransportEvent::Message { message, raw }),
                        Err(e) => debug!(line = %raw, error = %e, "unparseable line skipped"),
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "read failed");
                    link.emit(TransportEvent::Error(e.to_string()));
                    return Finish::Lost { had_error: true };
                }
                None => {
                    info!("connection closed by peer");
                    return Finish::Lost { had_error: false };
                }
            },
            command = outbound.recv() => match command {
                Some(Outbound::Line(line)) => {
                    if link.shared.lock().discard_pending {
                        continue;
                    }
                    match framed.send(line).await {
                        Ok(()) => {}
                        Err(WireError::IllegalControlChar(ch)) => {
                            warn!(?ch, "outbound line with a line break dropped");
                        }
                        Err(e) => {
                            warn!(error = %e, "write failed");
                            link.emit(TransportEvent::Error(e.to_string()));
                            return Finish::Lost { had_error: true };
                        }
                    }
                }
                Some(Outbound::End(final_line)) => {
                    if let Some(line) = final_line
                        && let Err(e) = framed.send(line).await
                    {
                        debug!(error = %e, "final line not delivered");
                    }
                    if let Err(e) = framed.close().await {
                        debug!(error = %e, "close failed");
                    }
                    return Finish::Requested;
                }
                None => return Finish::Requested,
            },
        }
    }
}

// ============================================================================
// Stream
// ============================================================================

/// Plain or TLS client stream.
enum ClientStream {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for ClientStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ClientStream::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            ClientStream::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ClientStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            ClientStream::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            ClientStream::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ClientStream::Plain(stream) => Pin::new(stream).poll_flush(cx),
            ClientStream::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ClientStream::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            ClientStream::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}
