//! slirc-client - Straylight IRC client session layer
//!
//! A [`Session`] sits between a [`Transport`] and a [`Dispatcher`]. It
//! drives registration, keeps the connection alive, runs the raw and parsed
//! middleware chains, correlates query replies and formats everything it
//! sends.
//!
//! ```no_run
//! use slirc_client::{ConnectOptions, EventFilter, Session, TcpTransport};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let (transport, mut transport_events) = TcpTransport::new();
//! let mut session = Session::new(transport);
//! let mut events = session.subscribe(EventFilter::All);
//!
//! session.connect(Some(ConnectOptions {
//!     host: Some("irc.example.net".into()),
//!     nick: Some("straylight".into()),
//!     ..ConnectOptions::default()
//! }))?;
//!
//! while let Some(event) = transport_events.recv().await {
//!     session.handle_transport_event(event);
//!     while let Ok(event) = events.try_recv() {
//!         println!("{event:?}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod correlation;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod keepalive;
pub mod network;
pub mod outbound;
pub mod pipeline;
pub mod session;
pub mod transport;

pub use config::{ClientConfig, ClientOptions, ConnectOptions, WebircOptions};
pub use correlation::{ListenerHandle, Query};
pub use dispatch::{DispatchContext, Dispatcher, IrcDispatcher};
pub use error::{ClientError, PipelineAbort};
pub use event::{Event, EventFilter, EventKind, MessageEvent, MessageKind};
pub use network::NetworkInfo;
pub use outbound::{Param, raw_line};
pub use session::{Session, SessionState, UserState};
pub use transport::{
    Scheduler, TcpTransport, TimerHandle, Transport, TransportConfig, TransportEvent,
};
