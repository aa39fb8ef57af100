//! slirc-client - a small IRC client on top of the session layer.
//!
//! Loads a TOML config, connects, logs every event and joins the configured
//! channels once registered. Ctrl-C quits.

use slirc_client::config::BotConfig;
use slirc_client::{ClientConfig, Event, EventFilter, Session, TcpTransport, Transport};
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = ClientConfig::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    let (transport, mut transport_events) = TcpTransport::new();
    let mut session = Session::new(transport);
    let mut events = session.subscribe(EventFilter::All);
    session.connect(Some(config.connection.clone()))?;
    info!(
        host = %session.options().host,
        port = session.options().port,
        nick = %session.options().nick,
        "Starting slirc-client"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut quitting = false;

    loop {
        tokio::select! {
            event = transport_events.recv() => {
                let Some(event) = event else { break };
                session.handle_transport_event(event);
            }
            result = &mut shutdown, if !quitting => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                }
                info!("Shutting down");
                quitting = true;
                if session.transport().is_connected() {
                    session.quit(Some("Shutting down"));
                } else {
                    break;
                }
            }
        }

        while let Ok(event) = events.try_recv() {
            if quitting && matches!(event, Event::Close { .. }) {
                info!("Disconnected");
                return Ok(());
            }
            react(&mut session, &config.bot, &event);
        }
    }

    Ok(())
}

fn react(session: &mut Session<TcpTransport>, bot: &BotConfig, event: &Event) {
    match event {
        Event::Raw { line, from_server } => trace!(from_server, line = %line, "raw"),
        Event::Connected { nick } => {
            info!(nick = %nick, "Registered");
            for channel in &bot.channels {
                session.join(channel, None);
            }
        }
        Event::Privmsg(message) => {
            info!(from = %message.nick, to = %message.target, text = %message.message, "privmsg");
            if bot.answer_ping && message.message.trim() == "!ping" {
                session.reply(message, "pong");
            }
        }
        Event::Reconnecting {
            attempt,
            max_retries,
            wait,
        } => warn!(attempt, max_retries, wait_ms = wait.as_millis() as u64, "Reconnecting"),
        Event::PingTimeout { seconds } => warn!(seconds, "Ping timeout"),
        Event::ServerError { message } => warn!(message = %message, "Server error"),
        // Re-emitted copies of privmsg/notice/action.
        Event::Message(_) => {}
        other => debug!(event = ?other, "event"),
    }
}
