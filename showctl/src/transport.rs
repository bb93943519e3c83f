//! External command transports.
//!
//! Lines typed on the console or sent over a TCP connection are forwarded
//! over one [`mpsc`] channel to the host loop, which feeds them to the same
//! [`Interpreter::execute`](crate::script::Interpreter::execute) entry point
//! the script uses.
//!
//! ```text
//!   stdin thread ──┐
//!   tcp peer A ────┼──► mpsc::Sender<Inbound> ──► Host::run
//!   tcp peer B ────┘
//! ```

use std::fmt;
use std::io::{self, BufRead};
use std::net::SocketAddr;
use std::thread::JoinHandle;

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Channel depth for inbound lines.
pub const INBOUND_CAPACITY: usize = 64;

// ── Inbound ───────────────────────────────────────────────────────────────────

/// Where an inbound line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Console,
    Network(SocketAddr),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Console => f.write_str("console"),
            Origin::Network(peer) => write!(f, "{peer}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// One command line.
    Line { origin: Origin, text: String },
    /// The source reached end of input.
    Closed(Origin),
}

// ── Console ───────────────────────────────────────────────────────────────────

/// Forward every line of `reader` to `tx`, then a [`Inbound::Closed`].
///
/// Blocking; run it on a dedicated thread.
pub fn forward_lines<R: BufRead>(reader: R, origin: Origin, tx: &mpsc::Sender<Inbound>) {
    for line in reader.lines() {
        let text = match line {
            Ok(t) => t,
            Err(e) => {
                warn!("{origin}: read error: {e}");
                break;
            }
        };
        if tx.blocking_send(Inbound::Line { origin, text }).is_err() {
            return; // host loop exited
        }
    }
    let _ = tx.blocking_send(Inbound::Closed(origin));
}

/// Read stdin on a dedicated thread.
///
/// `tokio::io::stdin()` hands each read to the blocking pool, and a read
/// abandoned by `select!` keeps its thread; one thread owning stdin avoids
/// several of them competing for the same descriptor.
pub fn spawn_stdin_reader(tx: mpsc::Sender<Inbound>) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || forward_lines(io::stdin().lock(), Origin::Console, &tx))
}

// ── TCP ───────────────────────────────────────────────────────────────────────

/// Accept connections on `listener` forever, one task per peer.
pub async fn serve(listener: TcpListener, tx: mpsc::Sender<Inbound>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!("{peer}: connected");
                tokio::spawn(connection_task(stream, peer, tx.clone()));
            }
            Err(e) => warn!("accept failed: {e}"),
        }
        if tx.is_closed() {
            return;
        }
    }
}

async fn connection_task(stream: TcpStream, peer: SocketAddr, tx: mpsc::Sender<Inbound>) {
    let origin = Origin::Network(peer);
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(text)) => {
                debug!("{peer}: {text}");
                if tx.send(Inbound::Line { origin, text }).await.is_err() {
                    return;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("{peer}: {e}");
                break;
            }
        }
    }
    info!("{peer}: disconnected");
    let _ = tx.send(Inbound::Closed(origin)).await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn forward_lines_then_closed() {
        let (tx, mut rx) = mpsc::channel(8);
        forward_lines(Cursor::new("flag stars on\nwait duration 1\n"), Origin::Console, &tx);
        let got: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            got,
            [
                Inbound::Line { origin: Origin::Console, text: "flag stars on".into() },
                Inbound::Line { origin: Origin::Console, text: "wait duration 1".into() },
                Inbound::Closed(Origin::Console),
            ]
        );
    }

    #[test]
    fn origin_display() {
        let peer: SocketAddr = "127.0.0.1:7700".parse().unwrap();
        assert_eq!(Origin::Console.to_string(), "console");
        assert_eq!(Origin::Network(peer).to_string(), "127.0.0.1:7700");
    }
}
