//! Clause exchange between portfolio workers.
//!
//! Each worker holds a [`SharePort`]. Exported clauses travel to a hub
//! thread which, once per interval, forwards every pending clause to all
//! ports except the one it came from.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, select, Receiver, Sender};
use satfolio_core::Lit;
use tracing::{debug, trace, warn};

/// A clause on its way through the hub.
#[derive(Debug)]
struct Envelope {
    origin: usize,
    lits: Arc<[Lit]>,
}

/// One worker's connection to the exchange.
#[derive(Debug)]
pub struct SharePort {
    origin: usize,
    max_len: usize,
    outbox: Sender<Envelope>,
    inbox: Receiver<Arc<[Lit]>>,
}

impl SharePort {
    /// Ordinal of the worker owning this port.
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// Longest clause this port accepts for export.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Offers a clause to the other workers.
    ///
    /// Returns false when the clause is empty, too long, or the hub is gone.
    pub fn export(&self, lits: &[Lit]) -> bool {
        if lits.is_empty() || lits.len() > self.max_len {
            return false;
        }
        self.outbox
            .send(Envelope {
                origin: self.origin,
                lits: Arc::from(lits),
            })
            .is_ok()
    }

    /// Drains clauses forwarded from other workers without blocking.
    pub fn imports(&self) -> impl Iterator<Item = Arc<[Lit]>> + '_ {
        self.inbox.try_iter()
    }
}

/// The hub side of the exchange, before it is started.
pub struct ClauseExchange {
    inbound: Receiver<Envelope>,
    peers: Vec<Sender<Arc<[Lit]>>>,
}

impl ClauseExchange {
    /// Creates an exchange for `workers` ports.
    pub fn new(workers: usize, max_len: usize) -> (Self, Vec<SharePort>) {
        let (outbox, inbound) = channel::unbounded();
        let mut peers = Vec::with_capacity(workers);
        let mut ports = Vec::with_capacity(workers);
        for origin in 0..workers {
            let (tx, rx) = channel::unbounded();
            peers.push(tx);
            ports.push(SharePort {
                origin,
                max_len,
                outbox: outbox.clone(),
                inbox: rx,
            });
        }
        (Self { inbound, peers }, ports)
    }

    /// Spawns the hub thread.
    pub fn start(self, interval: Duration) -> std::io::Result<ExchangeHandle> {
        let (shutdown, shutdown_rx) = channel::bounded::<()>(1);
        let thread = thread::Builder::new()
            .name("satfolio-exchange".to_string())
            .spawn(move || self.run(interval, shutdown_rx))?;
        Ok(ExchangeHandle {
            shutdown: Some(shutdown),
            thread: Some(thread),
        })
    }

    fn run(self, interval: Duration, shutdown: Receiver<()>) -> u64 {
        let ticker = channel::tick(interval);
        let mut forwarded = 0u64;
        loop {
            select! {
                recv(shutdown) -> _ => break,
                recv(ticker) -> _ => forwarded += self.forward_pending(),
            }
        }
        forwarded
    }

    fn forward_pending(&self) -> u64 {
        let mut count = 0;
        for envelope in self.inbound.try_iter() {
            for (ordinal, peer) in self.peers.iter().enumerate() {
                if ordinal != envelope.origin {
                    // A worker that finished has dropped its port.
                    let _ = peer.send(Arc::clone(&envelope.lits));
                }
            }
            count += 1;
        }
        if count > 0 {
            trace!(event = "clauses_forwarded", count = count);
        }
        count
    }

    /// Forwards whatever is pending right now, on the calling thread.
    pub fn forward_now(&self) -> u64 {
        self.forward_pending()
    }
}

/// A running hub; stop it to learn how many clauses were forwarded.
pub struct ExchangeHandle {
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<u64>>,
}

impl ExchangeHandle {
    /// Stops and joins the hub thread.
    pub fn stop(mut self) -> u64 {
        self.shutdown_and_join()
    }

    fn shutdown_and_join(&mut self) -> u64 {
        // Dropping the sender disconnects the shutdown channel.
        self.shutdown.take();
        let Some(thread) = self.thread.take() else {
            return 0;
        };
        match thread.join() {
            Ok(forwarded) => {
                debug!(event = "sharing_stopped", forwarded = forwarded);
                forwarded
            }
            Err(_) => {
                warn!(event = "sharing_stopped", panicked = true);
                0
            }
        }
    }
}

impl Drop for ExchangeHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.shutdown_and_join();
        }
    }
}
