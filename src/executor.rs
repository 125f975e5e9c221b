//! Reduction driver.
//!
//! Launches a reducer as its own task and wires up the channels around it.
//! The producer owns the entry sender and closes the stream by dropping it;
//! the consumer awaits the single result.

use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument, debug, info, info_span};

use crate::entry::Entry;
use crate::error::ReduceError;
use crate::reducer::{EntryReceiver, EntrySender, Reducer};
use crate::reduction::Reduction;

/// Create a bounded entry channel.
pub fn entry_channel(capacity: usize) -> Result<(EntrySender, EntryReceiver), ReduceError> {
    if capacity == 0 {
        return Err(ReduceError::InvalidCapacity);
    }
    Ok(mpsc::channel(capacity))
}

/// A reduction running on its own task.
#[derive(Debug)]
pub struct PendingReduction {
    name: String,
    result: oneshot::Receiver<Reduction>,
}

impl PendingReduction {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the single result.
    ///
    /// Never resolves while the input stream stays open, except for
    /// pass-through reducers.
    pub async fn wait(self) -> Result<Reduction, ReduceError> {
        self.result
            .await
            .map_err(|_| ReduceError::ResultDropped(self.name))
    }

    /// The result if it has already been emitted.
    pub fn try_take(&mut self) -> Option<Reduction> {
        self.result.try_recv().ok()
    }
}

/// Spawn `reducer` on the current tokio runtime, reading from `input`.
pub fn spawn_reducer(reducer: Box<dyn Reducer>, input: EntryReceiver) -> PendingReduction {
    let name = reducer.name().to_string();
    let (result_tx, result_rx) = oneshot::channel();
    let span = info_span!("reduction", reducer = %name);
    tokio::spawn(
        async move {
            debug!("reduction started");
            reducer.reduce(input, result_tx).await;
            debug!("reduction emitted");
        }
        .instrument(span),
    );
    PendingReduction {
        name,
        result: result_rx,
    }
}

/// Feed `entries` through `reducer` and return its result.
///
/// Entries are sent from a separate producer task that closes the stream
/// once the iterator is exhausted. For a pass-through reducer the returned
/// stream keeps receiving from that producer while the caller drains it.
pub async fn reduce_entries<I>(
    reducer: Box<dyn Reducer>,
    entries: I,
    capacity: usize,
) -> Result<Reduction, ReduceError>
where
    I: IntoIterator<Item = Entry>,
    I::IntoIter: Send + 'static,
{
    let (tx, rx) = entry_channel(capacity)?;
    let pending = spawn_reducer(reducer, rx);
    let name = pending.name().to_string();

    let entries = entries.into_iter();
    tokio::spawn(
        async move {
            let mut sent: u64 = 0;
            for entry in entries {
                if tx.send(entry).await.is_err() {
                    debug!(sent, "entry stream closed by consumer");
                    return;
                }
                sent += 1;
            }
            debug!(sent, "entry stream exhausted");
        }
        .instrument(info_span!("producer", reducer = %name)),
    );

    let reduction = pending.wait().await?;
    info!(reducer = %name, result = %reduction, "reduction complete");
    Ok(reduction)
}

/// Receive every remaining entry of a forwarded stream.
pub async fn drain(mut stream: EntryReceiver) -> Vec<Entry> {
    let mut entries = Vec::new();
    while let Some(entry) = stream.recv().await {
        entries.push(entry);
    }
    entries
}
