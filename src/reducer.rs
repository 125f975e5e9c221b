//! Reducer trait and implementations.
//!
//! A `Reducer` drains a channel of entries and sends exactly one `Reduction`
//! on its output channel. Reducers are launched as independent tasks; the
//! result channel is the only way to observe completion.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument, debug, debug_span, warn};

use crate::dsl::ReducerSpec;
use crate::entry::Entry;
use crate::error::ReduceError;
use crate::reduction::{FieldValues, Reduction};

/// Producer side of an entry stream. Dropping every sender closes the stream.
pub type EntrySender = mpsc::Sender<Entry>;
/// Consumer side of an entry stream.
pub type EntryReceiver = mpsc::Receiver<Entry>;
/// Single-use result channel.
pub type ReductionSender = oneshot::Sender<Reduction>;

/// A single-pass aggregation over a stream of entries.
///
/// `reduce` consumes the reducer, so an instance serves exactly one pass.
/// Implementations must send exactly one value on `output` and must not fail
/// on malformed entries.
#[async_trait]
pub trait Reducer: Send {
    /// Drain `input` until it closes, then send the result on `output`.
    async fn reduce(self: Box<Self>, input: EntryReceiver, output: ReductionSender);

    /// The display name of this reducer.
    fn name(&self) -> &str;

    /// Whether the result is an aggregate. Only pass-through reducers return
    /// `false`.
    fn aggregates(&self) -> bool {
        true
    }
}

fn emit(name: &str, output: ReductionSender, reduction: Reduction) {
    if output.send(reduction).is_err() {
        debug!(reducer = name, "result receiver dropped before emission");
    }
}

fn zeroed(fields: &[String]) -> FieldValues {
    fields.iter().map(|name| (name.clone(), 0.0)).collect()
}

fn dedup_fields<I, S>(fields: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut unique: Vec<String> = Vec::new();
    for field in fields {
        let field = field.into();
        if !unique.contains(&field) {
            unique.push(field);
        }
    }
    unique
}

// ---------------------------------------------------------------------------
// Reducer implementations
// ---------------------------------------------------------------------------

/// READALL - hands the input stream back unread.
pub struct ReadAll;

#[async_trait]
impl Reducer for ReadAll {
    async fn reduce(self: Box<Self>, input: EntryReceiver, output: ReductionSender) {
        emit(self.name(), output, Reduction::Forwarded(input));
    }

    fn name(&self) -> &str {
        "READALL"
    }

    fn aggregates(&self) -> bool {
        false
    }
}

/// COUNT - counts entries regardless of content.
pub struct Count;

#[async_trait]
impl Reducer for Count {
    async fn reduce(self: Box<Self>, mut input: EntryReceiver, output: ReductionSender) {
        let mut count: u64 = 0;
        while input.recv().await.is_some() {
            count += 1;
        }
        debug!(count, "count drained");
        emit(self.name(), output, Reduction::Count(count));
    }

    fn name(&self) -> &str {
        "COUNT"
    }
}

/// SUM f1, f2, ... - sums the numeric values of each field.
///
/// Every configured field appears in the result, with 0 when no value for it
/// was ever numeric.
pub struct Sum {
    fields: Vec<String>,
}

impl Sum {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: dedup_fields(fields),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

#[async_trait]
impl Reducer for Sum {
    async fn reduce(self: Box<Self>, mut input: EntryReceiver, output: ReductionSender) {
        let mut sums = zeroed(&self.fields);
        while let Some(entry) = input.recv().await {
            for (name, total) in sums.iter_mut() {
                if let Ok(value) = entry.float_field(name) {
                    *total += value;
                }
            }
        }
        emit(self.name(), output, Reduction::FieldSums(sums));
    }

    fn name(&self) -> &str {
        "SUM"
    }
}

/// AVG f1, f2, ... - mean of the numeric values of each field.
///
/// Values that are missing or not numeric are left out of both the total and
/// the divisor.
pub struct Avg {
    fields: Vec<String>,
}

impl Avg {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: dedup_fields(fields),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

#[async_trait]
impl Reducer for Avg {
    async fn reduce(self: Box<Self>, mut input: EntryReceiver, output: ReductionSender) {
        let mut totals: BTreeMap<String, (f64, u64)> = self
            .fields
            .iter()
            .map(|name| (name.clone(), (0.0, 0)))
            .collect();

        while let Some(entry) = input.recv().await {
            for (name, (total, seen)) in totals.iter_mut() {
                if let Ok(value) = entry.float_field(name) {
                    *total += value;
                    *seen += 1;
                }
            }
        }

        let averages: FieldValues = totals
            .into_iter()
            .map(|(name, (total, seen))| {
                let mean = if seen == 0 { 0.0 } else { total / seen as f64 };
                (name, mean)
            })
            .collect();
        emit(self.name(), output, Reduction::FieldAverages(averages));
    }

    fn name(&self) -> &str {
        "AVG"
    }
}

/// Default capacity of each chained reducer's channel.
pub const DEFAULT_CHAIN_CAPACITY: usize = 64;

/// CHAIN r1 | r2 | ... - feeds one stream to several aggregating reducers.
///
/// Each child runs as its own task behind a bounded channel. The result
/// holds one reduction per child, in chain order; a child that ends without
/// emitting is reported as `Reduction::Missing` in its slot.
pub struct Chain {
    reducers: Vec<Box<dyn Reducer>>,
    capacity: usize,
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.reducers.iter().map(|r| r.name()).collect();
        f.debug_struct("Chain")
            .field("reducers", &names)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Chain {
    pub fn new(reducers: Vec<Box<dyn Reducer>>) -> Result<Self, ReduceError> {
        Self::with_capacity(reducers, DEFAULT_CHAIN_CAPACITY)
    }

    pub fn with_capacity(
        reducers: Vec<Box<dyn Reducer>>,
        capacity: usize,
    ) -> Result<Self, ReduceError> {
        if capacity == 0 {
            return Err(ReduceError::InvalidCapacity);
        }
        if let Some(passthrough) = reducers.iter().find(|r| !r.aggregates()) {
            return Err(ReduceError::NonAggregating(passthrough.name().to_string()));
        }
        Ok(Self { reducers, capacity })
    }

    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }
}

#[async_trait]
impl Reducer for Chain {
    async fn reduce(self: Box<Self>, mut input: EntryReceiver, output: ReductionSender) {
        let Chain { reducers, capacity } = *self;
        let mut senders: Vec<Option<EntrySender>> = Vec::with_capacity(reducers.len());
        let mut pending = Vec::with_capacity(reducers.len());

        for (index, reducer) in reducers.into_iter().enumerate() {
            let (tx, rx) = mpsc::channel(capacity);
            let (result_tx, result_rx) = oneshot::channel();
            let name = reducer.name().to_string();
            let span = debug_span!("chained", index, reducer = %name);
            tokio::spawn(reducer.reduce(rx, result_tx).instrument(span));
            senders.push(Some(tx));
            pending.push((name, result_rx));
        }

        while let Some(entry) = input.recv().await {
            for (slot, (name, _)) in senders.iter_mut().zip(&pending) {
                let closed = match slot {
                    Some(tx) => tx.send(entry.clone()).await.is_err(),
                    None => false,
                };
                if closed {
                    warn!(reducer = %name, "chained reducer stopped receiving");
                    *slot = None;
                }
            }
        }
        drop(senders);

        let mut results = Vec::with_capacity(pending.len());
        for (name, result_rx) in pending {
            match result_rx.await {
                Ok(reduction) => results.push(reduction),
                Err(_) => {
                    warn!(reducer = %name, "chained reducer ended without a result");
                    results.push(Reduction::Missing(name));
                }
            }
        }
        emit("CHAIN", output, Reduction::Chain(results));
    }

    fn name(&self) -> &str {
        "CHAIN"
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create a `Reducer` from a parsed `ReducerSpec`.
///
/// `capacity` sizes the per-child channels of a chain.
pub fn spec_to_reducer(
    spec: &ReducerSpec,
    capacity: usize,
) -> Result<Box<dyn Reducer>, ReduceError> {
    match spec {
        ReducerSpec::ReadAll => Ok(Box::new(ReadAll)),
        ReducerSpec::Count => Ok(Box::new(Count)),
        ReducerSpec::Sum { fields } => Ok(Box::new(Sum::new(fields.iter().cloned()))),
        ReducerSpec::Avg { fields } => Ok(Box::new(Avg::new(fields.iter().cloned()))),
        ReducerSpec::Chain { reducers } => {
            let children = reducers
                .iter()
                .map(|child| spec_to_reducer(child, capacity))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Box::new(Chain::with_capacity(children, capacity)?))
        }
    }
}
