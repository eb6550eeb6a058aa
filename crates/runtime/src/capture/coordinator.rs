use super::transaction::{DriverCheckpoint, Transaction};
use super::{Combiner, Documents, Error, Stop};
use futures::future::BoxFuture;
use futures::{FutureExt, Stream, StreamExt};
use proto_flow::flow;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

/// Byte threshold above which a transaction is considered full once a
/// checkpoint closes it out. Reads of the event source pause while the
/// accumulating transaction is full, and resume when the commit of its
/// predecessor resolves. Documents between two checkpoints are never
/// split across transactions: the threshold only stalls the upstream.
/// A static rather than a constant, so that tests may lower it.
pub(crate) static COMBINER_BYTE_THRESHOLD: AtomicUsize = AtomicUsize::new(1 << 27); // 128MB.

/// LogCommitOp resolves when the runtime recovery log has durably
/// committed a transaction.
pub type LogCommitOp = BoxFuture<'static, anyhow::Result<()>>;

/// StartCommitFn is the callback by which a coordinator tells its host
/// that a transaction has started to commit: the host pops the
/// transaction, drains its combiners into durable storage, and supplies
/// an operation of its recovery-log commit via set_log_commit_op.
/// It's called with Ok as each transaction becomes ready, and called
/// exactly once more with the coordinator's terminal Stop, as its final
/// invocation and only after done() has resolved.
pub type StartCommitFn = Box<dyn FnMut(Result<(), Stop>) + Send>;

/// CombinerFactory builds a combiner for each binding of the task.
pub type CombinerFactory<C> = Box<dyn FnMut(&flow::CaptureSpec) -> anyhow::Result<Vec<C>> + Send>;

/// Event of a coordinator's event source.
pub(crate) enum Event {
    /// A document captured by the connector.
    Captured { binding: u32, doc_json: String },
    /// A connector checkpoint, closing out all preceding documents.
    Checkpoint(flow::ConnectorState),
    /// Batches of documents with a checkpoint, pushed by a client.
    Push {
        docs: Vec<Documents>,
        checkpoint: flow::ConnectorState,
        ack: oneshot::Sender<()>,
    },
}

/// Coordinator is the transaction engine shared by the pull and push
/// front-ends. Its state is exclusively owned by a single serving task,
/// and its host interacts with it only through the channels of its
/// Client: no locks protect engine state across suspension points.
pub(crate) struct Coordinator<C: Combiner> {
    /// Transaction which is currently accumulating.
    next: Transaction<C>,
    /// Checkpoints and acknowledgements of the transaction which is
    /// currently committing.
    prior: PriorTransaction,
    /// Has the commit of the prior transaction fully resolved?
    log_committed_done: bool,
    /// Slot through which a transaction which has started to commit is
    /// handed off to the host.
    popped: Arc<Mutex<Option<PoppedTransaction<C>>>>,
    start_commit: StartCommitFn,
    new_combiners: CombinerFactory<C>,
    /// Checkpoint counts to acknowledge to the connector (pull mode).
    ack_tx: Option<mpsc::UnboundedSender<u32>>,
    task: flow::CaptureSpec,
    byte_threshold: usize,
}

#[derive(Default)]
struct PriorTransaction {
    num_checkpoints: u32,
    acks: Vec<oneshot::Sender<()>>,
}

struct PoppedTransaction<C> {
    combiners: Vec<C>,
    checkpoint: DriverCheckpoint,
}

impl<C: Combiner> Coordinator<C> {
    pub fn new(
        task: flow::CaptureSpec,
        range: flow::RangeSpec,
        mut new_combiners: CombinerFactory<C>,
        start_commit: StartCommitFn,
        ack_tx: Option<mpsc::UnboundedSender<u32>>,
    ) -> anyhow::Result<Self> {
        // Captures are split on key ranges only: a partial r-clock range
        // would drop or duplicate captured documents.
        if range.r_clock_begin != 0 || range.r_clock_end != u32::MAX {
            anyhow::bail!(
                "capture shards may be split on key, but not on r-clock: [{}, {}]",
                range.r_clock_begin,
                range.r_clock_end,
            );
        }
        let combiners = new_combiners(&task)?;
        anyhow::ensure!(
            combiners.len() == task.bindings.len(),
            "built {} combiners for a task with {} bindings",
            combiners.len(),
            task.bindings.len(),
        );

        Ok(Self {
            next: Transaction::new(combiners),
            prior: PriorTransaction::default(),
            log_committed_done: true, // Nothing to wait for.
            popped: Arc::new(Mutex::new(None)),
            start_commit,
            new_combiners,
            ack_tx,
            task,
            byte_threshold: COMBINER_BYTE_THRESHOLD.load(Ordering::Relaxed),
        })
    }

    /// Serve the coordinator until it stops, returning its terminal Stop
    /// and the host's StartCommitFn. All other coordinator state,
    /// including the combiners of the accumulating transaction, is
    /// dropped before this routine returns.
    pub async fn serve<S>(
        mut self,
        mut source: S,
        mut commit_ops: mpsc::UnboundedReceiver<LogCommitOp>,
        cancel: CancellationToken,
    ) -> (Stop, StartCommitFn)
    where
        S: Stream<Item = Result<Event, Error>> + Unpin,
    {
        let stop = self
            .serve_inner(&mut source, &mut commit_ops, &cancel)
            .await;
        tracing::debug!(task = %self.task.name, ?stop, "capture coordinator stopped");

        let Self { start_commit, .. } = self;
        (stop, start_commit)
    }

    async fn serve_inner<S>(
        &mut self,
        source: &mut S,
        commit_ops: &mut mpsc::UnboundedReceiver<LogCommitOp>,
        cancel: &CancellationToken,
    ) -> Stop
    where
        S: Stream<Item = Result<Event, Error>> + Unpin,
    {
        let mut drained = false;
        let mut ops_open = true;
        let mut log_commit_op: Option<LogCommitOp> = None;

        loop {
            // Start a commit of `next` if it's eligible, and the commit of
            // its predecessor has fully resolved.
            if self.next.commit_ready() && self.log_committed_done {
                if let Err(err) = self.start_next_commit() {
                    return Stop::Error(err);
                }
                continue;
            }

            // Stop once the source is drained, no commit is in flight, and
            // `next` can no longer become eligible. Trailing documents
            // which were never closed out by a checkpoint are discarded:
            // the connector re-sends them on its next invocation.
            if drained && self.log_committed_done && log_commit_op.is_none() {
                if self.next.num_bytes != 0 {
                    tracing::debug!(
                        bytes = self.next.num_bytes,
                        "discarding trailing documents which have no checkpoint"
                    );
                }
                return Stop::Eof;
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => return Stop::Error(Error::Cancelled),

                // Read the next source event, so long as `next` has
                // capacity. Once a checkpoint lands atop a transaction
                // which is over the byte threshold, reads pause until the
                // commit of the prior transaction resolves.
                event = source.next(), if !drained && !self.next.full => match event {
                    Some(Ok(event)) => {
                        if let Err(err) = self.on_event(event) {
                            return Stop::Error(err);
                        }
                    }
                    Some(Err(err)) => return Stop::Error(err),
                    None => drained = true,
                },

                // The commit of the prior transaction resolved (or failed).
                result = async { log_commit_op.as_mut().unwrap().await }, if log_commit_op.is_some() => {
                    log_commit_op = None;

                    if let Err(err) = result {
                        return Stop::Error(Error::Commit(format!("{err:#}")));
                    }
                    self.on_log_committed();
                }

                // The host delivered the operation which tracks the
                // recovery-log commit of the prior transaction.
                op = commit_ops.recv(), if ops_open => match op {
                    Some(op) if log_commit_op.is_none() && !self.log_committed_done => {
                        log_commit_op = Some(op);
                    }
                    Some(_) => return Stop::Error(Error::Protocol(
                        "unexpected SetLogCommitOp: no started commit is awaiting one".to_string(),
                    )),
                    None => ops_open = false,
                },
            }
        }
    }

    /// Start a commit of the accumulated `next` transaction: build an
    /// empty transaction to replace it, hand the prior transaction off
    /// for the host to pop, and notify the host to start its commit.
    fn start_next_commit(&mut self) -> Result<(), Error> {
        let combiners = match (self.new_combiners)(&self.task) {
            Ok(combiners) if combiners.len() == self.task.bindings.len() => combiners,
            Ok(combiners) => {
                return Err(Error::Combine(format!(
                    "built {} combiners for a task with {} bindings",
                    combiners.len(),
                    self.task.bindings.len(),
                )))
            }
            Err(err) => return Err(Error::Combine(format!("building combiners: {err:#}"))),
        };

        let prior = std::mem::replace(&mut self.next, Transaction::new(combiners));
        tracing::debug!(
            bytes = prior.num_bytes,
            checkpoints = prior.num_checkpoints,
            "transaction has started to commit"
        );

        {
            let mut popped = self.popped.lock().unwrap();
            assert!(
                popped.is_none(),
                "a commit was started, but its transaction was never popped"
            );
            *popped = Some(PoppedTransaction {
                combiners: prior.combiners,
                checkpoint: prior.checkpoint,
            });
        }
        self.prior = PriorTransaction {
            num_checkpoints: prior.num_checkpoints,
            acks: prior.acks,
        };
        self.log_committed_done = false;

        (self.start_commit)(Ok(()));
        Ok(())
    }

    fn on_event(&mut self, event: Event) -> Result<(), Error> {
        match event {
            Event::Captured { binding, doc_json } => self.next.add_document(binding, &doc_json),
            Event::Checkpoint(state) => self.next.add_checkpoint(&state, self.byte_threshold),
            Event::Push {
                docs,
                checkpoint,
                ack,
            } => {
                for Documents { binding, docs_json } in docs {
                    for doc_json in &docs_json {
                        self.next.add_document(binding, doc_json)?;
                    }
                }
                self.next.add_checkpoint(&checkpoint, self.byte_threshold)?;
                self.next.acks.push(ack);
                Ok(())
            }
        }
    }

    fn on_log_committed(&mut self) {
        self.log_committed_done = true;

        let PriorTransaction {
            num_checkpoints,
            acks,
        } = std::mem::take(&mut self.prior);
        tracing::debug!(checkpoints = num_checkpoints, "transaction has committed");

        // Acknowledge committed connector checkpoints (pull mode).
        if let Some(ack_tx) = &self.ack_tx {
            if num_checkpoints != 0 {
                let _ = ack_tx.send(num_checkpoints);
            }
        }
        // Resolve acknowledgements of committed pushes (push mode).
        for ack in acks {
            let _ = ack.send(());
        }
    }
}

/// Client is a handle to a served Coordinator.
pub(crate) struct Client<C: Combiner> {
    popped: Arc<Mutex<Option<PoppedTransaction<C>>>>,
    commit_tx: mpsc::UnboundedSender<LogCommitOp>,
    done_rx: watch::Receiver<Option<Stop>>,
}

impl<C: Combiner> Client<C> {
    /// Pop the combiners and driver checkpoint of a transaction which has
    /// just started to commit. The caller takes ownership: it must drain
    /// the combiners into durable storage before resolving the commit
    /// operation it supplies through set_log_commit_op.
    ///
    /// Panics unless a commit was started since the last pop: calling
    /// pop_transaction other than from a start-commit notification is a
    /// host implementation error.
    pub fn pop_transaction(&self) -> (Vec<C>, DriverCheckpoint) {
        match self.popped.lock().unwrap().take() {
            Some(PoppedTransaction {
                combiners,
                checkpoint,
            }) => (combiners, checkpoint),
            None => panic!("no transaction has started to commit since the last pop_transaction"),
        }
    }

    /// Supply the operation which resolves when the recovery log has
    /// durably committed the popped transaction. Fails if the coordinator
    /// has stopped, in which case done() surfaces its terminal error.
    pub fn set_log_commit_op<F>(&self, op: F) -> Result<(), Error>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.commit_tx.send(op.boxed()).map_err(|_| Error::Shutdown)
    }

    /// Resolve with the terminal Stop of the coordinator.
    /// done() resolves before the final invocation of StartCommitFn.
    pub async fn done(&self) -> Stop {
        let mut done_rx = self.done_rx.clone();
        let stop = match done_rx.wait_for(Option::is_some).await {
            Ok(stop) => stop.clone().unwrap(),
            // The serving task was torn down without publishing a Stop.
            Err(_) => Stop::Error(Error::Shutdown),
        };
        stop
    }

    /// Await the coordinator's stop, mapping a graceful end-of-stream
    /// into Ok.
    pub async fn close(self) -> Result<(), Error> {
        self.done().await.ok()
    }
}

/// Spawn the serving loop of a Coordinator, returning its Client.
pub(crate) fn spawn<C, S>(
    coordinator: Coordinator<C>,
    source: S,
    cancel: CancellationToken,
) -> Client<C>
where
    C: Combiner,
    S: Stream<Item = Result<Event, Error>> + Send + Unpin + 'static,
{
    let (commit_tx, commit_ops) = mpsc::unbounded_channel();
    let (done_tx, done_rx) = watch::channel(None);
    let popped = coordinator.popped.clone();

    tokio::spawn(async move {
        let (stop, mut start_commit) = coordinator.serve(source, commit_ops, cancel).await;

        // Resolve done() before the final start-commit callback: a
        // callback which re-enters set_log_commit_op must observe the
        // shutdown, rather than block on a loop which no longer reads.
        let _ = done_tx.send(Some(stop.clone()));
        (start_commit)(Err(stop));
    });

    Client {
        popped,
        commit_tx,
        done_rx,
    }
}
