use super::coordinator::{self, Coordinator, Event};
use super::{Combiner, Documents, DriverCheckpoint, Error, Extractor, Stop};
use futures::StreamExt;
use proto_flow::flow;
use std::future::Future;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

/// PushClient is a handle to a capture coordinator into which clients
/// push batches of documents with checkpoints, and are acknowledged as
/// those checkpoints commit.
pub struct PushClient<C: Combiner> {
    client: coordinator::Client<C>,
    push_tx: mpsc::UnboundedSender<Event>,
}

impl<C: Combiner> PushClient<C> {
    /// Open a push coordinator of the given task, with an extractor per
    /// binding which validates pushed documents.
    pub fn open<E, NC, NE, SC>(
        task: flow::CaptureSpec,
        version: String,
        range: flow::RangeSpec,
        new_combiners: NC,
        new_extractors: NE,
        start_commit: SC,
        cancel: CancellationToken,
    ) -> anyhow::Result<Self>
    where
        E: Extractor,
        NC: FnMut(&flow::CaptureSpec) -> anyhow::Result<Vec<C>> + Send + 'static,
        NE: FnOnce(&flow::CaptureSpec) -> anyhow::Result<Vec<E>>,
        SC: FnMut(Result<(), Stop>) + Send + 'static,
    {
        let mut extractors = new_extractors(&task)?;
        anyhow::ensure!(
            extractors.len() == task.bindings.len(),
            "built {} extractors for a task with {} bindings",
            extractors.len(),
            task.bindings.len(),
        );

        tracing::info!(task = %task.name, %version, "opened capture push client");

        let coordinator = Coordinator::new(
            task,
            range,
            Box::new(new_combiners),
            Box::new(start_commit),
            None,
        )?;

        let (push_tx, push_rx) = mpsc::unbounded_channel();

        // Pushed documents are validated against binding extractors as
        // they're read by the coordinator.
        let source = UnboundedReceiverStream::new(push_rx)
            .map(move |event| validate_push(&mut extractors, event))
            .boxed();

        let client = coordinator::spawn(coordinator, source, cancel);
        Ok(Self { client, push_tx })
    }

    /// Push batches of documents and an accompanying checkpoint.
    ///
    /// `ack` resolves when the checkpoint has fully committed to the
    /// recovery log. If the coordinator stops first then `ack` is instead
    /// dropped without resolution: callers must monitor done().
    /// Fails if the coordinator has already stopped.
    pub fn push(
        &self,
        docs: Vec<Documents>,
        checkpoint: flow::ConnectorState,
        ack: oneshot::Sender<()>,
    ) -> Result<(), Error> {
        self.push_tx
            .send(Event::Push {
                docs,
                checkpoint,
                ack,
            })
            .map_err(|_| Error::Shutdown)
    }

    /// Pop the combiners and driver checkpoint of a transaction which has
    /// just started to commit. Panics unless a commit was started since
    /// the last pop.
    pub fn pop_transaction(&self) -> (Vec<C>, DriverCheckpoint) {
        self.client.pop_transaction()
    }

    /// Supply the operation which resolves when the recovery log has
    /// durably committed the popped transaction.
    pub fn set_log_commit_op<F>(&self, op: F) -> Result<(), Error>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.client.set_log_commit_op(op)
    }

    /// Resolve with the terminal Stop of the coordinator.
    pub async fn done(&self) -> Stop {
        self.client.done().await
    }

    /// Await the coordinator's stop, mapping a graceful end-of-stream
    /// into Ok.
    pub async fn close(self) -> Result<(), Error> {
        self.client.close().await
    }
}

fn validate_push<E: Extractor>(extractors: &mut [E], event: Event) -> Result<Event, Error> {
    let bindings = extractors.len();

    let Event::Push { docs, .. } = &event else {
        unreachable!("push sources only produce Push events");
    };
    for Documents { binding, docs_json } in docs {
        let Some(extractor) = extractors.get_mut(*binding as usize) else {
            return Err(Error::InvalidBinding {
                binding: *binding,
                bindings,
            });
        };
        for doc_json in docs_json {
            if let Err(err) = extractor.extract(doc_json) {
                return Err(Error::Validation(format!(
                    "document of binding {binding}: {err:#}"
                )));
            }
        }
    }
    Ok(event)
}
