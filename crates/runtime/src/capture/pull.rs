use super::coordinator::{self, Coordinator};
use super::{protocol, Combiner, DriverCheckpoint, Error, Stop};
use anyhow::Context;
use futures::{Stream, StreamExt};
use proto_flow::capture::{request, Request, Response};
use proto_flow::flow;
use std::future::Future;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Buffered requests of the connector stream's send half.
const REQUEST_BUFFER: usize = 4;

/// PullClient is a handle to a capture coordinator which pulls documents
/// and checkpoints from a long-lived connector stream, and acknowledges
/// committed checkpoints back to it.
pub struct PullClient<C: Combiner> {
    client: coordinator::Client<C>,
}

impl<C: Combiner> PullClient<C> {
    /// Open a connector stream and serve a capture coordinator over it.
    ///
    /// `connector` is called with the channel of requests to send, and
    /// returns the connector's stream of responses. `state` is the
    /// last-committed connector state, and `tail` tells the connector
    /// whether to run indefinitely (true) or exit upon reaching the
    /// current end of available documents. `start_commit` is notified as
    /// transactions start to commit, and one final time with the
    /// coordinator's terminal Stop.
    pub async fn open<NC, SC, F, Fut, R>(
        task: flow::CaptureSpec,
        version: String,
        range: flow::RangeSpec,
        state: serde_json::Value,
        tail: bool,
        new_combiners: NC,
        start_commit: SC,
        connector: F,
        cancel: CancellationToken,
    ) -> anyhow::Result<Self>
    where
        NC: FnMut(&flow::CaptureSpec) -> anyhow::Result<Vec<C>> + Send + 'static,
        SC: FnMut(Result<(), Stop>) + Send + 'static,
        F: FnOnce(mpsc::Receiver<Request>) -> Fut,
        Fut: Future<Output = anyhow::Result<R>>,
        R: Stream<Item = Result<Response, tonic::Status>> + Send + Unpin + 'static,
    {
        let (req_tx, req_rx) = mpsc::channel(REQUEST_BUFFER);
        let mut responses = connector(req_rx).await?;

        let state_json = if state.is_null() {
            "{}".to_string()
        } else {
            state.to_string()
        };

        req_tx
            .send(Request {
                open: Some(request::Open {
                    capture: Some(task.clone()),
                    version: version.clone(),
                    range: Some(range),
                    state_json,
                    tail,
                }),
                ..Default::default()
            })
            .await
            .context("failed to send connector Open")?;

        let opened = protocol::recv_connector_opened(responses.next().await)?;

        tracing::info!(
            task = %task.name,
            %version,
            explicit_acknowledgements = opened.explicit_acknowledgements,
            "opened capture connector stream"
        );

        // If the connector asked for explicit acknowledgements then spawn
        // a task which writes them. Otherwise close our send half now:
        // Open is the last message the connector will receive. In either
        // case the send half closes when the coordinator stops.
        let ack_tx = if opened.explicit_acknowledgements {
            let (ack_tx, mut ack_rx) = mpsc::unbounded_channel();

            tokio::spawn(async move {
                while let Some(checkpoints) = ack_rx.recv().await {
                    // Send errors are ignored: the connector controls
                    // stream shutdown, and the coordinator's next read of
                    // its stream surfaces the actual cause.
                    if req_tx
                        .send(protocol::acknowledge(checkpoints))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            });
            Some(ack_tx)
        } else {
            std::mem::drop(req_tx);
            None
        };

        let coordinator = Coordinator::new(
            task,
            range,
            Box::new(new_combiners),
            Box::new(start_commit),
            ack_tx,
        )?;

        let source = responses
            .map(|response| match response {
                Ok(response) => protocol::recv_connector_event(response),
                Err(status) => Err(protocol::status_error(status)),
            })
            .filter_map(|event| futures::future::ready(event.transpose()))
            .boxed();

        let client = coordinator::spawn(coordinator, source, cancel);
        Ok(Self { client })
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
