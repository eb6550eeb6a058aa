//! The capture coordinator mediates between a capture connector and its
//! runtime host. The connector emits documents and checkpoints; the host
//! combines documents, writes them to durable storage, and commits
//! checkpoints into its recovery log.
//!
//! The coordinator interleaves accumulation of a "next" transaction with
//! the pipelined commit of a "prior" transaction: documents continue to
//! accumulate while the prior commit is in flight, and a soft byte
//! threshold bounds accumulation by pausing reads of the connector.
//! At most one commit is outstanding at a time, and checkpoints commit
//! in their arrival order.
//!
//! Two front-ends share one engine:
//!  * [`PullClient`]: the runtime opens a bi-directional connector stream
//!    and acknowledges checkpoints back to it as they commit.
//!  * [`PushClient`]: external clients push batches of documents with a
//!    checkpoint, and are acknowledged once that checkpoint commits.

mod coordinator;
mod protocol;
mod pull;
mod push;
mod state;
mod transaction;

#[cfg(test)]
pub(crate) mod fixtures;

pub use protocol::recv_unary;
pub use pull::PullClient;
pub use push::PushClient;
pub use state::State;
pub use transaction::DriverCheckpoint;

/// Error is a terminal failure of a capture coordinator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("connector protocol error: {0}")]
    Protocol(String),
    #[error("connector stream error: {0}")]
    Connector(String),
    #[error("pushed document failed validation: {0}")]
    Validation(String),
    #[error("invalid binding {binding} (task has {bindings} bindings)")]
    InvalidBinding { binding: u32, bindings: usize },
    #[error("document combiner error: {0}")]
    Combine(String),
    #[error("failed to reduce connector checkpoint: {0}")]
    Reduction(String),
    #[error("transaction failed to commit to the recovery log: {0}")]
    Commit(String),
    #[error("capture coordinator context was cancelled")]
    Cancelled,
    #[error("capture coordinator has shut down")]
    Shutdown,
}

/// Stop is the terminal outcome of a capture coordinator: a graceful end
/// of the connector stream, or the error which failed it.
#[derive(Debug, Clone, PartialEq)]
pub enum Stop {
    /// The connector closed its stream, and all commit-eligible
    /// transactions have committed.
    Eof,
    /// The coordinator failed.
    Error(Error),
}

impl Stop {
    /// Map a graceful Eof into Ok, and an Error into its Err.
    pub fn ok(self) -> Result<(), Error> {
        match self {
            Stop::Eof => Ok(()),
            Stop::Error(err) => Err(err),
        }
    }
}

/// Combiner accumulates added documents of a single task binding, and
/// drains them as deduplicated and merged outputs. Implementations are
/// supplied by the runtime host, and the coordinator only feeds them:
/// popped combiners are drained by the host while their transaction
/// commits.
pub trait Combiner: Send + 'static {
    /// Combine a document on the right-hand (append) side of other
    /// documents of its key.
    fn combine_right(&mut self, doc_json: &str) -> anyhow::Result<()>;
}

/// Extractor validates pushed documents of a single binding, extracting
/// and checking their key prior to combining.
pub trait Extractor: Send + 'static {
    fn extract(&mut self, doc_json: &str) -> anyhow::Result<()>;
}

/// Documents is a batch of pushed documents of a single binding.
#[derive(Debug)]
pub struct Documents {
    /// Index of the task binding to which documents belong.
    pub binding: u32,
    /// JSON documents of the batch.
    pub docs_json: Vec<String>,
}
