use super::{Combiner, Error};
use proto_flow::flow;
use tokio::sync::oneshot;

/// DriverCheckpoint is the reduced connector checkpoint of a transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverCheckpoint {
    /// Reduced checkpoint state of the connector.
    pub state: serde_json::Value,
    /// Is `state` an RFC7396 merge patch of the connector's persisted
    /// checkpoint, rather than a complete replacement of it?
    pub merge_patch: bool,
}

impl DriverCheckpoint {
    /// Begin a new DriverCheckpoint from a connector state update.
    /// A merge-patch update is applied onto an empty state, so `null`
    /// locations of the patch delete as they reduce and are not retained.
    pub fn new(update: &flow::ConnectorState) -> Result<Self, Error> {
        let mut this = Self {
            state: serde_json::Value::Null,
            merge_patch: update.merge_patch,
        };
        this.reduce(update)?;
        Ok(this)
    }

    /// Reduce a connector state update into this DriverCheckpoint.
    /// A merge-patch update is applied onto the current state via
    /// RFC7396, and any other update fully replaces it. The reduction of
    /// a patch into a patch remains a patch, while a replacement is (and
    /// stays) a complete state.
    pub fn reduce(&mut self, update: &flow::ConnectorState) -> Result<(), Error> {
        let update_state: serde_json::Value = match serde_json::from_str(&update.updated_json) {
            Ok(state) => state,
            Err(err) => {
                return Err(Error::Reduction(format!(
                    "connector state update is malformed JSON: {err}"
                )))
            }
        };

        if update.merge_patch {
            json_patch::merge(&mut self.state, &update_state);
        } else {
            self.state = update_state;
            self.merge_patch = false;
        }
        Ok(())
    }
}

/// Transaction is the accumulating state of a single capture transaction.
pub(crate) struct Transaction<C: Combiner> {
    /// Combiners of the transaction, one per task binding.
    pub combiners: Vec<C>,
    /// Reduced driver checkpoint of the transaction.
    pub checkpoint: DriverCheckpoint,
    /// Total bytes of documents added to the transaction.
    pub num_bytes: usize,
    /// Number of connector checkpoints reduced into the transaction.
    pub num_checkpoints: u32,
    /// Is the transaction awaiting a checkpoint which closes out its
    /// documents? Initialized as true: a transaction cannot commit until
    /// its first checkpoint arrives.
    pub pending: bool,
    /// Was the transaction over the byte threshold as-of its last
    /// checkpoint? Reads of further documents pause while full.
    pub full: bool,
    /// Acknowledgements of pushed batches, resolved when this
    /// transaction fully commits.
    pub acks: Vec<oneshot::Sender<()>>,
}

impl<C: Combiner> Transaction<C> {
    pub fn new(combiners: Vec<C>) -> Self {
        Self {
            combiners,
            checkpoint: DriverCheckpoint::default(),
            num_bytes: 0,
            num_checkpoints: 0,
            pending: true,
            full: false,
            acks: Vec::new(),
        }
    }

    /// Combine a captured document into its binding.
    pub fn add_document(&mut self, binding: u32, doc_json: &str) -> Result<(), Error> {
        let bindings = self.combiners.len();
        let combiner = self
            .combiners
            .get_mut(binding as usize)
            .ok_or(Error::InvalidBinding { binding, bindings })?;

        if let Err(err) = combiner.combine_right(doc_json) {
            return Err(Error::Combine(format!(
                "combining document of binding {binding}: {err:#}"
            )));
        }
        self.num_bytes += doc_json.len();
        self.pending = true;
        Ok(())
    }

    /// Reduce a connector checkpoint into the transaction, closing out
    /// all documents which precede it.
    pub fn add_checkpoint(
        &mut self,
        state: &flow::ConnectorState,
        byte_threshold: usize,
    ) -> Result<(), Error> {
        if self.num_checkpoints == 0 {
            self.checkpoint = DriverCheckpoint::new(state)?;
        } else {
            self.checkpoint.reduce(state)?;
        }
        self.num_checkpoints += 1;
        self.pending = false;
        self.full = self.num_bytes > byte_threshold;
        Ok(())
    }

    /// A transaction may commit only once a checkpoint has closed out all
    /// of its documents.
    pub fn commit_ready(&self) -> bool {
        !self.pending && self.num_checkpoints != 0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::capture::fixtures;
    use serde_json::json;

    fn update(state: serde_json::Value, merge_patch: bool) -> flow::ConnectorState {
        flow::ConnectorState {
            updated_json: state.to_string(),
            merge_patch,
        }
    }

    #[test]
    fn test_merge_patch_reduction() {
        let mut ckpt =
            DriverCheckpoint::new(&update(json!({"k1": "v1", "n": null}), true)).unwrap();
        assert_eq!(ckpt.state, json!({"k1": "v1"}));
        assert!(ckpt.merge_patch);

        ckpt.reduce(&update(json!({"k1": null, "K2": "V2"}), true))
            .unwrap();
        ckpt.reduce(&update(json!({"K2": null, "K3": "V3"}), true))
            .unwrap();

        assert_eq!(ckpt.state, json!({"K3": "V3"}));
        assert!(ckpt.merge_patch);
    }

    #[test]
    fn test_non_patch_update_replaces() {
        let mut ckpt = DriverCheckpoint::new(&update(json!({"k1": "v1"}), false)).unwrap();

        ckpt.reduce(&update(json!({"expect": "k1-is-dropped"}), false))
            .unwrap();

        assert_eq!(ckpt.state, json!({"expect": "k1-is-dropped"}));
        assert!(!ckpt.merge_patch);
    }

    #[test]
    fn test_patch_of_a_full_state_remains_full() {
        let mut ckpt = DriverCheckpoint::new(&update(json!({"k1": "v1"}), false)).unwrap();

        ckpt.reduce(&update(json!({"k2": "v2"}), true)).unwrap();

        assert_eq!(ckpt.state, json!({"k1": "v1", "k2": "v2"}));
        assert!(!ckpt.merge_patch);
    }

    #[test]
    fn test_malformed_state_fails_reduction() {
        let out = DriverCheckpoint::new(&flow::ConnectorState {
            updated_json: "{invalid".to_string(),
            merge_patch: true,
        });
        assert!(matches!(out, Err(Error::Reduction(_))));
    }

    #[test]
    fn test_transaction_lifecycle() {
        let mut txn = Transaction::new(fixtures::test_combiners(2));
        assert!(txn.pending && !txn.commit_ready());

        txn.add_document(0, "\"one\"").unwrap();
        txn.add_document(1, "\"two\"").unwrap();
        assert_eq!(txn.num_bytes, 10);
        assert!(!txn.commit_ready());

        txn.add_checkpoint(&update(json!({"a": 1}), true), 8).unwrap();
        assert!(txn.commit_ready());
        assert!(txn.full); // 10 > 8.

        // A document after a checkpoint re-opens the transaction.
        txn.add_document(0, "\"three\"").unwrap();
        assert!(txn.pending && !txn.commit_ready());

        txn.add_checkpoint(&update(json!({"b": 2}), true), 1 << 20)
            .unwrap();
        assert!(txn.commit_ready());
        assert!(!txn.full);
        assert_eq!(txn.num_checkpoints, 2);
        assert_eq!(txn.checkpoint.state, json!({"a": 1, "b": 2}));

        let out = txn.add_document(7, "\"oops\"");
        assert!(matches!(
            out,
            Err(Error::InvalidBinding {
                binding: 7,
                bindings: 2
            })
        ));
    }
}
