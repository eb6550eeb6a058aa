use super::transaction::DriverCheckpoint;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// State is the JSON document which a capture task persists into its
/// recovery log, carrying the most-recently committed connector
/// checkpoint.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    /// Committed checkpoint of the capture connector, or None if the
    /// connector has never set (or has cleared) its checkpoint.
    #[serde(default)]
    pub driver_checkpoint: Option<serde_json::Value>,
}

impl State {
    /// Load a State from `path`, or a default State if none was
    /// persisted. A persisted `null` checkpoint is canonicalized to an
    /// absent one.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(err).context("failed to read connector state"),
        };
        let mut state: Self =
            serde_json::from_slice(&raw).context("failed to parse persisted connector state")?;

        if matches!(&state.driver_checkpoint, Some(serde_json::Value::Null)) {
            state.driver_checkpoint = None;
        }
        Ok(state)
    }

    /// Persist this State to `path` with an atomic rename.
    pub fn store(&self, path: &Path) -> anyhow::Result<()> {
        let dir = path.parent().context("state path has no parent directory")?;

        let file = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(file.as_file(), self)
            .context("failed to write connector state")?;
        file.persist(path).context("failed to persist connector state")?;

        Ok(())
    }

    /// Fold the committed checkpoint of a transaction into this State:
    /// a merge patch applies via RFC7396, and a complete checkpoint
    /// replaces the state.
    pub fn apply(&mut self, checkpoint: &DriverCheckpoint) {
        if !checkpoint.merge_patch {
            self.driver_checkpoint = Some(checkpoint.state.clone());
        } else {
            let mut state = self
                .driver_checkpoint
                .take()
                .unwrap_or(serde_json::Value::Null);
            json_patch::merge(&mut state, &checkpoint.state);
            self.driver_checkpoint = Some(state);
        }

        if matches!(&self.driver_checkpoint, Some(serde_json::Value::Null)) {
            self.driver_checkpoint = None;
        }
    }

    /// Connector state to supply with the Open of a next invocation.
    pub fn checkpoint(&self) -> serde_json::Value {
        self.driver_checkpoint
            .clone()
            .unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connector-state.json");

        // A missing file loads as the default State.
        let mut state = State::load(&path).unwrap();
        assert_eq!(state, State::default());
        assert_eq!(state.checkpoint(), json!(null));

        state.apply(&DriverCheckpoint {
            state: json!({"cursor": 123}),
            merge_patch: false,
        });
        state.store(&path).unwrap();

        assert_eq!(State::load(&path).unwrap(), state);
        assert_eq!(state.checkpoint(), json!({"cursor": 123}));
    }

    #[test]
    fn test_null_checkpoint_is_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connector-state.json");
        std::fs::write(&path, r#"{"driverCheckpoint": null}"#).unwrap();

        let state = State::load(&path).unwrap();
        assert_eq!(state.driver_checkpoint, None);
    }

    #[test]
    fn test_apply_checkpoints() {
        let mut state = State::default();

        state.apply(&DriverCheckpoint {
            state: json!({"a": 1}),
            merge_patch: true,
        });
        state.apply(&DriverCheckpoint {
            state: json!({"b": 2, "a": null}),
            merge_patch: true,
        });
        assert_eq!(state.driver_checkpoint, Some(json!({"b": 2})));

        // A complete checkpoint replaces the state entirely.
        state.apply(&DriverCheckpoint {
            state: json!({"c": 3}),
            merge_patch: false,
        });
        assert_eq!(state.driver_checkpoint, Some(json!({"c": 3})));

        // A null replacement clears it.
        state.apply(&DriverCheckpoint {
            state: json!(null),
            merge_patch: false,
        });
        assert_eq!(state.driver_checkpoint, None);
    }
}
