use super::{Combiner, Extractor};
use proto_flow::capture::{response, Response};
use proto_flow::flow;

/// TestCombiner records the documents combined into a binding.
pub struct TestCombiner {
    pub docs: Vec<serde_json::Value>,
}

impl Combiner for TestCombiner {
    fn combine_right(&mut self, doc_json: &str) -> anyhow::Result<()> {
        self.docs.push(serde_json::from_str(doc_json)?);
        Ok(())
    }
}

pub fn test_combiners(bindings: usize) -> Vec<TestCombiner> {
    (0..bindings)
        .map(|_| TestCombiner { docs: Vec::new() })
        .collect()
}

pub fn new_combiners(task: &flow::CaptureSpec) -> anyhow::Result<Vec<TestCombiner>> {
    Ok(test_combiners(task.bindings.len()))
}

/// TestExtractor rejects documents which are the JSON string "invalid".
pub struct TestExtractor;

impl Extractor for TestExtractor {
    fn extract(&mut self, doc_json: &str) -> anyhow::Result<()> {
        let doc: serde_json::Value = serde_json::from_str(doc_json)?;
        anyhow::ensure!(doc != serde_json::json!("invalid"), "document is invalid");
        Ok(())
    }
}

pub fn new_extractors(task: &flow::CaptureSpec) -> anyhow::Result<Vec<TestExtractor>> {
    Ok(task.bindings.iter().map(|_| TestExtractor).collect())
}

pub fn task_spec(bindings: usize) -> flow::CaptureSpec {
    flow::CaptureSpec {
        name: "acmeCo/test/capture".to_string(),
        connector_type: flow::capture_spec::ConnectorType::Image as i32,
        config_json: "{}".to_string(),
        bindings: (0..bindings)
            .map(|i| flow::capture_spec::Binding {
                resource_config_json: "{}".to_string(),
                resource_path: vec![format!("resource-{i}")],
                collection: Some(flow::CollectionSpec {
                    name: format!("acmeCo/test/collection-{i}"),
                    key: vec!["/key".to_string()],
                    write_schema_json: "true".to_string(),
                }),
                backfill: 0,
                state_key: format!("resource-{i}"),
            })
            .collect(),
        interval_seconds: 0,
    }
}

pub fn full_range() -> flow::RangeSpec {
    flow::RangeSpec {
        key_begin: 0,
        key_end: u32::MAX,
        r_clock_begin: 0,
        r_clock_end: u32::MAX,
    }
}

pub fn opened(explicit_acknowledgements: bool) -> Response {
    Response {
        opened: Some(response::Opened {
            explicit_acknowledgements,
        }),
        ..Default::default()
    }
}

pub fn captured(binding: u32, doc: serde_json::Value) -> Response {
    Response {
        captured: Some(response::Captured {
            binding,
            doc_json: doc.to_string(),
        }),
        ..Default::default()
    }
}

pub fn connector_state(state: serde_json::Value, merge_patch: bool) -> flow::ConnectorState {
    flow::ConnectorState {
        updated_json: state.to_string(),
        merge_patch,
    }
}

pub fn checkpoint(state: serde_json::Value, merge_patch: bool) -> Response {
    Response {
        checkpoint: Some(response::Checkpoint {
            state: Some(connector_state(state, merge_patch)),
        }),
        ..Default::default()
    }
}
