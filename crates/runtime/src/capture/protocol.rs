use super::coordinator::Event;
use super::Error;
use proto_flow::capture::{request, response, Request, Response};

/// Verify that `response` is the Opened of a freshly-opened connector
/// stream, and unwrap it.
pub(crate) fn recv_connector_opened(
    response: Option<Result<Response, tonic::Status>>,
) -> Result<response::Opened, Error> {
    let response = match response {
        None => {
            return Err(Error::Protocol(
                "connector closed its stream without sending Opened".to_string(),
            ))
        }
        Some(Err(status)) => return Err(status_error(status)),
        Some(Ok(response)) => response,
    };
    verify_one_field(&response)?;

    match response.opened {
        Some(opened) => Ok(opened),
        None => Err(Error::Protocol(format!(
            "expected connector Opened, not: {response:?}"
        ))),
    }
}

/// Verify and map a streamed connector Response into a coordinator Event.
/// SourcedSchema responses map to None: they have no effect on
/// accumulation, and take effect only upon a following Checkpoint.
pub(crate) fn recv_connector_event(response: Response) -> Result<Option<Event>, Error> {
    verify_one_field(&response)?;

    if let Some(response::Captured { binding, doc_json }) = response.captured {
        Ok(Some(Event::Captured { binding, doc_json }))
    } else if let Some(response::Checkpoint { state }) = response.checkpoint {
        match state {
            Some(state) => Ok(Some(Event::Checkpoint(state))),
            None => Err(Error::Protocol(
                "connector Checkpoint is missing its state".to_string(),
            )),
        }
    } else if let Some(response::SourcedSchema { binding, .. }) = response.sourced_schema {
        tracing::debug!(binding, "ignoring sourced schema update");
        Ok(None)
    } else {
        Err(Error::Protocol(format!(
            "unexpected connector response: {response:?}"
        )))
    }
}

/// Build an Acknowledge of committed connector checkpoints.
pub(crate) fn acknowledge(checkpoints: u32) -> Request {
    Request {
        acknowledge: Some(request::Acknowledge { checkpoints }),
        ..Default::default()
    }
}

/// Normalize a transport error of the connector stream. Internal statuses
/// wrap the true error of the connector, and are unwrapped to their
/// message so that the terminal error reflects the actual cause.
pub(crate) fn status_error(status: tonic::Status) -> Error {
    if status.code() == tonic::Code::Internal {
        Error::Connector(status.message().to_string())
    } else {
        Error::Connector(status.to_string())
    }
}

/// Verify the paired Response of a unary Request exchange (Spec,
/// Discover, Validate, or Apply), and return it.
pub fn recv_unary(request: &Request, response: Response) -> Result<Response, Error> {
    if request_fields(request) != 1 {
        return Err(Error::Protocol(format!(
            "unary request must set exactly one field: {request:?}"
        )));
    }
    verify_one_field(&response)?;

    if request.spec.is_some() {
        let Some(spec) = &response.spec else {
            return Err(Error::Protocol(format!(
                "expected connector Spec, not: {response:?}"
            )));
        };
        if spec.protocol != proto_flow::CAPTURE {
            return Err(Error::Protocol(format!(
                "connector protocol version {} doesn't match expected {}",
                spec.protocol,
                proto_flow::CAPTURE,
            )));
        }
        Ok(response)
    } else if request.discover.is_some() {
        if response.discovered.is_none() {
            return Err(Error::Protocol(format!(
                "expected connector Discovered, not: {response:?}"
            )));
        }
        Ok(response)
    } else if request.validate.is_some() {
        let Some(validated) = &response.validated else {
            return Err(Error::Protocol(format!(
                "expected connector Validated, not: {response:?}"
            )));
        };
        // Validated bindings must be unique on their resource path.
        let mut seen = std::collections::BTreeSet::new();
        for binding in &validated.bindings {
            if !seen.insert(&binding.resource_path) {
                return Err(Error::Protocol(format!(
                    "connector Validated has multiple bindings of resource path {:?}",
                    binding.resource_path,
                )));
            }
        }
        Ok(response)
    } else if request.apply.is_some() {
        if response.applied.is_none() {
            return Err(Error::Protocol(format!(
                "expected connector Applied, not: {response:?}"
            )));
        }
        Ok(response)
    } else {
        Err(Error::Protocol(format!(
            "not a unary request: {request:?}"
        )))
    }
}

fn verify_one_field(response: &Response) -> Result<(), Error> {
    if response_fields(response) != 1 {
        return Err(Error::Protocol(format!(
            "connector response must set exactly one field: {response:?}"
        )));
    }
    Ok(())
}

fn response_fields(response: &Response) -> usize {
    let Response {
        spec,
        discovered,
        validated,
        applied,
        opened,
        captured,
        sourced_schema,
        checkpoint,
    } = response;

    [
        spec.is_some(),
        discovered.is_some(),
        validated.is_some(),
        applied.is_some(),
        opened.is_some(),
        captured.is_some(),
        sourced_schema.is_some(),
        checkpoint.is_some(),
    ]
    .into_iter()
    .filter(|set| *set)
    .count()
}

fn request_fields(request: &Request) -> usize {
    let Request {
        spec,
        discover,
        validate,
        apply,
        open,
        acknowledge,
    } = request;

    [
        spec.is_some(),
        discover.is_some(),
        validate.is_some(),
        apply.is_some(),
        open.is_some(),
        acknowledge.is_some(),
    ]
    .into_iter()
    .filter(|set| *set)
    .count()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::capture::fixtures;
    use proto_flow::capture::response::validated;
    use serde_json::json;

    #[test]
    fn test_responses_must_set_exactly_one_field() {
        let out = recv_connector_event(Response::default());
        assert!(matches!(out, Err(Error::Protocol(_))));

        let mut response = fixtures::captured(0, json!("doc"));
        response.checkpoint = fixtures::checkpoint(json!({}), true).checkpoint;
        let out = recv_connector_event(response);
        assert!(matches!(out, Err(Error::Protocol(_))));
    }

    #[test]
    fn test_recv_connector_event_cases() {
        let event = recv_connector_event(fixtures::captured(3, json!({"k": 1})))
            .unwrap()
            .unwrap();
        let Event::Captured { binding, doc_json } = event else {
            panic!("expected a captured document");
        };
        assert_eq!(binding, 3);
        assert_eq!(doc_json, json!({"k": 1}).to_string());

        let event = recv_connector_event(fixtures::checkpoint(json!({"a": 1}), true))
            .unwrap()
            .unwrap();
        let Event::Checkpoint(state) = event else {
            panic!("expected a checkpoint");
        };
        assert!(state.merge_patch);

        // A Checkpoint without state is a protocol error.
        let response = Response {
            checkpoint: Some(response::Checkpoint { state: None }),
            ..Default::default()
        };
        assert!(matches!(
            recv_connector_event(response),
            Err(Error::Protocol(_))
        ));

        // SourcedSchema is a no-op for accumulation.
        let response = Response {
            sourced_schema: Some(response::SourcedSchema {
                binding: 0,
                schema_json: "true".to_string(),
            }),
            ..Default::default()
        };
        assert!(recv_connector_event(response).unwrap().is_none());

        // Opened is valid only as the first stream response.
        assert!(matches!(
            recv_connector_event(fixtures::opened(true)),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_recv_connector_opened() {
        let opened = recv_connector_opened(Some(Ok(fixtures::opened(true)))).unwrap();
        assert!(opened.explicit_acknowledgements);

        assert!(matches!(
            recv_connector_opened(None),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            recv_connector_opened(Some(Ok(fixtures::captured(0, json!("nope"))))),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_status_normalization() {
        let out = status_error(tonic::Status::internal("the true cause"));
        assert_eq!(out, Error::Connector("the true cause".to_string()));

        let out = status_error(tonic::Status::unavailable("broker is down"));
        let Error::Connector(message) = out else {
            panic!("expected a connector error");
        };
        assert!(message.contains("broker is down"));
    }

    #[test]
    fn test_recv_unary_spec() {
        let request = Request {
            spec: Some(request::Spec::default()),
            ..Default::default()
        };
        let response = Response {
            spec: Some(response::Spec {
                protocol: proto_flow::CAPTURE,
                ..Default::default()
            }),
            ..Default::default()
        };
        recv_unary(&request, response).unwrap();

        // A mismatched protocol version is rejected.
        let response = Response {
            spec: Some(response::Spec {
                protocol: 12345,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(
            recv_unary(&request, response),
            Err(Error::Protocol(_))
        ));

        // As is a mismatched response type.
        assert!(matches!(
            recv_unary(&request, fixtures::opened(true)),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_recv_unary_validated_paths_must_be_unique() {
        let request = Request {
            validate: Some(request::Validate::default()),
            ..Default::default()
        };
        let binding = |path: &str| validated::Binding {
            resource_path: vec![path.to_string()],
        };

        let response = Response {
            validated: Some(response::Validated {
                bindings: vec![binding("a"), binding("b")],
            }),
            ..Default::default()
        };
        recv_unary(&request, response).unwrap();

        let response = Response {
            validated: Some(response::Validated {
                bindings: vec![binding("a"), binding("a")],
            }),
            ..Default::default()
        };
        assert!(matches!(
            recv_unary(&request, response),
            Err(Error::Protocol(_))
        ));
    }
}
