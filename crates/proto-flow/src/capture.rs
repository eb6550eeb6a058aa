/// Request is a message of the runtime to a capture connector.
/// Exactly one field must be set.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Request {
    /// Spec requests the specification definition of this connector.
    #[prost(message, optional, tag = "1")]
    pub spec: Option<request::Spec>,
    /// Discover returns the set of resources available from this connector.
    #[prost(message, optional, tag = "2")]
    pub discover: Option<request::Discover>,
    /// Validate a capture configuration and proposed bindings.
    #[prost(message, optional, tag = "3")]
    pub validate: Option<request::Validate>,
    /// Apply a validated capture configuration and bindings.
    #[prost(message, optional, tag = "4")]
    pub apply: Option<request::Apply>,
    /// Open a capture stream.
    #[prost(message, optional, tag = "5")]
    pub open: Option<request::Open>,
    /// Tell the connector that some number of its preceding Checkpoints
    /// have committed to the runtime recovery log.
    #[prost(message, optional, tag = "6")]
    pub acknowledge: Option<request::Acknowledge>,
}

pub mod request {
    /// Spec requests the specification definition of a connector.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Spec {
        /// Connector type addressed by this request.
        #[prost(
            enumeration = "super::super::flow::capture_spec::ConnectorType",
            tag = "1"
        )]
        pub connector_type: i32,
        /// JSON-encoded connector configuration of this request.
        #[prost(string, tag = "2")]
        pub config_json: String,
    }

    /// Discover the resources available to capture from an endpoint.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Discover {
        #[prost(
            enumeration = "super::super::flow::capture_spec::ConnectorType",
            tag = "1"
        )]
        pub connector_type: i32,
        #[prost(string, tag = "2")]
        pub config_json: String,
    }

    /// Validate a capture configuration and proposed bindings.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Validate {
        /// Name of the capture being validated.
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(
            enumeration = "super::super::flow::capture_spec::ConnectorType",
            tag = "2"
        )]
        pub connector_type: i32,
        #[prost(string, tag = "3")]
        pub config_json: String,
        /// Proposed bindings of the validated capture.
        #[prost(message, repeated, tag = "4")]
        pub bindings: Vec<validate::Binding>,
        /// The last validated and applied CaptureSpec, or None if this
        /// capture is being created for the first time.
        #[prost(message, optional, tag = "5")]
        pub last_capture: Option<super::super::flow::CaptureSpec>,
        /// Version of the last validated CaptureSpec.
        #[prost(string, tag = "6")]
        pub last_version: String,
    }

    pub mod validate {
        /// A proposed binding of the validated capture.
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Binding {
            /// JSON-encoded configuration of the proposed resource.
            #[prost(string, tag = "1")]
            pub resource_config_json: String,
            /// Collection which the binding would capture into.
            #[prost(message, optional, tag = "2")]
            pub collection: Option<super::super::super::flow::CollectionSpec>,
            /// Backfill counter of this binding.
            #[prost(uint32, tag = "3")]
            pub backfill: u32,
        }
    }

    /// Apply a capture specification to its endpoint.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Apply {
        /// Capture to be applied.
        #[prost(message, optional, tag = "1")]
        pub capture: Option<super::super::flow::CaptureSpec>,
        /// Opaque, unique version of this application.
        #[prost(string, tag = "2")]
        pub version: String,
        /// The last applied CaptureSpec, or None if this capture is being
        /// applied for the first time.
        #[prost(message, optional, tag = "3")]
        pub last_capture: Option<super::super::flow::CaptureSpec>,
        /// Version of the last applied CaptureSpec.
        #[prost(string, tag = "4")]
        pub last_version: String,
    }

    /// Open a capture for reading documents from its endpoint.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Open {
        /// Capture to be opened.
        #[prost(message, optional, tag = "1")]
        pub capture: Option<super::super::flow::CaptureSpec>,
        /// Opaque, unique version of the opened capture.
        #[prost(string, tag = "2")]
        pub version: String,
        /// Range of ownership of the opened connector invocation.
        /// Captures are split on key ranges only, and the r-clock range
        /// of an opened capture is always the full extent.
        #[prost(message, optional, tag = "3")]
        pub range: Option<super::super::flow::RangeSpec>,
        /// Last-persisted connector state, or '{}' if the connector has
        /// never set (or has cleared) its state.
        #[prost(string, tag = "4")]
        pub state_json: String,
        /// If true, the connector should tail the endpoint indefinitely.
        /// If false, it should exit upon reaching the current end of
        /// available documents.
        #[prost(bool, tag = "5")]
        pub tail: bool,
    }

    /// Acknowledge that Checkpoints of the connector have committed.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Acknowledge {
        /// Number of preceding Response.Checkpoint messages which have
        /// committed to the runtime recovery log. Always >= 1.
        #[prost(uint32, tag = "1")]
        pub checkpoints: u32,
    }
}

/// Response is a message of a capture connector to the runtime.
/// Exactly one field must be set.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    /// Spec responds to a Request.Spec.
    #[prost(message, optional, tag = "1")]
    pub spec: Option<response::Spec>,
    /// Discovered responds to a Request.Discover.
    #[prost(message, optional, tag = "2")]
    pub discovered: Option<response::Discovered>,
    /// Validated responds to a Request.Validate.
    #[prost(message, optional, tag = "3")]
    pub validated: Option<response::Validated>,
    /// Applied responds to a Request.Apply.
    #[prost(message, optional, tag = "4")]
    pub applied: Option<response::Applied>,
    /// Opened responds to a Request.Open.
    #[prost(message, optional, tag = "5")]
    pub opened: Option<response::Opened>,
    /// Captured notifies of a document captured by the connector.
    #[prost(message, optional, tag = "6")]
    pub captured: Option<response::Captured>,
    /// SourcedSchema notifies of an updated document schema of a binding.
    #[prost(message, optional, tag = "7")]
    pub sourced_schema: Option<response::SourcedSchema>,
    /// Checkpoint all preceding documents of this invocation.
    #[prost(message, optional, tag = "8")]
    pub checkpoint: Option<response::Checkpoint>,
}

pub mod response {
    /// Spec is the specification definition of a connector.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Spec {
        /// Version of the capture protocol that this connector speaks.
        /// Must equal proto_flow::CAPTURE.
        #[prost(uint32, tag = "1")]
        pub protocol: u32,
        /// JSON schema of the connector's endpoint configuration.
        #[prost(string, tag = "2")]
        pub config_schema_json: String,
        /// JSON schema of a binding's resource configuration.
        #[prost(string, tag = "3")]
        pub resource_config_schema_json: String,
        /// URL for the connector's documentation.
        #[prost(string, tag = "4")]
        pub documentation_url: String,
        /// OAuth2 flow of the connector, if any.
        #[prost(message, optional, tag = "5")]
        pub oauth2: Option<super::super::flow::OAuth2>,
        /// JSON-Pointers of resource configuration locations which, taken
        /// together, uniquely identify the configured resource.
        #[prost(string, repeated, tag = "6")]
        pub resource_path_pointers: Vec<String>,
    }

    /// Discovered resources of the connector's endpoint.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Discovered {
        #[prost(message, repeated, tag = "1")]
        pub bindings: Vec<discovered::Binding>,
    }

    pub mod discovered {
        /// A discovered endpoint resource which may be captured.
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Binding {
            /// Recommended partial name for this binding's collection.
            #[prost(string, tag = "1")]
            pub recommended_name: String,
            /// JSON-encoded configuration of the discovered resource.
            #[prost(string, tag = "2")]
            pub resource_config_json: String,
            /// JSON schema of documents captured from this resource.
            #[prost(string, tag = "3")]
            pub document_schema_json: String,
            /// Composite key of captured documents, as JSON-Pointers.
            #[prost(string, repeated, tag = "4")]
            pub key: Vec<String>,
            /// Should this binding be disabled by default?
            #[prost(bool, tag = "5")]
            pub disable: bool,
            /// Path components which fully qualify the resource.
            #[prost(string, repeated, tag = "6")]
            pub resource_path: Vec<String>,
            /// Is `key` a fallback, rather than a natural key of the
            /// discovered resource?
            #[prost(bool, tag = "7")]
            pub is_fallback_key: bool,
        }
    }

    /// Validated bindings of the capture.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Validated {
        #[prost(message, repeated, tag = "1")]
        pub bindings: Vec<validated::Binding>,
    }

    pub mod validated {
        /// A validated binding of the capture.
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Binding {
            /// Path components which fully qualify the endpoint resource
            /// identified by this binding. Unique across all bindings.
            #[prost(string, repeated, tag = "1")]
            pub resource_path: Vec<String>,
        }
    }

    /// Applied capture specification.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Applied {
        /// User-facing description of the action taken by this apply.
        #[prost(string, tag = "1")]
        pub action_description: String,
    }

    /// Opened capture stream.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Opened {
        /// Should the runtime explicitly acknowledge the connector's
        /// Checkpoints as they commit? If false, Open is the final
        /// message which the connector receives.
        #[prost(bool, tag = "1")]
        pub explicit_acknowledgements: bool,
    }

    /// A document captured by the connector. Captured documents are
    /// pending, and commit only upon a following Checkpoint.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Captured {
        /// Index of the Open binding for which this document is captured.
        #[prost(uint32, tag = "1")]
        pub binding: u32,
        /// JSON document which was captured.
        #[prost(string, tag = "2")]
        pub doc_json: String,
    }

    /// A partial document schema sourced from the connector's endpoint.
    /// SourcedSchema has no effect until a following Checkpoint commits.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SourcedSchema {
        /// Index of the Open binding for which the schema applies.
        #[prost(uint32, tag = "1")]
        pub binding: u32,
        /// JSON schema of documents of the binding.
        #[prost(string, tag = "2")]
        pub schema_json: String,
    }

    /// Checkpoint all preceding documents of this connector invocation.
    /// The runtime may begin to commit documents in a transaction, and
    /// may fold multiple Checkpoints into a single transaction.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Checkpoint {
        /// Updated connector state to commit with this checkpoint.
        #[prost(message, optional, tag = "1")]
        pub state: Option<super::super::flow::ConnectorState>,
    }
}
