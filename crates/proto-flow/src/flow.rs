/// RangeSpec describes the range of responsibility which a task shard
/// holds, as unsigned [begin, end] extents of keys and r-clocks.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RangeSpec {
    /// [begin, end] inclusive range of keys to be shuffled to this shard.
    #[prost(fixed32, tag = "1")]
    pub key_begin: u32,
    #[prost(fixed32, tag = "2")]
    pub key_end: u32,
    /// [begin, end] inclusive range of rotated clocks to be shuffled to
    /// this shard.
    #[prost(fixed32, tag = "3")]
    pub r_clock_begin: u32,
    #[prost(fixed32, tag = "4")]
    pub r_clock_end: u32,
}

/// ConnectorState is a checkpoint of a connector's position against its
/// endpoint, which it persists across invocations in order to resume.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConnectorState {
    /// Update of the connector state, to be persisted by the runtime
    /// and supplied in the Open of a future connector invocation.
    #[prost(string, tag = "1")]
    pub updated_json: String,
    /// If true, then this state is applied to a previous state
    /// as an RFC7396 Merge Patch. Otherwise it fully replaces it.
    #[prost(bool, tag = "2")]
    pub merge_patch: bool,
}

/// CollectionSpec describes a collection into which documents are captured.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CollectionSpec {
    /// Name of this collection.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Composite key of the collection, as JSON-Pointers.
    #[prost(string, repeated, tag = "2")]
    pub key: Vec<String>,
    /// JSON Schema against which written documents are validated.
    #[prost(string, tag = "3")]
    pub write_schema_json: String,
}

/// CaptureSpec describes a capture task and its bindings.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CaptureSpec {
    /// Name of this capture.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Type of the capture's connector.
    #[prost(enumeration = "capture_spec::ConnectorType", tag = "2")]
    pub connector_type: i32,
    /// JSON-encoded connector configuration of this capture.
    #[prost(string, tag = "3")]
    pub config_json: String,
    /// Bindings of endpoint resources and collections into which they're
    /// captured. Bindings are ordered and unique on their resource path,
    /// and index the combiners of a running capture.
    #[prost(message, repeated, tag = "4")]
    pub bindings: Vec<capture_spec::Binding>,
    /// Frequency at which a polling connector is restarted, in seconds.
    #[prost(uint32, tag = "5")]
    pub interval_seconds: u32,
}

pub mod capture_spec {
    /// Binding maps a capture endpoint resource into a collection.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Binding {
        /// JSON-encoded configuration of the bound resource.
        #[prost(string, tag = "1")]
        pub resource_config_json: String,
        /// Driver-supplied path components which fully qualify the
        /// endpoint subresource identified by this binding.
        #[prost(string, repeated, tag = "2")]
        pub resource_path: Vec<String>,
        /// Collection which this binding captures into.
        #[prost(message, optional, tag = "3")]
        pub collection: Option<super::CollectionSpec>,
        /// Backfill counter of this binding, which increments each time
        /// the user asks that the binding be re-captured from scratch.
        #[prost(uint32, tag = "4")]
        pub backfill: u32,
        /// Key which uniquely identifies this binding within a
        /// connector's overall state document.
        #[prost(string, tag = "5")]
        pub state_key: String,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum ConnectorType {
        Invalid = 0,
        /// A connector packaged as a container image.
        Image = 1,
        /// A connector run as a local program.
        Local = 2,
    }
}

/// OAuth2 describes an OAuth2 flow supported by a connector.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OAuth2 {
    /// Name of the OAuth2 provider.
    #[prost(string, tag = "1")]
    pub provider: String,
    /// Template for the provider's authorization URL.
    #[prost(string, tag = "2")]
    pub auth_url_template: String,
    /// Template for the provider's access token URL.
    #[prost(string, tag = "3")]
    pub access_token_url_template: String,
}
