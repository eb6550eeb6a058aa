// Hand-maintained protocol messages of the capture runtime.
// Messages are tagged unions: exactly one field of a Request or Response
// may be set. Senders use struct-update syntax over Default, and
// receivers must verify the exactly-one-field invariant.

pub mod capture;
pub mod flow;

/// Protocol version which capture connectors must include in their
/// Spec response. Connectors of a different version are rejected.
pub const CAPTURE: u32 = 3032023;
