use schemars::JsonSchema;
use schemars::schema_for;

use crate::InboundEvent;
use crate::OutboundEvent;

#[derive(JsonSchema)]
#[allow(dead_code)]
struct ProtocolMessages {
    inbound: InboundEvent,
    outbound: OutboundEvent,
}

/// JSON Schema describing every message the service reads or publishes.
pub fn protocol_schema() -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(schema_for!(ProtocolMessages))
}
