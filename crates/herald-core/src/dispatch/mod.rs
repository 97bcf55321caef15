//! Raw gateway dispatches as handed over by the wire client

mod dispatch_type;
mod envelope;

pub use dispatch_type::DispatchType;
pub use envelope::{DispatchEnvelope, GatewayState, GatewayStateChange, RawDispatch};
