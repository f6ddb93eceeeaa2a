//! Per-operation request metadata threaded through the core.

use uuid::Uuid;

/// Request metadata carried explicitly through every core operation.
///
/// The HTTP middleware and the consumer fleet are the only constructors;
/// everything downstream receives it as a parameter instead of reaching
/// into ambient context.
#[derive(Debug, Clone)]
pub struct RequestScope {
    /// Threads one logical operation across services. Assigned by the
    /// gateway or generated at the edge when absent.
    pub correlation_id: String,
    /// Identifies a single inbound request or consumed message.
    pub request_id: String,
}

impl RequestScope {
    pub fn new(correlation_id: String, request_id: String) -> Self {
        Self {
            correlation_id,
            request_id,
        }
    }

    /// Scope for work that does not originate from an inbound request,
    /// such as a consumed broker message.
    pub fn for_consumer(correlation_id: String) -> Self {
        Self {
            correlation_id,
            request_id: Uuid::new_v4().to_string(),
        }
    }
}
