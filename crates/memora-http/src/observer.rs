//! Status-check hook run after every execution

use crate::request::RequestDescriptor;
use crate::response::RestResponse;

/// Observes every executed request. Observers cannot alter the response.
pub trait ResponseObserver: Send + Sync {
    fn observe(&self, request: &RequestDescriptor, response: &RestResponse);
}

/// Default observer: logs zero-status and non-OK responses through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ResponseObserver for TracingObserver {
    fn observe(&self, request: &RequestDescriptor, response: &RestResponse) {
        if response.status_code == 0 {
            tracing::warn!(
                method = %request.method(),
                url = %response.url,
                timeout_ms = request.timeout_ms(),
                latency_ms = response.latency_ms,
                status = ?response.response_status,
                error = response.error_message.as_deref().unwrap_or(""),
                "Request returned no status"
            );
        } else if !response.is_ok() {
            tracing::warn!(
                method = %request.method(),
                url = %response.url,
                status = response.status_code,
                latency_ms = response.latency_ms,
                "Request returned non-OK status"
            );
        } else {
            tracing::debug!(
                method = %request.method(),
                url = %response.url,
                latency_ms = response.latency_ms,
                "Request completed"
            );
        }
    }
}

impl<F> ResponseObserver for F
where
    F: Fn(&RequestDescriptor, &RestResponse) + Send + Sync,
{
    fn observe(&self, request: &RequestDescriptor, response: &RestResponse) {
        self(request, response)
    }
}
