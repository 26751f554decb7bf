use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, field, info, info_span};

use super::AppState;

/// Header set by Google Cloud load balancers: `TRACE_ID/SPAN_ID;o=OPTIONS`.
pub const TRACE_HEADER: &str = "x-cloud-trace-context";

/// Run each request inside a span carrying its trace id, so every log line
/// the request emits can be correlated with the load balancer trace.
pub async fn trace_request(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let trace = request
        .headers()
        .get(TRACE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(trace_id)
        .map(|id| trace_resource(state.project.as_deref(), id));

    let span = info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        trace = field::Empty,
    );
    if let Some(trace) = &trace {
        span.record("trace", trace.as_str());
    }

    async move {
        let response = next.run(request).await;
        info!(status = response.status().as_u16(), "request finished");
        response
    }
    .instrument(span)
    .await
}

/// Trace id part of an `X-Cloud-Trace-Context` value.
pub fn trace_id(header: &str) -> Option<&str> {
    let id = header.split(['/', ';']).next()?.trim();
    (!id.is_empty()).then_some(id)
}

fn trace_resource(project: Option<&str>, id: &str) -> String {
    match project {
        Some(project) => format!("projects/{project}/traces/{id}"),
        None => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_id_is_the_part_before_the_span() {
        assert_eq!(
            trace_id("105445aa7843bc8bf206b12000100000/1;o=1"),
            Some("105445aa7843bc8bf206b12000100000")
        );
        assert_eq!(trace_id("abc;o=1"), Some("abc"));
        assert_eq!(trace_id("abc"), Some("abc"));
        assert_eq!(trace_id(""), None);
        assert_eq!(trace_id("/1"), None);
    }

    #[test]
    fn project_qualifies_the_trace() {
        assert_eq!(
            trace_resource(Some("audit-prod"), "abc"),
            "projects/audit-prod/traces/abc"
        );
        assert_eq!(trace_resource(None, "abc"), "abc");
    }
}
