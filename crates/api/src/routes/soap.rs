//! SOAP endpoint.
//!
//! Domain outcomes always travel in a 200 response; the `code` inside the
//! JSON payload tells success from failure. Only calls that cannot be
//! dispatched produce a `Fault`, sent with status 500 as SOAP 1.1 requires.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use store::{ArticleStore, UserStore};

use super::AppState;
use crate::auth::Credentials;
use crate::envelope;
use crate::rpc;

pub const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// POST /soap
#[tracing::instrument(skip_all)]
pub async fn handle<S: UserStore + ArticleStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Ok(xml) = std::str::from_utf8(&body) else {
        return fault("Request body is not valid UTF-8");
    };
    let call = match envelope::parse_call(xml) {
        Ok(call) => call,
        Err(e) => {
            tracing::debug!(error = %e, "rejected soap envelope");
            return fault(&e.to_string());
        }
    };

    let credentials = Credentials::from_headers(&headers);
    match rpc::call(&state, &call.operation, &call.args, &credentials).await {
        Ok(result) => xml_response(
            StatusCode::OK,
            envelope::render_response(&call.operation, &result.to_string()),
        ),
        Err(e) => {
            tracing::debug!(operation = %call.operation, error = %e, "soap call faulted");
            fault(&e.to_string())
        }
    }
}

fn fault(message: &str) -> Response {
    xml_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        envelope::render_fault(message),
    )
}

fn xml_response(status: StatusCode, xml: String) -> Response {
    (status, [(header::CONTENT_TYPE, XML_CONTENT_TYPE)], xml).into_response()
}
