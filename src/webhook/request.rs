//! Builds the `POST /graphql` request for a single submission attempt

use reqwest::{Method, Url};

use super::error::RequestError;
use super::types::{
    Coordinate, WebhookBody, WebhookVariables, CATEGORY_SET_LOCATION, OPERATION_NAME,
    WEBHOOK_QUERY, WEBHOOK_STATUS,
};

/// Path segment appended to the service base URL
pub const GRAPHQL_PATH: &str = "graphql";

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// A fully-formed submission. Built fresh for every attempt and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    coordinate: Coordinate,
    endpoint: Url,
    body: WebhookBody,
}

impl SubmissionRequest {
    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// JSON payload; serialized by the HTTP client when the request is sent
    pub fn body(&self) -> &WebhookBody {
        &self.body
    }

    pub fn method(&self) -> Method {
        Method::POST
    }

    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE_JSON
    }
}

/// Build the webhook request for `coordinate` against the service at `base_url`
///
/// Non-finite coordinates are a caller error: the scheduler should never hand
/// over unset values, so they are rejected here rather than sent as `null`.
pub fn build(coordinate: Coordinate, base_url: &str) -> Result<SubmissionRequest, RequestError> {
    if !coordinate.is_finite() {
        return Err(RequestError::InvalidCoordinate {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
        });
    }

    let endpoint = graphql_endpoint(base_url)?;

    let body = WebhookBody {
        operation_name: OPERATION_NAME,
        variables: WebhookVariables {
            category: CATEGORY_SET_LOCATION,
            data: [coordinate.latitude, coordinate.longitude],
            status: WEBHOOK_STATUS,
        },
        query: WEBHOOK_QUERY,
    };

    Ok(SubmissionRequest {
        coordinate,
        endpoint,
        body,
    })
}

/// `{base}/graphql`, tolerating a trailing slash and dropping query/fragment
fn graphql_endpoint(base_url: &str) -> Result<Url, RequestError> {
    let invalid = |reason: String| RequestError::InvalidEndpoint {
        url: base_url.to_string(),
        reason,
    };

    let mut url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| invalid("URL cannot carry a path".to_string()))?
        .pop_if_empty()
        .push(GRAPHQL_PATH);
    Ok(url)
}
