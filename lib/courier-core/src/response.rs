//! HTTP response description.

use std::collections::HashMap;

use bytes::Bytes;

/// An inbound HTTP response: status, headers, and buffered body.
///
/// Response-phase plugins receive mutable access and may rewrite any field
/// before the caller observes the response.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HashMap<String, String>,
    body: Bytes,
}

impl Response {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Replace the status code.
    pub const fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub const fn headers_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.headers
    }

    /// Single header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replace the response body.
    pub fn set_body(&mut self, body: Bytes) {
        self.body = body;
    }

    /// Consume into body.
    #[must_use]
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Status is 2xx or 3xx.
    ///
    /// Purely status-derived; a response with `ok() == false` is still
    /// returned as `Ok(response)` by the pipeline, never as an error.
    #[must_use]
    pub const fn ok(&self) -> bool {
        self.status >= 200 && self.status < 400
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 3xx.
    #[must_use]
    pub const fn is_redirection(&self) -> bool {
        self.status >= 300 && self.status < 400
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }

    /// Deserialize the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        crate::from_json(&self.body)
    }

    /// Get the response body as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid UTF-8.
    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_status(status: u16) -> Response {
        Response::new(status, HashMap::new(), Bytes::new())
    }

    #[test]
    fn ok_covers_success_and_redirection() {
        assert!(with_status(200).ok());
        assert!(with_status(204).ok());
        assert!(with_status(301).ok());
        assert!(!with_status(404).ok());
        assert!(!with_status(503).ok());
    }

    #[test]
    fn status_classes() {
        assert!(with_status(200).is_success());
        assert!(with_status(302).is_redirection());
        assert!(with_status(418).is_client_error());
        assert!(with_status(500).is_server_error());
    }

    #[test]
    fn json_body() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Item {
            id: u64,
        }

        let response = Response::new(200, HashMap::new(), Bytes::from(r#"{"id":7}"#));
        let item: Item = response.json().expect("deserialize");
        assert_eq!(item, Item { id: 7 });
    }

    #[test]
    fn text_body() {
        let response = Response::new(200, HashMap::new(), Bytes::from("Hello, pipeline"));
        assert_eq!(response.text().expect("utf-8"), "Hello, pipeline");
    }

    #[test]
    fn mutators() {
        let mut response = with_status(200);
        response.set_status(502);
        response.headers_mut().insert("Retry-After".into(), "1".into());
        response.set_body(Bytes::from_static(b"oops"));

        assert!(response.is_server_error());
        assert_eq!(response.header("Retry-After"), Some("1"));
        assert_eq!(response.body().as_ref(), b"oops");
    }
}
