use crate::Result;
use std::time::Duration;

/// The response side of an HTTP exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Status message, e.g. `Internal Server Error`
    pub message: String,
    /// Response headers as name/value pairs
    pub headers: Vec<(String, String)>,
    /// Response body text
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is in `[200, 400)`
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// Performs one blocking HTTP POST.
pub trait Transport {
    /// POST `body` with the extra `headers` to `url`
    fn post(&self, url: &str, body: &str, headers: &[(&str, &str)]) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post(&self, url: &str, body: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        (**self).post(url, body, headers)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn post(&self, url: &str, body: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        (**self).post(url, body, headers)
    }
}

/// A [`Transport`] backed by a blocking `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a transport with an optional request timeout
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Transport for HttpTransport {
    fn post(&self, url: &str, body: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body.to_string());
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.send()?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        Ok(HttpResponse {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: response.text()?,
        })
    }
}
