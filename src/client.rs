use crate::{
    ClientConfig, ConnectionError, Envelope, EnvelopeHeader, HttpResponse, HttpTransport, KeyPair,
    Params, RequestObject, Result, Transport,
};
use serde_json::Value;

/// The calling side: seals JSON-RPC requests, posts them, and opens the
/// replies.
///
/// The client normally holds the server's public key, so requests are
/// confidential to the server and replies are known to come from it.
#[derive(Debug)]
pub struct RpcClient<T = HttpTransport> {
    url: String,
    envelope: Envelope,
    transport: T,
}

impl RpcClient<HttpTransport> {
    /// Create a client posting to `url` over HTTP
    pub fn new<S: Into<String>>(url: S, key: KeyPair) -> Result<Self> {
        Ok(Self::with_transport(url, key, HttpTransport::new(None)?))
    }

    /// Create a client from configuration, reading the key from disk
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let key = KeyPair::from_pem_file(&config.key_path)?;
        let transport = HttpTransport::new(config.timeout())?;
        Ok(Self::with_transport(config.url.clone(), key, transport))
    }
}

impl<T: Transport> RpcClient<T> {
    /// Create a client with a custom transport
    pub fn with_transport<S: Into<String>>(url: S, key: KeyPair, transport: T) -> Self {
        Self {
            url: url.into(),
            envelope: Envelope::new(key),
            transport,
        }
    }

    /// The endpoint
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The envelope used for requests and replies
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Call `method` on the remote side and return whatever it answered.
    ///
    /// A status outside `[200, 400)` fails with [`ConnectionError`] and the
    /// reply is not opened.
    pub fn call(&self, method: &str, params: Option<Params>) -> Result<Value> {
        let request = RequestObject::new(method, params);
        let sealed = self.envelope.seal_json(&request)?;

        tracing::debug!(method, url = %self.url, "posting sealed request");
        let response = self
            .transport
            .post(&self.url, &sealed.body, &sealed.header.pairs())?;
        classify(&response)?;

        let header = EnvelopeHeader::from_headers(
            response.headers.iter().map(|(n, v)| (n.as_str(), v.as_str())),
        )?;
        Ok(self.envelope.open_json(&response.body, &header)?)
    }
}

fn classify(response: &HttpResponse) -> std::result::Result<(), ConnectionError> {
    if response.is_success() {
        return Ok(());
    }
    tracing::warn!(
        status = response.status,
        message = %response.message,
        "request failed"
    );
    Err(ConnectionError {
        code: response.status,
        message: response.message.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EnvelopeError, Error, keys::fixtures::*};
    use serde_json::json;
    use std::cell::RefCell;

    /// Answers every post with a fixed response and keeps what was posted.
    #[derive(Debug, Default)]
    struct Recorder {
        response: HttpResponse,
        posted: RefCell<Vec<(String, String, Vec<(String, String)>)>>,
    }

    impl Transport for Recorder {
        fn post(&self, url: &str, body: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
            self.posted.borrow_mut().push((
                url.to_string(),
                body.to_string(),
                headers
                    .iter()
                    .map(|(n, v)| (n.to_string(), v.to_string()))
                    .collect(),
            ));
            Ok(self.response.clone())
        }
    }

    fn reply(status: u16, message: &str, value: &Value) -> HttpResponse {
        let sealed = Envelope::new(private()).seal_json(value).unwrap();
        HttpResponse {
            status,
            message: message.to_string(),
            headers: sealed
                .header
                .pairs()
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            body: sealed.body,
        }
    }

    #[test]
    fn ping_pong() {
        let transport = Recorder {
            response: reply(200, "OK", &json!({"result": "pong"})),
            ..Default::default()
        };
        let client = RpcClient::with_transport("http://localhost/rpc", public(), &transport);
        let response = client.call("ping", None).unwrap();
        assert_eq!(response, json!({"result": "pong"}));

        let posted = transport.posted.borrow();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].0, "http://localhost/rpc");
        let names = posted[0].2.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["key", "iv"]);
    }

    #[test]
    fn request_is_sealed_for_the_server() {
        let transport = Recorder {
            response: reply(200, "OK", &json!(null)),
            ..Default::default()
        };
        let client = RpcClient::with_transport("http://localhost/rpc", public(), &transport);
        client
            .call("echo", Some(json!({"x": 1}).try_into().unwrap()))
            .unwrap();

        let posted = transport.posted.borrow();
        let (_, body, headers) = &posted[0];
        assert!(!body.contains("echo"));
        let header = EnvelopeHeader::from_headers(headers.clone()).unwrap();
        let opened: Value = Envelope::new(private()).open_json(body, &header).unwrap();
        assert_eq!(
            opened,
            json!({"method": "echo", "params": {"x": 1}, "jsonrpc": "2.0"})
        );
    }

    #[test]
    fn server_error_is_connection_error() {
        // the body is not an envelope, opening it would fail differently
        let transport = Recorder {
            response: HttpResponse {
                status: 500,
                message: "Internal Server Error ".to_string(),
                headers: vec![],
                body: "<html>oops</html>".to_string(),
            },
            ..Default::default()
        };
        let client = RpcClient::with_transport("http://localhost/rpc", public(), &transport);
        match client.call("ping", None).unwrap_err() {
            Error::Connection(ConnectionError { code, message }) => {
                assert_eq!(code, 500);
                assert_eq!(message, "Internal Server Error");
            }
            e => panic!("unexpected error {:?}", e),
        }
    }

    #[test]
    fn redirect_status_is_opened() {
        let transport = Recorder {
            response: reply(302, "Found", &json!([1, 2])),
            ..Default::default()
        };
        let client = RpcClient::with_transport("http://localhost/rpc", public(), &transport);
        assert_eq!(client.call("list", None).unwrap(), json!([1, 2]));
    }

    #[test]
    fn missing_reply_headers() {
        let mut response = reply(200, "OK", &json!("x"));
        response.headers.clear();
        let transport = Recorder {
            response,
            ..Default::default()
        };
        let client = RpcClient::with_transport("http://localhost/rpc", public(), &transport);
        assert!(matches!(
            client.call("ping", None).unwrap_err(),
            Error::Envelope(EnvelopeError::MissingHeader("key"))
        ));
    }
}
