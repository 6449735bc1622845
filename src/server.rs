use crate::{
    Envelope, EnvelopeHeader, KeyPair, MethodError, Params, RequestObject, Result, Sealed,
    ServerConfig,
};
use serde_json::Value;
use std::{
    collections::HashMap,
    fmt::{self, Debug, Formatter},
};

/// Receives the decoded method name and parameters of each request.
pub trait Delegate {
    /// Run `method` with `params`
    fn invoke(
        &self,
        method: &str,
        params: Option<Params>,
    ) -> std::result::Result<Value, MethodError>;
}

/// A registered method handler
pub type Handler =
    Box<dyn Fn(Option<Params>) -> std::result::Result<Value, MethodError> + Send + Sync>;

/// A [`Delegate`] that dispatches by name to explicitly registered
/// handlers. Names that were never registered are rejected.
#[derive(Default)]
pub struct MethodTable {
    handlers: HashMap<String, Handler>,
}

impl Debug for MethodTable {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let mut names = self.handlers.keys().collect::<Vec<_>>();
        names.sort();
        f.debug_struct("MethodTable")
            .field("methods", &names)
            .finish()
    }
}

impl MethodTable {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any previous handler
    pub fn register<S, F>(&mut self, name: S, handler: F) -> &mut Self
    where
        S: Into<String>,
        F: Fn(Option<Params>) -> std::result::Result<Value, MethodError> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Box::new(handler));
        self
    }

    /// Builder form of [`MethodTable::register`]
    pub fn with<S, F>(mut self, name: S, handler: F) -> Self
    where
        S: Into<String>,
        F: Fn(Option<Params>) -> std::result::Result<Value, MethodError> + Send + Sync + 'static,
    {
        self.register(name, handler);
        self
    }

    /// Whether `name` has a handler
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

impl Delegate for MethodTable {
    fn invoke(
        &self,
        method: &str,
        params: Option<Params>,
    ) -> std::result::Result<Value, MethodError> {
        let handler = self.handlers.get(method).ok_or_else(|| {
            tracing::warn!(method, "unknown method");
            MethodError::UnknownMethod(method.to_string())
        })?;
        handler(params)
    }
}

/// The answering side: opens sealed requests and hands them to a delegate.
///
/// The server normally holds the private key.
#[derive(Debug)]
pub struct RpcServer<D = MethodTable> {
    envelope: Envelope,
    delegate: D,
}

impl<D: Delegate> RpcServer<D> {
    /// Create a server for `key` dispatching to `delegate`
    pub fn new(key: KeyPair, delegate: D) -> Self {
        Self {
            envelope: Envelope::new(key),
            delegate,
        }
    }

    /// Create a server from configuration, reading the key from disk
    pub fn from_config(config: &ServerConfig, delegate: D) -> Result<Self> {
        Ok(Self::new(KeyPair::from_pem_file(&config.key_path)?, delegate))
    }

    /// The envelope used for requests and replies
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// The delegate
    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    /// Open and validate a sealed request
    pub fn open_request<I, K, V>(&self, body: &str, headers: I) -> Result<RequestObject>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let header = EnvelopeHeader::from_headers(headers)?;
        let request: RequestObject = self.envelope.open_json(body, &header)?;
        request.validate()?;
        Ok(request)
    }

    /// Open a sealed request and return the delegate's result
    pub fn handle<I, K, V>(&self, body: &str, headers: I) -> Result<Value>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let request = self.open_request(body, headers)?;
        tracing::debug!(method = %request.method, "dispatching request");
        Ok(self.delegate.invoke(&request.method, request.params)?)
    }

    /// [`RpcServer::handle`] followed by sealing the result for the reply
    pub fn respond<I, K, V>(&self, body: &str, headers: I) -> Result<Sealed>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let result = self.handle(body, headers)?;
        Ok(self.envelope.seal_json(&result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EnvelopeError, Error, keys::fixtures::*};
    use rstest::*;
    use serde_json::json;

    fn table() -> MethodTable {
        MethodTable::new()
            .with("ping", |_| Ok(json!({"result": "pong"})))
            .with("echo", |params| {
                params
                    .map(Value::from)
                    .ok_or_else(|| MethodError::InvalidParams("echo needs params".to_string()))
            })
    }

    fn request(method: &str, params: Option<Value>) -> Sealed {
        let request = RequestObject::new(method, params.map(|p| p.try_into().unwrap()));
        Envelope::new(public()).seal_json(&request).unwrap()
    }

    #[rstest]
    #[case::ping("ping", None, json!({"result": "pong"}))]
    #[case::echo_object("echo", Some(json!({"x": 1})), json!({"x": 1}))]
    #[case::echo_array("echo", Some(json!([1, 2, 3])), json!([1, 2, 3]))]
    fn dispatches(#[case] method: &str, #[case] params: Option<Value>, #[case] expected: Value) {
        let server = RpcServer::new(private(), table());
        let sealed = request(method, params);
        let result = server
            .handle(&sealed.body, sealed.header.pairs())
            .unwrap();
        assert_eq!(result, expected);
    }

    #[test]
    fn unknown_method() {
        let server = RpcServer::new(private(), table());
        let sealed = request("destroy", None);
        assert!(matches!(
            server.handle(&sealed.body, sealed.header.pairs()).unwrap_err(),
            Error::Method(MethodError::UnknownMethod(m)) if m == "destroy"
        ));
    }

    #[test]
    fn handler_rejects_params() {
        let server = RpcServer::new(private(), table());
        let sealed = request("echo", None);
        assert!(matches!(
            server.handle(&sealed.body, sealed.header.pairs()).unwrap_err(),
            Error::Method(MethodError::InvalidParams(_))
        ));
    }

    #[test]
    fn respond_seals_reply_for_client() {
        let server = RpcServer::new(private(), table());
        let sealed = request("ping", None);
        let reply = server.respond(&sealed.body, sealed.header.pairs()).unwrap();
        let opened: Value = Envelope::new(public())
            .open_json(&reply.body, &reply.header)
            .unwrap();
        assert_eq!(opened, json!({"result": "pong"}));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let server = RpcServer::new(private(), table());
        let sealed = Envelope::new(public())
            .seal_json(&json!({"method": "ping", "jsonrpc": "1.0"}))
            .unwrap();
        assert!(matches!(
            server.handle(&sealed.body, sealed.header.pairs()).unwrap_err(),
            Error::InvalidRequest(_)
        ));
    }

    #[test]
    fn tampered_request_is_an_envelope_error() {
        let server = RpcServer::new(private(), table());
        let sealed = request("ping", None);
        let mut body = sealed.body.clone();
        body.replace_range(0..1, if body.starts_with('A') { "B" } else { "A" });
        assert!(matches!(
            server.handle(&body, sealed.header.pairs()).unwrap_err(),
            Error::Envelope(EnvelopeError::Integrity)
        ));
    }

    #[test]
    fn custom_delegate() {
        struct Upper;
        impl Delegate for Upper {
            fn invoke(
                &self,
                method: &str,
                _params: Option<Params>,
            ) -> std::result::Result<Value, MethodError> {
                Ok(Value::String(method.to_uppercase()))
            }
        }
        let server = RpcServer::new(private(), Upper);
        let sealed = request("shout", None);
        assert_eq!(
            server.handle(&sealed.body, sealed.header.pairs()).unwrap(),
            json!("SHOUT")
        );
    }

    #[test]
    fn table_debug_lists_methods() {
        let t = table();
        assert!(t.contains("ping"));
        assert!(!t.contains("pong"));
        assert_eq!(
            format!("{:?}", t),
            r#"MethodTable { methods: ["echo", "ping"] }"#
        );
    }
}
