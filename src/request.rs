use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The only protocol version spoken
pub const JSONRPC_VERSION: &str = "2.0";

/// Call parameters: positional or named, never a bare scalar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Params {
    /// Positional parameters
    Array(Vec<Value>),
    /// Named parameters
    Object(Map<String, Value>),
}

impl From<Vec<Value>> for Params {
    fn from(v: Vec<Value>) -> Self {
        Params::Array(v)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(m: Map<String, Value>) -> Self {
        Params::Object(m)
    }
}

impl TryFrom<Value> for Params {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Array(a) => Ok(Params::Array(a)),
            Value::Object(o) => Ok(Params::Object(o)),
            other => Err(Error::InvalidRequest(format!(
                "params must be an array or object, got {}",
                other
            ))),
        }
    }
}

impl From<Params> for Value {
    fn from(p: Params) -> Self {
        match p {
            Params::Array(a) => Value::Array(a),
            Params::Object(o) => Value::Object(o),
        }
    }
}

/// A JSON-RPC 2.0 request without an id.
///
/// `params` is left out of the JSON entirely when absent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestObject {
    /// The method name
    pub method: String,
    /// Optional parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    /// Always `"2.0"`
    pub jsonrpc: String,
}

impl RequestObject {
    /// Build a request for `method`
    pub fn new<S: Into<String>>(method: S, params: Option<Params>) -> Self {
        Self {
            method: method.into(),
            params,
            jsonrpc: JSONRPC_VERSION.to_string(),
        }
    }

    /// Check the version tag and method name
    pub fn validate(&self) -> Result<()> {
        if self.jsonrpc != JSONRPC_VERSION {
            return Err(Error::InvalidRequest(format!(
                "unsupported jsonrpc version {:?}",
                self.jsonrpc
            )));
        }
        if self.method.is_empty() {
            return Err(Error::InvalidRequest("empty method name".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use serde_json::json;

    #[test]
    fn absent_params_are_omitted() {
        let text = serde_json::to_string(&RequestObject::new("ping", None)).unwrap();
        assert_eq!(text, r#"{"method":"ping","jsonrpc":"2.0"}"#);
    }

    #[rstest]
    #[case::object(json!({"x": 1}), r#"{"method":"echo","params":{"x":1},"jsonrpc":"2.0"}"#)]
    #[case::array(json!([1, "two"]), r#"{"method":"echo","params":[1,"two"],"jsonrpc":"2.0"}"#)]
    fn params_are_serialized(#[case] params: Value, #[case] expected: &str) {
        let req = RequestObject::new("echo", Some(params.try_into().unwrap()));
        assert_eq!(serde_json::to_string(&req).unwrap(), expected);
        let back: RequestObject = serde_json::from_str(expected).unwrap();
        assert_eq!(back, req);
    }

    #[rstest]
    #[case::number(json!(1))]
    #[case::string(json!("x"))]
    #[case::null(json!(null))]
    fn scalar_params_rejected(#[case] value: Value) {
        assert!(Params::try_from(value).is_err());
    }

    #[test]
    fn scalar_params_do_not_deserialize() {
        let text = r#"{"method":"echo","params":5,"jsonrpc":"2.0"}"#;
        assert!(serde_json::from_str::<RequestObject>(text).is_err());
    }

    #[test]
    fn null_params_read_as_absent() {
        let text = r#"{"method":"ping","params":null,"jsonrpc":"2.0"}"#;
        let req: RequestObject = serde_json::from_str(text).unwrap();
        assert_eq!(req.params, None);
    }

    #[rstest]
    #[case::old_version(r#"{"method":"ping","jsonrpc":"1.0"}"#)]
    #[case::empty_method(r#"{"method":"","jsonrpc":"2.0"}"#)]
    fn invalid_requests(#[case] text: &str) {
        let req: RequestObject = serde_json::from_str(text).unwrap();
        assert!(matches!(req.validate(), Err(Error::InvalidRequest(_))));
    }
}
