use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::ser::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller-supplied properties a flow is started with.
///
/// Props are stored in the envelope next to the ledger, so a resumed render
/// sees the same props as the original one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowProps(Map<String, Value>);

impl FlowProps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build props from any serializable struct or map.
    ///
    /// `()` and `None` produce empty props; anything that does not serialize
    /// to a JSON object is rejected.
    pub fn from_typed<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        match serde_json::to_value(value).map_err(Error::Marshal)? {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(Error::Marshal(serde_json::Error::custom(format!(
                "flow props must be an object, got {}",
                other
            )))),
        }
    }

    /// Decode the props into a typed struct.
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.0.clone())).map_err(Error::InvalidProps)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for FlowProps {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Poll {
        question: String,
        #[serde(default)]
        anonymous: bool,
    }

    #[test]
    fn test_typed_round_trip() {
        let props = FlowProps::from_typed(&Poll {
            question: "Lunch?".into(),
            anonymous: true,
        })
        .unwrap();
        assert_eq!(props.get("question"), Some(&json!("Lunch?")));

        let back: Poll = props.to_typed().unwrap();
        assert_eq!(back.question, "Lunch?");
        assert!(back.anonymous);
    }

    #[test]
    fn test_unit_is_empty_and_scalars_are_rejected() {
        assert!(FlowProps::from_typed(&()).unwrap().is_empty());
        assert!(matches!(FlowProps::from_typed(&42), Err(Error::Marshal(_))));
    }

    #[test]
    fn test_missing_field_is_invalid_props() {
        let props = FlowProps::new().with("anonymous", false);
        assert!(matches!(
            props.to_typed::<Poll>(),
            Err(Error::InvalidProps(_))
        ));
    }
}
