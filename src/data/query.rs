//! Variable values as submitted by a client alongside a query.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

use crate::data::value::Value;

fn deserialize_variables<'de, D>(deserializer: D) -> Result<HashMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let pairs: HashMap<String, serde_json::Value> = Deserialize::deserialize(deserializer)?;
    Ok(pairs.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
}

/// Variable values for a GraphQL query, keyed by variable name without the
/// leading `$`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct QueryVariables(
    #[serde(deserialize_with = "deserialize_variables")] HashMap<String, Value>,
);

impl QueryVariables {
    pub fn new(variables: HashMap<String, Value>) -> Self {
        QueryVariables(variables)
    }
}

impl Deref for QueryVariables {
    type Target = HashMap<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for QueryVariables {
    fn deref_mut(&mut self) -> &mut HashMap<String, Value> {
        &mut self.0
    }
}

impl Serialize for QueryVariables {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_from_json() {
        let vars: QueryVariables =
            serde_json::from_str(r#"{"episode": "EMPIRE", "first": 3, "flag": true}"#).unwrap();
        assert_eq!(vars.get("episode"), Some(&Value::String("EMPIRE".to_owned())));
        assert_eq!(vars.get("first"), Some(&Value::Int(3)));
        assert_eq!(vars.get("flag"), Some(&Value::Boolean(true)));
    }
}
