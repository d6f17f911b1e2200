//! Per-league rules configuration.
//!
//! Leagues carry a schema-free JSON tree of settings. [`Rules`] reads it with strictly typed
//! path accessors and [`LeagueRules`] is the typed view the rest of the bot works with.

mod league_rules;

use serde_json::{Map, Value};
use thiserror::Error;

pub use league_rules::{
    FixedPair, LeagueRules, APPROVAL_PATH, COMPARISON_MODE_PATH, DISTANCE_PATH,
};

#[derive(Debug, Error, PartialEq)]
pub enum RulesError {
    #[error("Rules value at `{path}` should be {expected}, but it is {found}")]
    WrongType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Invalid rules value at `{path}`: {message}")]
    InvalidValue { path: String, message: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rules(Value);

impl Default for Rules {
    fn default() -> Self {
        Rules(Value::Object(Map::new()))
    }
}

impl From<Value> for Rules {
    fn from(value: Value) -> Self {
        Rules(value)
    }
}

impl Rules {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn bool_at(&self, path: &str) -> Result<Option<bool>, RulesError> {
        self.typed_at(path, "a boolean", Value::as_bool)
    }

    pub fn number_at(&self, path: &str) -> Result<Option<f64>, RulesError> {
        self.typed_at(path, "a number", Value::as_f64)
    }

    pub fn string_at(&self, path: &str) -> Result<Option<&str>, RulesError> {
        self.typed_at(path, "a string", Value::as_str)
    }

    pub fn array_at(&self, path: &str) -> Result<Option<&[Value]>, RulesError> {
        self.typed_at(path, "an array", |value| value.as_array().map(Vec::as_slice))
    }

    /// Sets the value at a dotted path, creating intermediate objects.
    ///
    /// Fails if an intermediate segment already holds something other than an object.
    pub fn set_at(&mut self, path: &str, value: Value) -> Result<(), RulesError> {
        if self.0.is_null() {
            self.0 = Value::Object(Map::new());
        }

        let segments: Vec<&str> = path.split('.').collect();
        let (last, parents) = segments
            .split_last()
            .expect("split always yields at least one segment");

        let mut current = &mut self.0;
        for (depth, segment) in parents.iter().enumerate() {
            let found = type_name(current);
            let object = current.as_object_mut().ok_or_else(|| RulesError::WrongType {
                path: segments[..depth].join("."),
                expected: "an object",
                found,
            })?;
            current = object
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }

        let found = type_name(current);
        let object = current.as_object_mut().ok_or_else(|| RulesError::WrongType {
            path: parents.join("."),
            expected: "an object",
            found,
        })?;
        object.insert(last.to_string(), value);

        Ok(())
    }

    fn typed_at<'a, T>(
        &'a self,
        path: &str,
        expected: &'static str,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<Option<T>, RulesError> {
        match self.lookup(path)? {
            None => Ok(None),
            Some(value) => match extract(value) {
                Some(typed) => Ok(Some(typed)),
                None => Err(RulesError::WrongType {
                    path: path.to_string(),
                    expected,
                    found: type_name(value),
                }),
            },
        }
    }

    /// Walks a dotted path. Missing keys and JSON `null` both read as absent.
    fn lookup(&self, path: &str) -> Result<Option<&Value>, RulesError> {
        let mut current = &self.0;
        let mut walked = Vec::new();

        for segment in path.split('.') {
            let object = match current {
                Value::Null => return Ok(None),
                Value::Object(object) => object,
                other => {
                    return Err(RulesError::WrongType {
                        path: walked.join("."),
                        expected: "an object",
                        found: type_name(other),
                    })
                }
            };

            match object.get(segment) {
                Some(value) => current = value,
                None => return Ok(None),
            }
            walked.push(segment);
        }

        Ok(match current {
            Value::Null => None,
            value => Some(value),
        })
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_log::test;

    use super::{Rules, RulesError};

    fn rules() -> Rules {
        Rules::from(json!({
            "running": {
                "require_approval": true,
                "distance_m": 5000,
                "comparison_mode": "personal_progress",
                "flag_as_text": "true",
            },
            "doubles": { "pairs": [[1, 2], [3, 4]] },
            "scalar": 3,
        }))
    }

    #[test]
    fn reads_typed_values() {
        let rules = rules();
        assert_eq!(rules.bool_at("running.require_approval"), Ok(Some(true)));
        assert_eq!(rules.number_at("running.distance_m"), Ok(Some(5000.0)));
        assert_eq!(
            rules.string_at("running.comparison_mode"),
            Ok(Some("personal_progress"))
        );
        assert_eq!(rules.array_at("doubles.pairs").unwrap().unwrap().len(), 2);
    }

    #[test]
    fn missing_paths_are_absent() {
        let rules = rules();
        assert_eq!(rules.bool_at("running.unknown"), Ok(None));
        assert_eq!(rules.bool_at("nothing.here.at_all"), Ok(None));
        assert_eq!(Rules::default().number_at("running.distance_m"), Ok(None));
    }

    #[test]
    fn rejects_wrong_types_without_coercion() {
        assert_eq!(
            rules().bool_at("running.flag_as_text"),
            Err(RulesError::WrongType {
                path: "running.flag_as_text".to_string(),
                expected: "a boolean",
                found: "a string",
            })
        );
    }

    #[test]
    fn rejects_walking_through_scalars() {
        assert_eq!(
            rules().bool_at("scalar.nested"),
            Err(RulesError::WrongType {
                path: "scalar".to_string(),
                expected: "an object",
                found: "a number",
            })
        );
    }

    #[test]
    fn null_reads_as_absent() {
        let rules = Rules::from(json!({ "running": { "distance_m": null } }));
        assert_eq!(rules.number_at("running.distance_m"), Ok(None));
    }

    #[test]
    fn sets_nested_values() {
        let mut rules = Rules::default();
        rules.set_at("running.require_approval", json!(true)).unwrap();
        rules.set_at("running.distance_m", json!(3000)).unwrap();

        assert_eq!(
            rules.as_value(),
            &json!({ "running": { "require_approval": true, "distance_m": 3000 } })
        );
    }

    #[test]
    fn refuses_to_overwrite_scalars_with_objects() {
        let mut rules = rules();
        assert!(rules.set_at("scalar.nested", json!(1)).is_err());
    }
}
