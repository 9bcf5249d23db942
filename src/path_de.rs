use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// A deserialization failure with the JSON path of the offending node.
#[derive(Debug, Clone, Error)]
#[error("at JSON path {path} → {message}")]
pub struct PathError {
    pub path: String,
    pub message: String,
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(into_path_error)
}

pub fn from_value_with_path<T: DeserializeOwned>(value: Value) -> Result<T, PathError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(into_path_error)
}

fn into_path_error(err: serde_path_to_error::Error<serde_json::Error>) -> PathError {
    PathError {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Outer {
        #[allow(dead_code)]
        inner: Vec<Inner>,
    }

    #[derive(Debug, Deserialize)]
    struct Inner {
        #[allow(dead_code)]
        count: u32,
    }

    #[test]
    fn reports_nested_path() {
        let err = from_str_with_path::<Outer>(r#"{"inner": [{"count": 1}, {"count": "x"}]}"#)
            .unwrap_err();
        assert_eq!(err.path, "inner[1].count");

        let err = from_value_with_path::<Outer>(json!({"inner": [{"count": -1}]})).unwrap_err();
        assert_eq!(err.path, "inner[0].count");
    }
}
