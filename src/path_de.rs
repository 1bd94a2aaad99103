use serde::de::DeserializeOwned;

/// Decoding failure, located by the JSON path of the offending value.
#[derive(Debug, thiserror::Error)]
#[error("at JSON path {path} → {message}")]
pub struct PathError {
    pub path: String,
    pub message: String,
}

/// Deserialize with JSON-path context in error messages.
///
/// serde_json's nesting limit is lifted and the stack grows on demand, so
/// deeply chained expressions load; `Options::max_depth` bounds the walks
/// that follow.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, PathError> {
    decode(&mut serde_json::Deserializer::from_str(src))
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PathError> {
    decode(&mut serde_json::Deserializer::from_slice(bytes))
}

fn decode<'de, R, T>(de: &mut serde_json::Deserializer<R>) -> Result<T, PathError>
where
    R: serde_json::de::Read<'de>,
    T: DeserializeOwned,
{
    de.disable_recursion_limit();
    let stacked = serde_stacker::Deserializer::new(&mut *de);
    let value = serde_path_to_error::deserialize::<_, T>(stacked).map_err(|err| PathError {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    })?;
    de.end().map_err(|err| PathError { path: ".".to_string(), message: err.to_string() })?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Wrapper {
        inner: Inner,
    }

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Inner {
        depth: usize,
    }

    #[test]
    fn error_names_the_failing_path() {
        let err = from_str_with_path::<Wrapper>(r#"{"inner": {"depth": "deep"}}"#).unwrap_err();
        assert_eq!(err.path, "inner.depth");
    }

    #[test]
    fn nesting_beyond_serde_default_loads() {
        let depth = 600;
        let src = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        let node = from_str_with_path::<Node>(&src).unwrap();
        let mut levels = 0;
        let mut cur = &node;
        while let Some([inner]) = cur.as_sequence() {
            cur = inner;
            levels += 1;
        }
        assert_eq!(levels, depth - 1);
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(from_slice_with_path::<Node>(b"{} {}").is_err());
        assert!(from_slice_with_path::<Node>(b"{\"a\": [1, 2]}").is_ok());
    }
}
