use serde::Serialize;

use guide_core::{GuideError, GuideResult};

pub(crate) fn to_yaml<T: Serialize>(document: &str, value: &T) -> GuideResult<String> {
    serde_yaml::to_string(value).map_err(|source| GuideError::Render {
        document: document.to_string(),
        source,
    })
}

pub(crate) fn to_value<T: Serialize>(document: &str, value: &T) -> GuideResult<serde_yaml::Value> {
    serde_yaml::to_value(value).map_err(|source| GuideError::Render {
        document: document.to_string(),
        source,
    })
}

/// Join objects into one multi-document YAML stream.
pub(crate) fn multi_document(document: &str, objects: &[serde_yaml::Value]) -> GuideResult<String> {
    let mut out = String::new();
    for object in objects {
        out.push_str("---\n");
        out.push_str(&to_yaml(document, object)?);
    }
    Ok(out)
}
