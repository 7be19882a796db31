//! Keyed batch sources: field name to an ordered map of entry URLs.
//!
//! Item N of field `F` (1-based, in source order) is stored as `F/F N.mp4`.

use serde_json::Value;

use crate::resolver::ResourceRef;

use super::error::ManifestError;
use super::types::ManifestEntry;

pub fn parse_keyed(json: &str) -> Result<Vec<ManifestEntry>, ManifestError> {
    let root: Value = serde_json::from_str(json)?;
    let Value::Object(fields) = root else {
        return Err(ManifestError::Shape(
            "top level must map field names to URL maps".to_string(),
        ));
    };

    let mut entries = Vec::new();
    for (field, urls) in fields {
        let Value::Object(urls) = urls else {
            return Err(ManifestError::Shape(format!(
                "field {} must map names to URLs",
                field
            )));
        };

        for (index, (name, url)) in urls.into_iter().enumerate() {
            let Value::String(url) = url else {
                return Err(ManifestError::Shape(format!(
                    "{}.{} is not a URL string",
                    field, name
                )));
            };
            let filename = format!("{} {}.mp4", field, index + 1);
            entries.push(ManifestEntry::new(
                field.as_str(),
                ResourceRef::new(url, name)
                    .with_extension("mp4")
                    .with_fixed_filename(filename),
            ));
        }
    }
    Ok(entries)
}
