//! Box set loader (TOML)
//!
//! ```toml
//! [[boxes]]
//! name = "S"
//! capacity = 4
//! own_weight = 0.18
//!
//! [[boxes]]
//! name = "M"
//! capacity = 8
//! own_weight = 0.26
//! dimensions = { length_cm = 30.0, width_cm = 20.0, height_cm = 15.0 }
//! ```

use std::path::Path;

use packcheck_domain::model::BoxSettings;
use packcheck_types::{Error, Result, ValidationError};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct BoxSetFile {
    #[serde(default)]
    boxes: Vec<BoxSettings>,
}

/// Load box types from a TOML file, sorted ascending by capacity
pub fn load_box_set(path: &Path) -> Result<Vec<BoxSettings>> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    parse_box_set(&content)
}

pub fn parse_box_set(content: &str) -> Result<Vec<BoxSettings>> {
    let file: BoxSetFile = toml::from_str(content)?;
    for settings in &file.boxes {
        if !settings.own_weight.is_finite() || settings.own_weight < 0.0 {
            return Err(ValidationError::new(
                format!("boxes.{}.own_weight", settings.name),
                format!("must be >= 0, got {}", settings.own_weight),
            )
            .into());
        }
    }
    let mut boxes = file.boxes;
    boxes.sort_by_key(|b| b.capacity);
    Ok(boxes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sorted_by_capacity() {
        let boxes = parse_box_set(
            r#"
[[boxes]]
name = "M"
capacity = 8
own_weight = 0.26

[[boxes]]
name = "S"
capacity = 4
"#,
        )
        .unwrap();
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].name, "S");
        assert_eq!(boxes[0].own_weight, 0.0);
        assert_eq!(boxes[1].capacity, 8);
    }

    #[test]
    fn test_negative_own_weight_rejected() {
        let err = parse_box_set(
            r#"
[[boxes]]
name = "S"
capacity = 4
own_weight = -1.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_box_set(Path::new("/nonexistent/boxes.toml")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }
}
