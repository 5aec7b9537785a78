use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metadata::dtype::Dtype;

/// Semantic type of a tensor. Decides how samples are serialized and read back.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Htype {
    #[default]
    Generic,
    Image,
    ClassLabel,
    BBox,
    Text,
    Json,
    List,
}

impl Htype {
    pub fn default_dtype(self) -> Option<Dtype> {
        match self {
            Htype::Image => Some(Dtype::U8),
            Htype::ClassLabel => Some(Dtype::U32),
            Htype::BBox => Some(Dtype::F32),
            Htype::Generic | Htype::Text | Htype::Json | Htype::List => None,
        }
    }

    /// Text-like samples are stored as encoded bytes and decoded on read.
    pub fn is_text_like(self) -> bool {
        matches!(self, Htype::Text | Htype::Json | Htype::List)
    }

    pub fn name(self) -> &'static str {
        match self {
            Htype::Generic => "generic",
            Htype::Image => "image",
            Htype::ClassLabel => "class_label",
            Htype::BBox => "bbox",
            Htype::Text => "text",
            Htype::Json => "json",
            Htype::List => "list",
        }
    }
}

impl fmt::Display for Htype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_like_htypes() {
        assert!(Htype::Text.is_text_like());
        assert!(Htype::Json.is_text_like());
        assert!(Htype::List.is_text_like());
        assert!(!Htype::Image.is_text_like());
        assert!(!Htype::Generic.is_text_like());
    }

    #[test]
    fn default_dtypes() {
        assert_eq!(Htype::Image.default_dtype(), Some(Dtype::U8));
        assert_eq!(Htype::ClassLabel.default_dtype(), Some(Dtype::U32));
        assert_eq!(Htype::Generic.default_dtype(), None);
    }
}
