//! Node type tags and their classification.
//!
//! Type tags in the document are dotted strings such as `collectra.Image`.
//! The tag is kept verbatim for serialization, and classified once into a
//! closed [`NodeKind`] so rule code never does substring tests on tags.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The closed set of node kinds the resolver knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum NodeKind {
    /// A whole source image.
    Image,
    /// A rectangular region of an image (carries a crop region).
    ImageCrop,
    /// Free-text content attached to a crop, or a correction of other text.
    Text,
    /// Any tag that does not classify as one of the above.
    Other,
}

impl NodeKind {
    /// All kinds, in display order.
    pub const ALL: [NodeKind; 4] = [
        NodeKind::Image,
        NodeKind::ImageCrop,
        NodeKind::Text,
        NodeKind::Other,
    ];

    /// Classifies a dotted type tag by its last segment.
    ///
    /// `collectra.ImageCrop` and a bare `ImageCrop` are both crops; a tag like
    /// `collectra.TextStyle` is *not* Text.
    pub fn classify(tag: &str) -> NodeKind {
        let leaf = tag.rsplit('.').next().unwrap_or(tag);
        match leaf {
            "Image" => NodeKind::Image,
            "ImageCrop" => NodeKind::ImageCrop,
            "Text" => NodeKind::Text,
            _ => NodeKind::Other,
        }
    }

    /// The canonical tag used for newly created nodes of this kind.
    pub fn canonical_tag(self) -> &'static str {
        match self {
            NodeKind::Image => "collectra.Image",
            NodeKind::ImageCrop => "collectra.ImageCrop",
            NodeKind::Text => "collectra.Text",
            NodeKind::Other => "collectra.Other",
        }
    }

    /// Short name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Image => "Image",
            NodeKind::ImageCrop => "ImageCrop",
            NodeKind::Text => "Text",
            NodeKind::Other => "Other",
        }
    }

    /// Whether nodes of this kind must carry a crop region.
    pub fn is_crop_bearing(self) -> bool {
        self == NodeKind::ImageCrop
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(NodeKind::Image),
            "imagecrop" | "image-crop" | "crop" => Ok(NodeKind::ImageCrop),
            "text" => Ok(NodeKind::Text),
            "other" => Ok(NodeKind::Other),
            other => Err(format!(
                "unknown node kind '{other}' (expected image, imagecrop, text, or other)"
            )),
        }
    }
}

/// A node's type: the verbatim tag plus its classified kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeType {
    tag: String,
    kind: NodeKind,
}

impl NodeType {
    /// Builds a type from a raw document tag.
    pub fn from_tag(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let kind = NodeKind::classify(&tag);
        Self { tag, kind }
    }

    /// Builds the canonical type for a kind.
    pub fn of_kind(kind: NodeKind) -> Self {
        Self {
            tag: kind.canonical_tag().to_string(),
            kind,
        }
    }

    /// The tag exactly as it appeared in the document.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Category membership test.
    #[inline]
    pub fn is_a(&self, kind: NodeKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

impl Serialize for NodeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.tag)
    }
}
