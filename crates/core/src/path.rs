//! Registry storage layout: path classification and tag-pointer parsing.
//!
//! The registry keeps, per repository and tag:
//!
//! ```text
//! <root><image>/_manifests/tags/<tag>/current/link            -> "sha256:<current>"
//! <root><image>/_manifests/tags/<tag>/index/sha256/<digest>/link
//! ```
//!
//! Keys are plain strings; "directories" are key prefixes ending in `/`.

use crate::error::{Error, Result};

/// Suffix identifying the object that names a tag's current digest.
pub const TAG_POINTER_SUFFIX: &str = "/current/link";

/// Subtrees that never contain tag pointers and can be very large.
pub const NOISE_SUFFIXES: [&str; 4] = [
    "_layers/",
    "_uploads/",
    "_manifests/revisions/sha256/",
    "index/sha256/",
];

/// Algorithm prefix used in link files and manifest references.
pub const DIGEST_PREFIX: &str = "sha256:";

/// Identifier logged in place of an image or tag that could not be parsed.
pub const UNRESOLVED: &str = "<unresolved>";

const TAGS_SEGMENT: &str = "/_manifests/tags/";
const CURRENT_LINK: &str = "current/link";
const INDEX_NAMESPACE: &str = "index/sha256/";
const INDEX_SEGMENT: &str = "/index/sha256/";

/// What a listed key is, as far as the tree scan is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathKind {
    /// The configured repository root.
    Root,
    /// A container that must be expanded further.
    InternalNode,
    /// A subtree that is never descended into.
    Noise,
    /// A `current/link` object.
    TagPointer,
}

/// Classifies keys relative to a repository root.
#[derive(Clone, Debug)]
pub struct PathClassifier {
    root: String,
}

impl PathClassifier {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn classify(&self, key: &str) -> PathKind {
        if key == self.root {
            PathKind::Root
        } else if NOISE_SUFFIXES.iter().any(|suffix| key.ends_with(suffix)) {
            PathKind::Noise
        } else if key.ends_with(TAG_POINTER_SUFFIX) {
            PathKind::TagPointer
        } else {
            PathKind::InternalNode
        }
    }
}

/// A discovered `.../_manifests/tags/<tag>/current/link` key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagPointer {
    key: String,
    names: Option<(String, String)>,
}

impl TagPointer {
    /// Parse a tag-pointer key found under `root`.
    ///
    /// Fails only when the key does not end in `current/link`. A key that does but
    /// whose image/tag cannot be extracted still parses; [`TagPointer::image`] and
    /// [`TagPointer::tag`] then return [`UNRESOLVED`].
    pub fn parse(root: &str, key: &str) -> Result<Self> {
        if !key.ends_with(TAG_POINTER_SUFFIX) {
            return Err(Error::InvalidTagPointer(key.to_string()));
        }
        Ok(Self {
            key: key.to_string(),
            names: split_image_tag(root, key),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Repository name, e.g. `library/nginx`.
    pub fn image(&self) -> &str {
        self.names.as_ref().map_or(UNRESOLVED, |(image, _)| image)
    }

    pub fn tag(&self) -> &str {
        self.names.as_ref().map_or(UNRESOLVED, |(_, tag)| tag)
    }

    /// Whether image and tag were extracted from the key.
    pub fn is_resolved(&self) -> bool {
        self.names.is_some()
    }

    /// Prefix under which every digest ever indexed for this tag lives.
    pub fn index_prefix(&self) -> String {
        let base = self
            .key
            .strip_suffix(CURRENT_LINK)
            .unwrap_or(self.key.as_str());
        format!("{base}{INDEX_NAMESPACE}")
    }

    /// Index entry prefix for `digest` (bare hex, no algorithm).
    pub fn index_entry(&self, digest: &str) -> String {
        format!("{}{digest}/", self.index_prefix())
    }
}

fn split_image_tag(root: &str, key: &str) -> Option<(String, String)> {
    let rest = key.strip_prefix(root)?.strip_suffix(TAG_POINTER_SUFFIX)?;
    let (image, tag) = rest.rsplit_once(TAGS_SEGMENT)?;
    if image.is_empty() || tag.is_empty() {
        return None;
    }
    Some((image.to_string(), tag.to_string()))
}

/// Extract the bare digest from the content of a link object.
///
/// `sha256:abc...` and bare `abc...` are both accepted; surrounding whitespace is ignored.
pub fn parse_link_digest(content: &str) -> Result<String> {
    let trimmed = content.trim();
    let digest = trimmed.strip_prefix(DIGEST_PREFIX).unwrap_or(trimmed);
    if digest.is_empty() || digest.contains('/') || digest.contains(char::is_whitespace) {
        return Err(Error::InvalidDigest(trimmed.to_string()));
    }
    Ok(digest.to_string())
}

/// Extract the digest segment from an index entry key such as
/// `.../index/sha256/<digest>/` or `.../index/sha256/<digest>/link`.
pub fn index_entry_digest(entry: &str) -> Option<&str> {
    let (_, rest) = entry.rsplit_once(INDEX_SEGMENT)?;
    let (digest, _) = rest.split_once('/')?;
    (!digest.is_empty()).then_some(digest)
}

/// Manifest reference for a bare digest, as the registry API expects it.
pub fn manifest_reference(digest: &str) -> String {
    format!("{DIGEST_PREFIX}{digest}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "docker/registry/v2/repositories/";

    #[test]
    fn classify_noise_suffixes() {
        let classifier = PathClassifier::new(ROOT);
        for key in [
            "docker/registry/v2/repositories/app/_layers/",
            "docker/registry/v2/repositories/app/_uploads/",
            "docker/registry/v2/repositories/app/_manifests/revisions/sha256/",
            "docker/registry/v2/repositories/app/_manifests/tags/v1/index/sha256/",
        ] {
            assert_eq!(classifier.classify(key), PathKind::Noise, "{key}");
        }
    }

    #[test]
    fn classify_tag_pointer_and_nodes() {
        let classifier = PathClassifier::new(ROOT);
        assert_eq!(classifier.classify(ROOT), PathKind::Root);
        assert_eq!(
            classifier.classify("docker/registry/v2/repositories/app/_manifests/tags/v1/current/link"),
            PathKind::TagPointer
        );
        assert_eq!(
            classifier.classify("docker/registry/v2/repositories/app/_manifests/tags/v1/current/"),
            PathKind::InternalNode
        );
        assert_eq!(
            classifier.classify("docker/registry/v2/repositories/team/app/"),
            PathKind::InternalNode
        );
    }

    #[test]
    fn tag_pointer_extracts_nested_image() {
        let key = format!("{ROOT}team/app/_manifests/tags/1.2.3/current/link");
        let pointer = TagPointer::parse(ROOT, &key).unwrap();
        assert!(pointer.is_resolved());
        assert_eq!(pointer.image(), "team/app");
        assert_eq!(pointer.tag(), "1.2.3");
        assert_eq!(
            pointer.index_prefix(),
            format!("{ROOT}team/app/_manifests/tags/1.2.3/index/sha256/")
        );
        assert_eq!(
            pointer.index_entry("abc"),
            format!("{ROOT}team/app/_manifests/tags/1.2.3/index/sha256/abc/")
        );
    }

    #[test]
    fn tag_pointer_outside_root_degrades_to_sentinel() {
        let key = "elsewhere/app/_manifests/tags/v1/current/link";
        let pointer = TagPointer::parse(ROOT, key).unwrap();
        assert!(!pointer.is_resolved());
        assert_eq!(pointer.image(), UNRESOLVED);
        assert_eq!(pointer.tag(), UNRESOLVED);
        assert_eq!(
            pointer.index_prefix(),
            "elsewhere/app/_manifests/tags/v1/index/sha256/"
        );
    }

    #[test]
    fn tag_pointer_rejects_other_keys() {
        assert!(TagPointer::parse(ROOT, "docker/registry/v2/repositories/app/").is_err());
    }

    #[test]
    fn link_digest_parsing() {
        assert_eq!(parse_link_digest("sha256:abc123").unwrap(), "abc123");
        assert_eq!(parse_link_digest("abc123\n").unwrap(), "abc123");
        assert!(parse_link_digest("sha256:").is_err());
        assert!(parse_link_digest("").is_err());
        assert!(parse_link_digest("sha256:a/b").is_err());
    }

    #[test]
    fn index_entry_digest_parsing() {
        assert_eq!(
            index_entry_digest("repo/a/_manifests/tags/t/index/sha256/BBB/"),
            Some("BBB")
        );
        assert_eq!(
            index_entry_digest("repo/a/_manifests/tags/t/index/sha256/BBB/link"),
            Some("BBB")
        );
        assert_eq!(index_entry_digest("repo/a/_manifests/tags/t/index/sha256/"), None);
        assert_eq!(index_entry_digest("repo/a/_manifests/tags/t/current/link"), None);
    }

    #[test]
    fn manifest_reference_prefixes_algorithm() {
        assert_eq!(manifest_reference("BBB"), "sha256:BBB");
    }
}
