//! Registry layout fixtures.

use bytes::Bytes;
use rgc_storage::ObjectStore;

/// Key of a tag's `current/link` below `root`.
#[allow(dead_code)]
pub fn tag_pointer(root: &str, image: &str, tag: &str) -> String {
    format!("{root}{image}/_manifests/tags/{tag}/current/link")
}

/// Key of an index entry's link object below `root`.
#[allow(dead_code)]
pub fn index_link(root: &str, image: &str, tag: &str, digest: &str) -> String {
    format!("{root}{image}/_manifests/tags/{tag}/index/sha256/{digest}/link")
}

/// Write a tag as the registry does: a current link plus one index entry per
/// digest in `history`, with a layer and a revision beside it.
#[allow(dead_code)]
pub async fn seed_tag(
    store: &dyn ObjectStore,
    root: &str,
    image: &str,
    tag: &str,
    current: &str,
    history: &[&str],
) {
    store
        .put(
            &tag_pointer(root, image, tag),
            Bytes::from(format!("sha256:{current}")),
        )
        .await
        .unwrap();
    for digest in history {
        store
            .put(
                &index_link(root, image, tag, digest),
                Bytes::from(format!("sha256:{digest}")),
            )
            .await
            .unwrap();
    }
    store
        .put(
            &format!("{root}{image}/_layers/sha256/{current}/link"),
            Bytes::from(format!("sha256:{current}")),
        )
        .await
        .unwrap();
    store
        .put(
            &format!("{root}{image}/_manifests/revisions/sha256/{current}/link"),
            Bytes::from(format!("sha256:{current}")),
        )
        .await
        .unwrap();
}
