use bytes::Bytes;
use rgc_storage::ObjectStore;

/// Repository root used by the layout fixtures.
pub const ROOT: &str = "docker/registry/v2/repositories/";

/// Key prefix of a tag directory.
pub fn tag_dir(image: &str, tag: &str) -> String {
    format!("{ROOT}{image}/_manifests/tags/{tag}/")
}

/// Write a tag the way the registry lays it out: a `current/link` naming
/// `current`, and one index entry per digest in `history`.
pub async fn seed_tag<S: ObjectStore + ?Sized>(
    store: &S,
    image: &str,
    tag: &str,
    current: &str,
    history: &[&str],
) {
    let dir = tag_dir(image, tag);
    store
        .put(
            &format!("{dir}current/link"),
            Bytes::from(format!("sha256:{current}")),
        )
        .await
        .unwrap();
    for digest in history {
        store
            .put(
                &format!("{dir}index/sha256/{digest}/link"),
                Bytes::from(format!("sha256:{digest}")),
            )
            .await
            .unwrap();
    }
    // Layers and revisions sit next to the tags and must survive a cleanup
    store
        .put(
            &format!("{ROOT}{image}/_layers/sha256/{current}/link"),
            Bytes::from(format!("sha256:{current}")),
        )
        .await
        .unwrap();
    store
        .put(
            &format!("{ROOT}{image}/_manifests/revisions/sha256/{current}/link"),
            Bytes::from(format!("sha256:{current}")),
        )
        .await
        .unwrap();
}
