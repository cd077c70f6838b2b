// S3 backend against a MinIO container. Skipped when Docker is unavailable
// or SKIP_S3_TESTS is set.

mod common;

use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use bytes::Bytes;
use common::{ROOT, seed_tag, tag_dir};
use rgc_storage::{ObjectStore, S3Backend, delete_prefix};
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::{ContainerAsync, GenericImage, ImageExt, runners::AsyncRunner};

const MINIO_IMAGE: &str = "minio/minio";
const MINIO_TAG: &str = "RELEASE.2024-02-12T21-36-45Z";
const BUCKET: &str = "registry";

fn should_skip_s3_tests() -> bool {
    std::env::var("SKIP_S3_TESTS").is_ok()
}

struct MinioContext {
    _container: ContainerAsync<GenericImage>,
    endpoint: String,
    access_key: String,
    secret_key: String,
}

impl MinioContext {
    async fn new() -> Result<Self, String> {
        let access_key = "minio-access-key".to_string();
        let secret_key = "minio-secret-key".to_string();

        let container: ContainerAsync<GenericImage> = GenericImage::new(MINIO_IMAGE, MINIO_TAG)
            .with_exposed_port(9000.tcp())
            .with_wait_for(WaitFor::message_on_stdout("API:"))
            .with_env_var("MINIO_ROOT_USER", access_key.clone())
            .with_env_var("MINIO_ROOT_PASSWORD", secret_key.clone())
            .with_cmd(vec!["server", "/data"])
            .start()
            .await
            .map_err(|e| format!("failed to start MinIO container: {e}"))?;

        let host = container
            .get_host()
            .await
            .map_err(|e| format!("failed to get host: {e}"))?;
        let port = container
            .get_host_port_ipv4(9000.tcp())
            .await
            .map_err(|e| format!("failed to get port: {e}"))?;

        Ok(Self {
            _container: container,
            endpoint: format!("{host}:{port}"),
            access_key,
            secret_key,
        })
    }

    async fn create_bucket(&self) -> Result<(), String> {
        let credentials = Credentials::new(
            self.access_key.clone(),
            self.secret_key.clone(),
            None,
            None,
            "test",
        );
        let config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(aws_config::Region::new("us-east-1"))
            .credentials_provider(credentials)
            .endpoint_url(format!("http://{}", self.endpoint))
            .force_path_style(true)
            .build();

        Client::from_conf(config)
            .create_bucket()
            .bucket(BUCKET)
            .send()
            .await
            .map_err(|e| format!("failed to create bucket: {e}"))?;
        Ok(())
    }
}

struct S3TestHarness {
    _context: MinioContext,
    backend: S3Backend,
}

impl S3TestHarness {
    async fn new(prefix: Option<String>) -> Result<Self, String> {
        let context = MinioContext::new().await?;
        context.create_bucket().await?;

        // Bare host:port with secure=false exercises endpoint normalization
        let backend = S3Backend::new(
            BUCKET,
            Some(context.endpoint.clone()),
            Some("us-east-1".to_string()),
            prefix,
            Some(context.access_key.clone()),
            Some(context.secret_key.clone()),
            true,
            false,
        )
        .await
        .map_err(|e| format!("failed to create S3 backend: {e}"))?;

        Ok(Self {
            _context: context,
            backend,
        })
    }
}

macro_rules! harness_or_skip {
    ($prefix:expr) => {{
        if should_skip_s3_tests() {
            return;
        }
        match S3TestHarness::new($prefix).await {
            Ok(harness) => harness,
            Err(err) => {
                eprintln!("Skipping S3 test: {err}");
                return;
            }
        }
    }};
}

#[tokio::test]
async fn test_s3_list_children_uses_common_prefixes() {
    let harness = harness_or_skip!(Some("mirror".to_string()));
    let backend = &harness.backend;
    backend.health_check().await.unwrap();

    seed_tag(backend, "app", "latest", "AAA", &["AAA", "BBB"]).await;
    let dir = tag_dir("app", "latest");

    assert_eq!(
        backend.list_children(ROOT).await.unwrap(),
        vec![format!("{ROOT}app/")]
    );
    assert_eq!(
        backend.list_children(&dir).await.unwrap(),
        vec![format!("{dir}current/"), format!("{dir}index/")]
    );
    assert_eq!(
        backend
            .list_children(&format!("{dir}index/sha256/"))
            .await
            .unwrap(),
        vec![
            format!("{dir}index/sha256/AAA/"),
            format!("{dir}index/sha256/BBB/")
        ]
    );
}

#[tokio::test]
async fn test_s3_delete_prefix_and_not_found() {
    let harness = harness_or_skip!(None);
    let backend = &harness.backend;

    seed_tag(backend, "app", "v1", "AAA", &["AAA", "BBB"]).await;
    let dir = tag_dir("app", "v1");

    assert_eq!(
        delete_prefix(backend, &format!("{dir}index/sha256/BBB/"))
            .await
            .unwrap(),
        1
    );
    assert!(
        !backend
            .exists(&format!("{dir}index/sha256/BBB/link"))
            .await
            .unwrap()
    );
    assert!(
        backend
            .exists(&format!("{dir}index/sha256/AAA/link"))
            .await
            .unwrap()
    );
    assert!(
        backend
            .delete(&format!("{dir}index/sha256/BBB/link"))
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(
        backend
            .get(&format!("{dir}missing"))
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn test_s3_delete_prefix_removes_folder_marker() {
    let harness = harness_or_skip!(Some("mirror".to_string()));
    let backend = &harness.backend;

    seed_tag(backend, "app", "v2", "AAA", &["AAA"]).await;
    let dir = tag_dir("app", "v2");
    let marker = format!("{dir}index/sha256/CCC/");
    backend.put(&marker, Bytes::new()).await.unwrap();

    // The marker is a listed entry but not a child of itself
    assert!(
        backend
            .list_children(&format!("{dir}index/sha256/"))
            .await
            .unwrap()
            .contains(&marker)
    );
    assert!(backend.list_children(&marker).await.unwrap().is_empty());
    assert_eq!(backend.list(&marker).await.unwrap(), vec![marker.clone()]);

    assert_eq!(delete_prefix(backend, &marker).await.unwrap(), 1);
    assert_eq!(
        backend
            .list_children(&format!("{dir}index/sha256/"))
            .await
            .unwrap(),
        vec![format!("{dir}index/sha256/AAA/")]
    );
    assert_eq!(delete_prefix(backend, &marker).await.unwrap(), 0);
}
