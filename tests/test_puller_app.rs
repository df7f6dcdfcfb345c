mod support;

use clap::Parser;
use serde_json::json;

use image_puller::container_specs::MANIFEST_V2_MEDIA_TYPE;
use image_puller::image::EMPTY_LAYER_BLOB_SUM;
use image_puller::reference::ImageReference;
use image_puller::Opt;

use support::{FakeRegistry, Reply};

#[test]
fn test_defaults_resolve_to_docker_hub() {
    let opt = Opt::try_parse_from(["image puller", "ubuntu"]).expect("Should parse arguments");

    assert!(!opt.insecure_tls);
    assert!(!opt.keep_empty_layers);
    assert_eq!(opt.registry_options().timeout.as_secs(), 60);

    let reference =
        ImageReference::parse(&opt.image, &opt.reference_defaults()).expect("Should parse image");
    assert_eq!(reference.registry, "https://registry-1.docker.io/v2");
    assert_eq!(reference.repository, "library/ubuntu");
    assert_eq!(reference.tag, "latest");
    assert_eq!(reference.digest, None);
}

#[test]
fn test_empty_credentials_are_ignored() {
    let opt = Opt::try_parse_from([
        "image puller",
        "ubuntu",
        "--user",
        "",
        "--token",
        "abc",
        "--timeout-minutes",
        "0",
    ])
    .expect("Should parse arguments");

    let credentials = opt.credentials();
    assert_eq!(credentials.user, None);
    assert_eq!(credentials.password, None);
    assert_eq!(credentials.token.as_deref(), Some("abc"));
    assert_eq!(opt.registry_options().timeout.as_secs(), 60);
}

#[test]
fn test_huge_timeout_saturates() {
    let minutes = u64::MAX.to_string();
    let opt = Opt::try_parse_from([
        "image puller",
        "ubuntu",
        "--timeout-minutes",
        minutes.as_str(),
    ])
    .expect("Should parse arguments");

    assert_eq!(opt.registry_options().timeout.as_secs(), u64::MAX);
}

#[tokio::test]
async fn test_pull_main_writes_filtered_layers() {
    let registry = FakeRegistry::start(|req| match (req.path.as_str(), req.authorization.as_deref()) {
        ("/v2/team/app/manifests/1.2", Some("Bearer secret-token")) => {
            let layers: Vec<_> = [EMPTY_LAYER_BLOB_SUM, "sha256:a", EMPTY_LAYER_BLOB_SUM, "sha256:b"]
                .iter()
                .map(|d| json!({"mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip", "size": 32, "digest": d}))
                .collect();
            Reply::status(200)
                .header("content-type", MANIFEST_V2_MEDIA_TYPE)
                .body(
                    json!({
                        "schemaVersion": 2,
                        "mediaType": MANIFEST_V2_MEDIA_TYPE,
                        "config": {"mediaType": "application/vnd.docker.container.image.v1+json", "size": 10, "digest": "sha256:img"},
                        "layers": layers
                    })
                    .to_string(),
                )
        }
        ("/v2/team/app/manifests/1.2", _) => Reply::status(401)
            .header("www-authenticate", req.challenge("repository:team/app:pull")),
        ("/token", _) => Reply::json(json!({"token": "secret-token"})),
        _ => Reply::status(404),
    })
    .await;

    let output_dir = tempfile::tempdir().expect("Should create a temp dir");
    let output_path = output_dir.path().join("layers.json");
    let image = format!("{}/team/app:1.2", registry.addr);
    let opt = Opt::try_parse_from([
        "image puller",
        image.as_str(),
        "--insecure-registry",
        "--insecure-tls",
        "--output-path",
        output_path.to_str().unwrap(),
    ])
    .expect("Should parse arguments");

    let output = image_puller::pull_main(opt).await.expect("Should pull");

    assert_eq!(output.layers.len(), 2);
    assert_eq!(output.analyzed_layer.as_deref(), Some("imgb"));
    assert_eq!(output.layers[1].parent_name.as_deref(), Some("imga"));
    assert_eq!(
        output.layers[0].authorization.as_deref(),
        Some("Bearer secret-token")
    );

    let written = std::fs::read_to_string(&output_path).expect("Should have written output");
    assert!(!written.contains("secret-token"));
    let written: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(written["analyzed_layer"], "imgb");
    assert_eq!(written["layers"].as_array().map(|l| l.len()), Some(2));
    assert_eq!(
        written["layers"][0]["path"],
        format!("http://{}/v2/team/app/blobs/sha256:a", registry.addr)
    );
    assert_eq!(written["image"]["schema_version"], 2);
}
