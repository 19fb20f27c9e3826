//! Resolution against mocked upstream documents.

mod common;

use cloud_image_pool::{DirPool, ErrorKind, HashAlgorithm};
use cloud_image_pool::pool::PoolEntry;
use common::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn ubuntu_precise_scenario() {
    let server = MockServer::start().await;
    mount_ubuntu(&server, &good_sha256(), 0).await;

    let artifact = provisioner(&server)
        .resolve("ubuntu", "12.04", "x86_64")
        .await
        .unwrap();

    assert_eq!(artifact.url(), format!("{}{}", server.uri(), UBUNTU_IMAGE_PATH));
    assert_eq!(artifact.filename(), "ubuntu-12.04-server-cloudimg-amd64-disk1.img");
    assert_eq!(artifact.serial(), UBUNTU_SERIAL);
    assert_eq!(artifact.hash_algorithm(), Some(HashAlgorithm::Sha256));
    assert_eq!(artifact.checksum_value(), Some(good_sha256().as_str()));
}

#[tokio::test]
async fn no_released_server_row_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/query/released.latest.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("precise\tserver\tbeta\t20190101\nprecise\tdesktop\trelease\t20190102\n"),
        )
        .mount(&server)
        .await;

    let err = provisioner(&server)
        .resolve("ubuntu", "12.04", "amd64")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn missing_checksum_row_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/query/released.latest.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(release_index()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(UBUNTU_SUMS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("abcd *some-other-file.img\n"))
        .mount(&server)
        .await;

    let err = provisioner(&server)
        .resolve("ubuntu", "12.04", "amd64")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("ubuntu-12.04-server-cloudimg-amd64-disk1.img"));
}

#[tokio::test]
async fn server_error_is_upstream_not_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/query/released.latest.txt"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = provisioner(&server)
        .resolve("ubuntu", "12.04", "amd64")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
}

#[tokio::test]
async fn generic_listing_without_match_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/generic/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<a href="centos-6.4-20130920-cloudimg-amd64.img">x</a>"#),
        )
        .mount(&server)
        .await;

    let err = provisioner(&server)
        .resolve("fedora", "19", "amd64")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn generic_checksum_uses_sha512() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/generic/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<a href="centos-6.4-20130920-cloudimg-amd64.img">x</a>"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/generic/centos-6.4-20130920-cloudimg-amd64.img.sha512"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("  {}\n", good_sha512())))
        .mount(&server)
        .await;

    let artifact = provisioner(&server)
        .resolve("centos", "6.4", "amd64")
        .await
        .unwrap();
    assert_eq!(artifact.serial(), "20130920");
    assert_eq!(artifact.hash_algorithm(), Some(HashAlgorithm::Sha512));
    assert_eq!(artifact.checksum_value(), Some(good_sha512().as_str()));
}

#[tokio::test]
async fn debian_resolves_latest_build_and_ingests() {
    let server = MockServer::start().await;
    let listing = r#"
<a href="20240102-1600/">20240102-1600/</a>
<a href="latest/">latest/</a>
<a href="20241013-1744/">20241013-1744/</a>
"#;
    Mock::given(method("GET"))
        .and(path("/debian/bookworm/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/debian/bookworm/20241013-1744/SHA512SUMS"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("{}  debian-12-genericcloud-amd64.qcow2\n", good_sha512())),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/debian/bookworm/20241013-1744/debian-12-genericcloud-amd64.qcow2"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(image_bytes()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let pool = DirPool::open(dir.path()).await.unwrap();

    let entry = provisioner(&server)
        .ensure(&pool, "debian", "12", "x86_64")
        .await
        .unwrap();
    assert_eq!(entry.name(), "debian-12-20241013-1744-cloudimg-x86_64.img");
}
