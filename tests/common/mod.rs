//! Shared fixtures: a wiremock upstream laid out like the real mirrors and
//! a provisioner pointed at it.

#![allow(dead_code)]

use cloud_image_pool::helpers::ingest::digest_hex;
use cloud_image_pool::repositories::debian::DebianStrategy;
use cloud_image_pool::repositories::generic::GenericStrategy;
use cloud_image_pool::repositories::ubuntu::UbuntuStrategy;
use cloud_image_pool::{HashAlgorithm, Provisioner, ResolverRegistry};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const UBUNTU_SERIAL: &str = "20180308";
pub const UBUNTU_IMAGE_PATH: &str = "/releases/precise/release-20180308/ubuntu-12.04-server-cloudimg-amd64-disk1.img";
pub const UBUNTU_SUMS_PATH: &str = "/releases/precise/release-20180308/SHA256SUMS";

pub fn image_bytes() -> Vec<u8> {
    (0..200_000u32).map(|i| (i % 251) as u8).collect()
}

pub fn release_index() -> String {
    [
        "precise\tserver\tbeta\t20190101",
        "precise\tdesktop\trelease\t20190102",
        "precise\tserver\trelease\t20180308",
        "trusty\tserver\trelease\t20191107",
    ]
    .join("\n")
}

pub fn sha256_sums(checksum: &str) -> String {
    format!(
        "{}  *ubuntu-12.04-server-cloudimg-i386-disk1.img\n{checksum} *ubuntu-12.04-server-cloudimg-amd64-disk1.img\n",
        "1".repeat(64)
    )
}

pub fn provisioner(server: &MockServer) -> Provisioner {
    let registry = ResolverRegistry::new(GenericStrategy::new(format!("{}/generic/", server.uri())))
        .with_strategy(UbuntuStrategy::new(server.uri()))
        .with_strategy(DebianStrategy::new(format!("{}/debian", server.uri())));
    Provisioner::new(reqwest::Client::new(), registry).with_chunk_size(8 * 1024)
}

/// Mounts the Ubuntu index, checksum manifest and image. The manifest
/// advertises `advertised` as the image checksum; `image_hits` is the
/// number of image downloads the test expects.
pub async fn mount_ubuntu(server: &MockServer, advertised: &str, image_hits: u64) {
    Mock::given(method("GET"))
        .and(path("/query/released.latest.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(release_index()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(UBUNTU_SUMS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(sha256_sums(advertised)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(UBUNTU_IMAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(image_bytes()))
        .expect(image_hits)
        .mount(server)
        .await;
}

pub fn good_sha256() -> String {
    digest_hex(HashAlgorithm::Sha256, &image_bytes())
}

pub fn good_sha512() -> String {
    digest_hex(HashAlgorithm::Sha512, &image_bytes())
}
