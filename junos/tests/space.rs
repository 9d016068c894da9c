//! Junos Space client against a mock HTTP server.

use std::time::Duration;

use junos::space::{SoftwareUpgrade, SpaceConfig, SpaceServer};
use junos::{Error, SpaceError};
use wiremock::matchers::{basic_auth, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DEVICES: &str = r#"<devices total="1">
    <device key="131081" uri="/api/space/device-management/devices/131081">
        <name>sdubs-fw</name>
        <ipAddr>10.1.1.1</ipAddr>
        <platform>SRX240H2</platform>
        <OSVersion>12.1X47-D10.4</OSVersion>
        <deviceFamily>junos-es</deviceFamily>
        <connectionStatus>up</connectionStatus>
        <managedStatus>In Sync</managedStatus>
    </device>
</devices>"#;

const PACKAGES: &str = r#"<packages total="1">
    <package key="2064392" uri="/api/space/software-management/packages/2064392">
        <fileName>junos-srxsme-12.1X46-D30.2-domestic.tgz</fileName>
        <version>12.1X46-D30.2</version>
    </package>
</packages>"#;

const IMAGE: &str = "junos-srxsme-12.1X46-D30.2-domestic.tgz";

fn task(id: u64) -> ResponseTemplate {
    ResponseTemplate::new(202).set_body_string(format!(
        "<task href=\"/api/space/job-management/jobs/{id}\"><id>{id}</id></task>"
    ))
}

async fn server() -> (MockServer, SpaceServer) {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/space/device-management/devices"))
        .and(basic_auth("admin", "juniper123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DEVICES))
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/space/software-management/packages"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PACKAGES))
        .mount(&mock)
        .await;

    let config = SpaceConfig::new(mock.address().to_string(), "admin", "juniper123")
        .scheme("http")
        .timeout(Duration::from_secs(5));
    let space = SpaceServer::with_config(config).unwrap();
    (mock, space)
}

#[tokio::test]
async fn test_devices() {
    let (_mock, space) = server().await;

    let devices = space.devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "sdubs-fw");
    assert_eq!(devices[0].ip, "10.1.1.1");
    assert_eq!(devices[0].platform, "SRX240H2");
}

#[tokio::test]
async fn test_add_device_returns_job() {
    let (mock, space) = server().await;
    Mock::given(method("POST"))
        .and(path("/api/space/device-management/discover-devices"))
        .and(header(
            "content-type",
            "application/vnd.net.juniper.space.device-management.discover-devices+xml;version=2;charset=UTF-8",
        ))
        .and(body_string_contains("<ipAddress>sdubs-fw</ipAddress>"))
        .respond_with(task(1345283))
        .mount(&mock)
        .await;

    let job = space.add_device("sdubs-fw", "admin", "juniper123").await.unwrap();
    assert_eq!(job.id, 1345283);
    assert_eq!(job.to_string(), "1345283");
}

#[tokio::test]
async fn test_remove_device() {
    let (mock, space) = server().await;
    Mock::given(method("DELETE"))
        .and(path("/api/space/device-management/devices/131081"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock)
        .await;

    space.remove_device("sdubs-fw").await.unwrap();

    assert!(matches!(
        space.remove_device("nope").await.unwrap_err(),
        Error::Space(SpaceError::DeviceNotFound { .. })
    ));
}

#[tokio::test]
async fn test_stage_and_deploy_software() {
    let (mock, space) = server().await;
    Mock::given(method("POST"))
        .and(path("/api/space/software-management/packages/2064392/exec-stage"))
        .and(body_string_contains(
            "<device href=\"/api/space/device-management/devices/131081\"/>",
        ))
        .and(body_string_contains("<removeAllCheck>false</removeAllCheck>"))
        .respond_with(task(11))
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/space/software-management/packages/2064392/exec-deploy"))
        .and(body_string_contains("<useDownloaded>true</useDownloaded>"))
        .respond_with(task(12))
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/space/software-management/packages/2064392/exec-remove"))
        .respond_with(task(13))
        .mount(&mock)
        .await;

    let staged = space.stage_software("sdubs-fw", IMAGE, false).await.unwrap();
    assert_eq!(staged.id, 11);

    let options = SoftwareUpgrade {
        use_downloaded: true,
        ..SoftwareUpgrade::default()
    };
    let deployed = space.deploy_software("sdubs-fw", IMAGE, &options).await.unwrap();
    assert_eq!(deployed.id, 12);

    let removed = space.remove_staged_software("sdubs-fw", IMAGE).await.unwrap();
    assert_eq!(removed.id, 13);

    assert!(matches!(
        space.stage_software("sdubs-fw", "missing.tgz", false).await.unwrap_err(),
        Error::Space(SpaceError::PackageNotFound { .. })
    ));
}

#[tokio::test]
async fn test_error_status() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&mock)
        .await;

    let config = SpaceConfig::new(mock.address().to_string(), "admin", "wrong").scheme("http");
    let space = SpaceServer::with_config(config).unwrap();

    match space.devices().await.unwrap_err() {
        Error::Space(SpaceError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "Unauthorized");
        }
        other => panic!("expected Status error, got {other:?}"),
    }
}
