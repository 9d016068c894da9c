//! Session lifecycle, commands and reads against the simulated device.

use futures_util::future::join_all;
use junos::sim::SimulatedDevice;
use junos::{Error, OutputFormat, Session, SessionError, TransportError};

fn device(hostname: &str) -> SimulatedDevice {
    SimulatedDevice::builder(hostname)
        .model("SRX240H2")
        .version("12.1X47-D10.4")
        .config(format!(
            "set system host-name {hostname}\nset security zones security-zone trust"
        ))
        .user("admin", "juniper123")
        .command_output(
            "show interfaces terse",
            "Interface  Admin Link Proto Local\nge-0/0/0   up    up\n",
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_open_gathers_facts() {
    let device = device("sdubs-fw");
    let transport = device.login("admin", "juniper123").unwrap();
    let session = Session::with_transport("10.1.1.1", transport).await.unwrap();

    assert_eq!(session.host(), "10.1.1.1");
    assert_eq!(session.hostname(), "sdubs-fw");
    let re = &session.facts().platforms[0];
    assert_eq!(re.model, "SRX240H2");
    assert_eq!(re.version, "12.1X47-D10.4");
    assert_eq!(
        session.facts().to_string(),
        "Hostname: sdubs-fw\nre0: Model: SRX240H2, Version: 12.1X47-D10.4\n"
    );
    assert!(session.is_alive());
}

#[tokio::test]
async fn test_bad_password_is_auth_error() {
    let device = device("r1");
    let err = device.login("admin", "wrong").unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(TransportError::AuthenticationFailed { ref user }) if user == "admin"
    ));
    assert_eq!(device.session_count(), 0);
}

#[tokio::test]
async fn test_commands() {
    let device = device("r1");
    let mut session = device.open_session("admin").await.unwrap();

    let response = session
        .command("show interfaces terse", OutputFormat::Text)
        .await
        .unwrap();
    assert!(response.contains("ge-0/0/0"));
    assert_eq!(response.lines().count(), 2);

    let version = session.command("show version", OutputFormat::Xml).await.unwrap();
    assert!(version.result.contains("<product-model>SRX240H2</product-model>"));

    match session.command("show bogus", OutputFormat::Text).await.unwrap_err() {
        Error::Session(SessionError::Command { command, message }) => {
            assert_eq!(command, "show bogus");
            assert!(message.contains("syntax error"));
        }
        other => panic!("expected Command error, got {other:?}"),
    }

    assert!(matches!(
        session.command("   ", OutputFormat::Text).await.unwrap_err(),
        Error::Session(SessionError::InvalidArgument { .. })
    ));
    assert!(session.is_alive());
}

#[tokio::test]
async fn test_get_config_scopes() {
    let device = device("r1");
    let mut session = device.open_session("admin").await.unwrap();

    let full = session.get_config("full", OutputFormat::Text).await.unwrap();
    assert!(full.contains("host-name r1;"));
    assert!(full.contains("security-zone trust;"));

    let security = session.get_config("security", OutputFormat::Text).await.unwrap();
    assert!(!security.contains("host-name"));

    for scope in ["snmp", "System/../etc"] {
        assert!(matches!(
            session.get_config(scope, OutputFormat::Text).await.unwrap_err(),
            Error::Session(SessionError::NotFound { .. })
        ));
    }
}

#[tokio::test]
async fn test_severed_connection_closes_session() {
    let device = device("r1");
    let mut session = device.open_session("admin").await.unwrap();

    device.sever_sessions();
    assert!(!session.is_alive());

    let err = session.command("show version", OutputFormat::Text).await.unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, Error::Transport(TransportError::Disconnected)));

    assert!(matches!(
        session.command("show version", OutputFormat::Text).await.unwrap_err(),
        Error::Session(SessionError::NotConnected)
    ));
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_sessions_to_many_devices_run_concurrently() {
    let devices: Vec<SimulatedDevice> = ["r1", "r2", "r3"].into_iter().map(device).collect();

    let results = join_all(devices.iter().map(|device| async move {
        let mut session = device.open_session("admin").await?;
        let response = session.command("show version", OutputFormat::Text).await?;
        session.close().await?;
        Ok::<_, Error>(response.result)
    }))
    .await;

    for (result, name) in results.into_iter().zip(["r1", "r2", "r3"]) {
        assert!(result.unwrap().contains(&format!("Hostname: {name}")));
    }
}
