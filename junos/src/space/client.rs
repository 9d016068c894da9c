//! Junos Space REST client.

use std::time::Duration;

use log::debug;
use reqwest::{Client, Method, RequestBuilder, Url};
use secrecy::{ExposeSecret, SecretString};

use super::job::Job;
use super::types::{SoftwarePackage, SoftwareUpgrade, SpaceDevice};
use crate::error::{Result, SessionError, SpaceError};
use crate::rpc::xml;

const DEVICES: &str = "api/space/device-management/devices";
const DISCOVER: &str = "api/space/device-management/discover-devices";
const PACKAGES: &str = "api/space/software-management/packages";

const DISCOVER_TYPE: &str =
    "application/vnd.net.juniper.space.device-management.discover-devices+xml;version=2;charset=UTF-8";
const STAGE_TYPE: &str =
    "application/vnd.net.juniper.space.software-management.exec-stage+xml;version=1;charset=UTF-8";
const DEPLOY_TYPE: &str =
    "application/vnd.net.juniper.space.software-management.exec-deploy+xml;version=1;charset=UTF-8";
const REMOVE_TYPE: &str =
    "application/vnd.net.juniper.space.software-management.exec-remove+xml;version=1;charset=UTF-8";

/// Connection settings for a Junos Space server.
#[derive(Debug, Clone)]
pub struct SpaceConfig {
    pub host: String,
    pub username: String,
    pub password: SecretString,
    /// `https` unless testing against a plain HTTP endpoint.
    pub scheme: String,
    pub timeout: Duration,
    /// Space ships with a self-signed certificate.
    pub accept_invalid_certs: bool,
}

impl SpaceConfig {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecretString>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            scheme: "https".to_string(),
            timeout: Duration::from_secs(30),
            accept_invalid_certs: true,
        }
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

/// Client for one Junos Space server.
///
/// Long-running operations return a [`Job`]; wait for it with
/// [`Job::wait`] and a [`JobPoller`](super::JobPoller) of your choosing.
#[derive(Debug, Clone)]
pub struct SpaceServer {
    client: Client,
    base: Url,
    username: String,
    password: SecretString,
}

impl SpaceServer {
    /// Client for `https://host` with default settings.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecretString>,
    ) -> Result<Self> {
        Self::with_config(SpaceConfig::new(host, username, password))
    }

    pub fn with_config(config: SpaceConfig) -> Result<Self> {
        let base = Url::parse(&format!("{}://{}/", config.scheme, config.host)).map_err(|e| {
            SessionError::InvalidArgument {
                message: format!("invalid Space host '{}': {e}", config.host),
            }
        })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(SpaceError::Http)?;

        Ok(Self {
            client,
            base,
            username: config.username,
            password: config.password,
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.base.join(path).map_err(|e| SpaceError::MalformedResponse {
            message: format!("invalid request path '{path}': {e}"),
        })?;
        debug!("space {} {}", method, url);
        Ok(self
            .client
            .request(method, url)
            .basic_auth(&self.username, Some(self.password.expose_secret())))
    }

    async fn send(&self, request: RequestBuilder) -> Result<String> {
        let response = request.send().await.map_err(SpaceError::Http)?;
        let status = response.status();
        let body = response.text().await.map_err(SpaceError::Http)?;
        if !status.is_success() {
            return Err(SpaceError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        Ok(body)
    }

    async fn submit(&self, path: &str, content_type: &str, body: String) -> Result<Job> {
        let request = self
            .request(Method::POST, path)?
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);
        let reply = self.send(request).await?;
        parse_task(&reply)
    }

    /// Managed devices.
    pub async fn devices(&self) -> Result<Vec<SpaceDevice>> {
        let body = self.send(self.request(Method::GET, DEVICES)?).await?;
        SpaceDevice::parse_list(&body).ok_or_else(|| malformed("device list"))
    }

    async fn device(&self, name: &str) -> Result<SpaceDevice> {
        self.devices()
            .await?
            .into_iter()
            .find(|d| d.name == name)
            .ok_or_else(|| {
                SpaceError::DeviceNotFound {
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Discover a device by address and bring it under management.
    pub async fn add_device(
        &self,
        host: &str,
        username: &str,
        password: impl Into<SecretString>,
    ) -> Result<Job> {
        let password: SecretString = password.into();
        let body = format!(
            "<discover-devices>\
             <ipAddressDiscoveryTarget><ipAddress>{}</ipAddress></ipAddressDiscoveryTarget>\
             <sshCredential><userName>{}</userName><password>{}</password></sshCredential>\
             <manageDiscoveredSystemsFlag>true</manageDiscoveredSystemsFlag>\
             <usePing>true</usePing>\
             </discover-devices>",
            xml::escape(host),
            xml::escape(username),
            xml::escape(password.expose_secret())
        );
        self.submit(DISCOVER, DISCOVER_TYPE, body).await
    }

    /// Stop managing a device.
    pub async fn remove_device(&self, name: &str) -> Result<()> {
        let device = self.device(name).await?;
        let path = format!("{DEVICES}/{}", device.id);
        self.send(self.request(Method::DELETE, &path)?).await?;
        Ok(())
    }

    /// Images in the software repository.
    pub async fn software_packages(&self) -> Result<Vec<SoftwarePackage>> {
        let body = self.send(self.request(Method::GET, PACKAGES)?).await?;
        SoftwarePackage::parse_list(&body).ok_or_else(|| malformed("package list"))
    }

    async fn package(&self, file_name: &str) -> Result<SoftwarePackage> {
        self.software_packages()
            .await?
            .into_iter()
            .find(|p| p.file_name == file_name)
            .ok_or_else(|| {
                SpaceError::PackageNotFound {
                    name: file_name.to_string(),
                }
                .into()
            })
    }

    async fn targets(&self, device: &str, image: &str) -> Result<(String, SoftwarePackage)> {
        let device = self.device(device).await?;
        let package = self.package(image).await?;
        let devices = format!(
            "<devices><device href=\"/{DEVICES}/{}\"/></devices>",
            device.id
        );
        Ok((devices, package))
    }

    /// Copy an image to a device. With `cleanup`, existing images on the
    /// device are removed first.
    pub async fn stage_software(&self, device: &str, image: &str, cleanup: bool) -> Result<Job> {
        let (devices, package) = self.targets(device, image).await?;
        let body = format!(
            "<exec-stage>{devices}<removeAllCheck>{cleanup}</removeAllCheck></exec-stage>"
        );
        let path = format!("{PACKAGES}/{}/exec-stage", package.id);
        self.submit(&path, STAGE_TYPE, body).await
    }

    /// Install an image on a device.
    pub async fn deploy_software(
        &self,
        device: &str,
        image: &str,
        options: &SoftwareUpgrade,
    ) -> Result<Job> {
        let (devices, package) = self.targets(device, image).await?;
        let body = format!("<exec-deploy>{devices}{}</exec-deploy>", options.to_xml());
        let path = format!("{PACKAGES}/{}/exec-deploy", package.id);
        self.submit(&path, DEPLOY_TYPE, body).await
    }

    /// Delete a staged image from a device.
    pub async fn remove_staged_software(&self, device: &str, image: &str) -> Result<Job> {
        let (devices, package) = self.targets(device, image).await?;
        let body = format!("<exec-remove>{devices}</exec-remove>");
        let path = format!("{PACKAGES}/{}/exec-remove", package.id);
        self.submit(&path, REMOVE_TYPE, body).await
    }
}

fn parse_task(body: &str) -> Result<Job> {
    xml::elements(body, "task")
        .first()
        .and_then(|task| task.child_text("id"))
        .and_then(|id| id.parse().ok())
        .map(Job::new)
        .ok_or_else(|| malformed("task"))
}

fn malformed(what: &str) -> crate::Error {
    SpaceError::MalformedResponse {
        message: format!("could not parse {what} response"),
    }
    .into()
}
