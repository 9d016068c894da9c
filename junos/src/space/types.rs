//! Junos Space inventory records.

use serde::{Deserialize, Serialize};

use crate::rpc::xml;

/// A device managed by Junos Space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceDevice {
    /// Space object key, used in device URIs.
    pub id: u64,
    pub name: String,
    pub ip: String,
    pub platform: String,
    pub version: String,
    pub family: String,
    pub serial: String,
    pub connection_status: String,
    pub managed_status: String,
}

impl SpaceDevice {
    pub(crate) fn parse_list(doc: &str) -> Option<Vec<SpaceDevice>> {
        xml::elements(doc, "device")
            .iter()
            .map(|d| {
                let text = |name: &str| d.child_text(name).unwrap_or_default();
                Some(SpaceDevice {
                    id: d.attr("key")?.parse().ok()?,
                    name: text("name"),
                    ip: text("ipAddr"),
                    platform: text("platform"),
                    version: text("OSVersion"),
                    family: text("deviceFamily"),
                    serial: text("serialNumber"),
                    connection_status: text("connectionStatus"),
                    managed_status: text("managedStatus"),
                })
            })
            .collect()
    }
}

/// A software image in the Space repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwarePackage {
    pub id: u64,
    pub file_name: String,
    pub version: String,
    pub platform: String,
}

impl SoftwarePackage {
    pub(crate) fn parse_list(doc: &str) -> Option<Vec<SoftwarePackage>> {
        xml::elements(doc, "package")
            .iter()
            .map(|p| {
                let text = |name: &str| p.child_text(name).unwrap_or_default();
                Some(SoftwarePackage {
                    id: p.attr("key")?.parse().ok()?,
                    file_name: text("fileName"),
                    version: text("version"),
                    platform: text("platformType"),
                })
            })
            .collect()
    }
}

/// Options for deploying an image to a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareUpgrade {
    /// Install the image already staged on the device.
    pub use_downloaded: bool,
    /// Validate the image against the running configuration first.
    pub validate: bool,
    pub reboot: bool,
    /// Minutes to wait before rebooting; 0 reboots immediately.
    pub reboot_after: u32,
    /// Remove existing images from the device before copying.
    pub cleanup: bool,
    /// Delete the package from the device after installing it.
    pub remove_after: bool,
}

impl SoftwareUpgrade {
    pub(crate) fn to_xml(&self) -> String {
        format!(
            "<deviceSoftwareDeployOptions>\
             <useDownloaded>{}</useDownloaded>\
             <validate>{}</validate>\
             <bestEffortLoad>false</bestEffortLoad>\
             <rebootDevice>{}</rebootDevice>\
             <rebootAfterXMinutes>{}</rebootAfterXMinutes>\
             <cleanUpExistingOnDevice>{}</cleanUpExistingOnDevice>\
             <removeAfterDeploy>{}</removeAfterDeploy>\
             </deviceSoftwareDeployOptions>",
            self.use_downloaded,
            self.validate,
            self.reboot,
            self.reboot_after,
            self.cleanup,
            self.remove_after
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_devices() {
        let doc = r#"<devices total="2">
            <device key="131081" uri="/api/space/device-management/devices/131081">
                <name>sdubs-fw</name><ipAddr>10.1.1.1</ipAddr><platform>SRX240H2</platform>
                <OSVersion>12.1X47-D10.4</OSVersion><deviceFamily>junos-es</deviceFamily>
                <serialNumber>AJ4512AF0123</serialNumber><connectionStatus>up</connectionStatus>
                <managedStatus>In Sync</managedStatus>
            </device>
            <device key="131082"><name>core-1</name><ipAddr>10.1.1.2</ipAddr></device>
        </devices>"#;

        let devices = SpaceDevice::parse_list(doc).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].id, 131081);
        assert_eq!(devices[0].platform, "SRX240H2");
        assert_eq!(devices[0].managed_status, "In Sync");
        assert_eq!(devices[1].name, "core-1");
        assert_eq!(devices[1].version, "");
    }

    #[test]
    fn test_device_without_key_is_malformed() {
        assert!(SpaceDevice::parse_list("<devices><device><name>x</name></device></devices>").is_none());
    }

    #[test]
    fn test_upgrade_options_xml() {
        let options = SoftwareUpgrade {
            use_downloaded: true,
            reboot_after: 5,
            ..SoftwareUpgrade::default()
        };
        let xml = options.to_xml();
        assert!(xml.contains("<useDownloaded>true</useDownloaded>"));
        assert!(xml.contains("<rebootAfterXMinutes>5</rebootAfterXMinutes>"));
        assert!(xml.contains("<rebootDevice>false</rebootDevice>"));
    }
}
