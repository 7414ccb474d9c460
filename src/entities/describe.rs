//! Human-readable entity descriptions and derived properties

use crate::entities::{EntityId, EntityKind, EntityStore, PropertyValue};
use crate::error::Result;

impl EntityStore {
    /// Short description used for graph node labels and CLI output
    ///
    /// Falls back to the kind name when the identifying fields are empty.
    pub fn description(&self, id: EntityId) -> Result<String> {
        let entity = self.entity(id)?;
        let s = |name: &str| {
            entity
                .value_or_null(name)
                .as_str()
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let described = match entity.kind() {
            EntityKind::Account => match (s("Name"), s("NTDomain"), s("UPNSuffix")) {
                (Some(name), Some(domain), _) => Some(format!("{}\\{}", domain, name)),
                (Some(name), None, Some(upn)) => Some(format!("{}@{}", name, upn)),
                (Some(name), None, None) => Some(name),
                _ => s("AadUserId").or_else(|| s("Sid")),
            },
            EntityKind::Alert => s("DisplayName").or_else(|| s("AlertType")),
            EntityKind::Dns => s("DomainName"),
            EntityKind::File => s("FullPath").or_else(|| s("Name")),
            EntityKind::FileHash => match (s("Algorithm"), s("Value")) {
                (Some(alg), Some(value)) => Some(format!("{}: {}", alg, value)),
                (None, value) => value,
                (Some(_), None) => None,
            },
            EntityKind::GeoLocation => match (s("City"), s("CountryName").or_else(|| s("CountryCode"))) {
                (Some(city), Some(country)) => Some(format!("{}, {}", city, country)),
                (city, country) => city.or(country),
            },
            EntityKind::Host => match (s("HostName"), s("DnsDomain")) {
                (Some(host), Some(domain)) => Some(format!("{}.{}", host, domain)),
                (Some(host), None) => Some(host),
                _ => s("NetBiosName").or_else(|| s("AzureID")),
            },
            EntityKind::HostLogonSession => s("SessionId"),
            EntityKind::IpAddress => s("Address"),
            EntityKind::Malware => s("Name"),
            EntityKind::NetworkConnection => {
                let endpoint = |addr: &str, port: &str| -> Option<String> {
                    let ip = self.get_entity(id, addr).ok().flatten()?;
                    let address = self.entity(ip).ok()?.value_or_null("Address").as_str()?.to_string();
                    let port = entity.value_or_null(port);
                    Some(if port.is_empty() {
                        address
                    } else {
                        format!("{}:{}", address, json_text(port))
                    })
                };
                match (
                    endpoint("SourceAddress", "SourcePort"),
                    endpoint("DestinationAddress", "DestinationPort"),
                ) {
                    (Some(src), Some(dst)) => Some(format!("{} -> {}", src, dst)),
                    (src, dst) => src.or(dst),
                }
            }
            EntityKind::Process => match self.process_file_path(id)? {
                Some(path) => Some(format!(
                    "{}: {}",
                    path,
                    s("CommandLine").unwrap_or_default()
                )),
                None => s("ProcessId"),
            },
            EntityKind::RegistryKey => match (s("Hive"), s("Key")) {
                (Some(hive), Some(key)) => Some(format!("{}\\{}", hive, key)),
                (hive, key) => key.or(hive),
            },
            EntityKind::RegistryValue => s("Name"),
            EntityKind::SecurityGroup => s("DistinguishedName").or_else(|| s("SID")),
            EntityKind::ThreatIntelligence => s("ThreatName").or_else(|| s("ThreatType")),
            EntityKind::Url => s("Url"),
        };

        Ok(described.unwrap_or_else(|| entity.type_name().to_string()))
    }

    /// File name of the process image
    pub fn process_name(&self, id: EntityId) -> Result<Option<String>> {
        self.image_file_field(id, "Name")
    }

    /// Full path of the process image
    pub fn process_file_path(&self, id: EntityId) -> Result<Option<String>> {
        self.image_file_field(id, "FullPath")
    }

    fn image_file_field(&self, id: EntityId, field: &str) -> Result<Option<String>> {
        let entity = self.entity(id)?;
        if entity.kind() != EntityKind::Process {
            return Ok(None);
        }
        let Some(file) = self.get_entity(id, "ImageFile")? else {
            return Ok(None);
        };
        Ok(self
            .entity(file)?
            .get_str(field)?
            .filter(|v| !v.is_empty())
            .map(str::to_string))
    }
}

fn json_text(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Value(serde_json::Value::String(s)) => s.clone(),
        PropertyValue::Value(other) => other.to_string(),
        other => format!("{:?}", other),
    }
}
