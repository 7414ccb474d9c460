//! Closed registry of entity kinds
//!
//! Every kind declares its canonical name, an ordered schema and the
//! properties used for merge-conflict detection. Name lookup is
//! case-insensitive and accepts a few aliases seen in alert payloads.

use crate::entities::schema::{
    Descriptor, EnumRef, ALGORITHM, ELEVATION_TOKEN,
};
use crate::error::{EntityError, Result};
use ahash::{HashMap, HashMapExt};
use std::fmt;
use std::sync::OnceLock;

/// Concrete entity variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Account,
    Alert,
    Dns,
    File,
    FileHash,
    GeoLocation,
    Host,
    HostLogonSession,
    IpAddress,
    Malware,
    NetworkConnection,
    Process,
    RegistryKey,
    RegistryValue,
    SecurityGroup,
    ThreatIntelligence,
    Url,
}

type Schema = &'static [(&'static str, Descriptor)];

static ACCOUNT_SCHEMA: [(&str, Descriptor); 12] = [
    ("Name", Descriptor::Primitive),
    ("NTDomain", Descriptor::Primitive),
    ("UPNSuffix", Descriptor::Primitive),
    ("Host", Descriptor::Entity(EntityKind::Host)),
    ("LogonId", Descriptor::Primitive),
    ("Sid", Descriptor::Primitive),
    ("AadTenantId", Descriptor::Primitive),
    ("AadUserId", Descriptor::Primitive),
    ("PUID", Descriptor::Primitive),
    ("IsDomainJoined", Descriptor::Primitive),
    ("DisplayName", Descriptor::Primitive),
    ("ObjectGuid", Descriptor::Primitive),
];

static ALERT_SCHEMA: [(&str, Descriptor); 11] = [
    ("DisplayName", Descriptor::Primitive),
    ("CompromisedEntity", Descriptor::Primitive),
    ("Count", Descriptor::Primitive),
    ("StartTimeUtc", Descriptor::Primitive),
    ("EndTimeUtc", Descriptor::Primitive),
    ("Severity", Descriptor::Primitive),
    ("SystemAlertIds", Descriptor::Primitive),
    ("AlertType", Descriptor::Primitive),
    ("VendorName", Descriptor::Primitive),
    ("ProviderName", Descriptor::Primitive),
    ("Entities", Descriptor::Collection(None)),
];

static DNS_SCHEMA: [(&str, Descriptor); 4] = [
    ("DomainName", Descriptor::Primitive),
    (
        "IpAddresses",
        Descriptor::Collection(Some(EntityKind::IpAddress)),
    ),
    ("DnsServerIp", Descriptor::Entity(EntityKind::IpAddress)),
    ("HostIpAddress", Descriptor::Entity(EntityKind::IpAddress)),
];

static FILE_SCHEMA: [(&str, Descriptor); 9] = [
    ("FullPath", Descriptor::Primitive),
    ("Directory", Descriptor::Primitive),
    ("Name", Descriptor::Primitive),
    ("Md5", Descriptor::Primitive),
    ("Host", Descriptor::Entity(EntityKind::Host)),
    ("Sha1", Descriptor::Primitive),
    ("Sha256", Descriptor::Primitive),
    ("Sha256Ac", Descriptor::Primitive),
    (
        "FileHashes",
        Descriptor::Collection(Some(EntityKind::FileHash)),
    ),
];

static FILE_HASH_SCHEMA: [(&str, Descriptor); 2] = [
    ("Algorithm", Descriptor::Enum(EnumRef::Direct(&ALGORITHM))),
    ("Value", Descriptor::Primitive),
];

static GEO_LOCATION_SCHEMA: [(&str, Descriptor); 7] = [
    ("CountryCode", Descriptor::Primitive),
    ("CountryName", Descriptor::Primitive),
    ("State", Descriptor::Primitive),
    ("City", Descriptor::Primitive),
    ("Longitude", Descriptor::Primitive),
    ("Latitude", Descriptor::Primitive),
    ("Asn", Descriptor::Primitive),
];

static HOST_SCHEMA: [(&str, Descriptor); 9] = [
    ("DnsDomain", Descriptor::Primitive),
    ("NTDomain", Descriptor::Primitive),
    ("HostName", Descriptor::Primitive),
    ("NetBiosName", Descriptor::Primitive),
    ("AzureID", Descriptor::Primitive),
    ("OMSAgentID", Descriptor::Primitive),
    ("OSFamily", Descriptor::Enum(EnumRef::Keyed("OSFamily"))),
    ("OSVersion", Descriptor::Primitive),
    ("IsDomainJoined", Descriptor::Primitive),
];

static HOST_LOGON_SESSION_SCHEMA: [(&str, Descriptor); 5] = [
    ("Account", Descriptor::Entity(EntityKind::Account)),
    ("StartTimeUtc", Descriptor::Primitive),
    ("EndTimeUtc", Descriptor::Primitive),
    ("Host", Descriptor::Entity(EntityKind::Host)),
    ("SessionId", Descriptor::Primitive),
];

static IP_ADDRESS_SCHEMA: [(&str, Descriptor); 3] = [
    ("Address", Descriptor::Primitive),
    ("Location", Descriptor::Entity(EntityKind::GeoLocation)),
    (
        "ThreatIntelligence",
        Descriptor::Collection(Some(EntityKind::ThreatIntelligence)),
    ),
];

static MALWARE_SCHEMA: [(&str, Descriptor); 5] = [
    ("Name", Descriptor::Primitive),
    ("Category", Descriptor::Primitive),
    ("File", Descriptor::Entity(EntityKind::File)),
    ("Files", Descriptor::Collection(Some(EntityKind::File))),
    ("Processes", Descriptor::Collection(Some(EntityKind::Process))),
];

static NETWORK_CONNECTION_SCHEMA: [(&str, Descriptor); 5] = [
    ("SourceAddress", Descriptor::Entity(EntityKind::IpAddress)),
    ("SourcePort", Descriptor::Primitive),
    ("DestinationAddress", Descriptor::Entity(EntityKind::IpAddress)),
    ("DestinationPort", Descriptor::Primitive),
    ("Protocol", Descriptor::Primitive),
];

static PROCESS_SCHEMA: [(&str, Descriptor); 9] = [
    ("ProcessId", Descriptor::Primitive),
    ("CommandLine", Descriptor::Primitive),
    (
        "ElevationToken",
        Descriptor::Enum(EnumRef::Direct(&ELEVATION_TOKEN)),
    ),
    ("CreationTimeUtc", Descriptor::Primitive),
    ("ImageFile", Descriptor::Entity(EntityKind::File)),
    ("Account", Descriptor::Entity(EntityKind::Account)),
    ("ParentProcess", Descriptor::Entity(EntityKind::Process)),
    ("Host", Descriptor::Entity(EntityKind::Host)),
    (
        "LogonSession",
        Descriptor::Entity(EntityKind::HostLogonSession),
    ),
];

static REGISTRY_KEY_SCHEMA: [(&str, Descriptor); 2] = [
    ("Hive", Descriptor::Enum(EnumRef::Keyed("RegistryHive"))),
    ("Key", Descriptor::Primitive),
];

static REGISTRY_VALUE_SCHEMA: [(&str, Descriptor); 4] = [
    ("Key", Descriptor::Entity(EntityKind::RegistryKey)),
    ("Name", Descriptor::Primitive),
    ("Value", Descriptor::Primitive),
    (
        "ValueType",
        Descriptor::Enum(EnumRef::Keyed("RegistryValueType")),
    ),
];

static SECURITY_GROUP_SCHEMA: [(&str, Descriptor); 3] = [
    ("DistinguishedName", Descriptor::Primitive),
    ("SID", Descriptor::Primitive),
    ("ObjectGuid", Descriptor::Primitive),
];

static THREAT_INTELLIGENCE_SCHEMA: [(&str, Descriptor); 6] = [
    ("ProviderName", Descriptor::Primitive),
    ("ThreatType", Descriptor::Primitive),
    ("ThreatName", Descriptor::Primitive),
    ("Confidence", Descriptor::Primitive),
    ("ReportLink", Descriptor::Primitive),
    ("ThreatDescription", Descriptor::Primitive),
];

static URL_SCHEMA: [(&str, Descriptor); 2] = [
    ("Url", Descriptor::Primitive),
    ("Host", Descriptor::Entity(EntityKind::Host)),
];

/// Alternate spellings accepted by [`EntityKind::from_name`]
const ALIASES: [(&str, EntityKind); 5] = [
    ("ip", EntityKind::IpAddress),
    ("location", EntityKind::GeoLocation),
    ("dnsresolve", EntityKind::Dns),
    ("hostlogonsession", EntityKind::HostLogonSession),
    ("networkconnection", EntityKind::NetworkConnection),
];

fn name_map() -> &'static HashMap<&'static str, EntityKind> {
    static NAME_MAP: OnceLock<HashMap<&'static str, EntityKind>> = OnceLock::new();
    NAME_MAP.get_or_init(|| {
        let mut map = HashMap::new();
        for kind in EntityKind::all() {
            map.insert(kind.name(), *kind);
        }
        for (alias, kind) in ALIASES {
            map.insert(alias, kind);
        }
        tracing::debug!("Entity registry initialized with {} names", map.len());
        map
    })
}

impl EntityKind {
    /// All registered kinds
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::Account,
            EntityKind::Alert,
            EntityKind::Dns,
            EntityKind::File,
            EntityKind::FileHash,
            EntityKind::GeoLocation,
            EntityKind::Host,
            EntityKind::HostLogonSession,
            EntityKind::IpAddress,
            EntityKind::Malware,
            EntityKind::NetworkConnection,
            EntityKind::Process,
            EntityKind::RegistryKey,
            EntityKind::RegistryValue,
            EntityKind::SecurityGroup,
            EntityKind::ThreatIntelligence,
            EntityKind::Url,
        ]
    }

    /// Canonical kind name, also the value of the `Type` property
    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Account => "account",
            EntityKind::Alert => "alert",
            EntityKind::Dns => "dns",
            EntityKind::File => "file",
            EntityKind::FileHash => "filehash",
            EntityKind::GeoLocation => "geolocation",
            EntityKind::Host => "host",
            EntityKind::HostLogonSession => "host-logon-session",
            EntityKind::IpAddress => "ipaddress",
            EntityKind::Malware => "malware",
            EntityKind::NetworkConnection => "network-connection",
            EntityKind::Process => "process",
            EntityKind::RegistryKey => "registry-key",
            EntityKind::RegistryValue => "registry-value",
            EntityKind::SecurityGroup => "security-group",
            EntityKind::ThreatIntelligence => "threatintelligence",
            EntityKind::Url => "url",
        }
    }

    /// Resolve a kind name (case-insensitive, aliases accepted)
    pub fn from_name(name: &str) -> Result<Self> {
        name_map()
            .get(name.trim().to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| EntityError::UnknownEntityType {
                name: name.to_string(),
            })
    }

    /// Ordered attribute table
    pub fn schema(self) -> Schema {
        match self {
            EntityKind::Account => &ACCOUNT_SCHEMA,
            EntityKind::Alert => &ALERT_SCHEMA,
            EntityKind::Dns => &DNS_SCHEMA,
            EntityKind::File => &FILE_SCHEMA,
            EntityKind::FileHash => &FILE_HASH_SCHEMA,
            EntityKind::GeoLocation => &GEO_LOCATION_SCHEMA,
            EntityKind::Host => &HOST_SCHEMA,
            EntityKind::HostLogonSession => &HOST_LOGON_SESSION_SCHEMA,
            EntityKind::IpAddress => &IP_ADDRESS_SCHEMA,
            EntityKind::Malware => &MALWARE_SCHEMA,
            EntityKind::NetworkConnection => &NETWORK_CONNECTION_SCHEMA,
            EntityKind::Process => &PROCESS_SCHEMA,
            EntityKind::RegistryKey => &REGISTRY_KEY_SCHEMA,
            EntityKind::RegistryValue => &REGISTRY_VALUE_SCHEMA,
            EntityKind::SecurityGroup => &SECURITY_GROUP_SCHEMA,
            EntityKind::ThreatIntelligence => &THREAT_INTELLIGENCE_SCHEMA,
            EntityKind::Url => &URL_SCHEMA,
        }
    }

    /// Properties that identify an entity for merge-conflict detection
    pub fn id_properties(self) -> &'static [&'static str] {
        match self {
            EntityKind::Account => &[
                "Name",
                "UPNSuffix",
                "NTDomain",
                "Host",
                "Sid",
                "AadUserId",
                "PUID",
                "ObjectGuid",
            ],
            EntityKind::Alert => &["SystemAlertIds", "AlertType"],
            EntityKind::Dns => &["DomainName", "IpAddresses"],
            EntityKind::File => &["FullPath", "Sha1", "Sha256", "Sha256Ac", "Md5"],
            EntityKind::FileHash => &["Value"],
            EntityKind::GeoLocation => &["CountryCode", "State", "City", "Longitude", "Latitude"],
            EntityKind::Host => &[
                "DnsDomain",
                "NTDomain",
                "HostName",
                "NetBiosName",
                "AzureID",
                "OMSAgentID",
            ],
            EntityKind::HostLogonSession => &["Account", "Host", "SessionId", "StartTimeUtc"],
            EntityKind::IpAddress => &["Address"],
            EntityKind::Malware => &["Name", "Category"],
            EntityKind::NetworkConnection => &[
                "SourceAddress",
                "SourcePort",
                "DestinationAddress",
                "DestinationPort",
                "Protocol",
            ],
            EntityKind::Process => &[
                "ProcessId",
                "CommandLine",
                "CreationTimeUtc",
                "ImageFile",
                "Host",
            ],
            EntityKind::RegistryKey => &["Hive", "Key"],
            EntityKind::RegistryValue => &["Key", "Name"],
            EntityKind::SecurityGroup => &["DistinguishedName", "SID", "ObjectGuid"],
            EntityKind::ThreatIntelligence => &["ProviderName", "ThreatName"],
            EntityKind::Url => &["Url"],
        }
    }

    /// Descriptor for a declared attribute
    pub fn descriptor(self, attribute: &str) -> Option<Descriptor> {
        self.schema()
            .iter()
            .find(|(name, _)| *name == attribute)
            .map(|(_, descriptor)| *descriptor)
    }

    pub fn declares(self, attribute: &str) -> bool {
        self.descriptor(attribute).is_some()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
