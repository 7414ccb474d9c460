//! Process entities built from flat process-creation event records

use crate::entities::{EntityId, EntityKind, EntityStore, PropertyValue};
use crate::error::Result;
use serde_json::Value;

/// Which process of the event to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessRole {
    /// The created process
    New,
    /// The process that spawned it
    Parent,
}

/// Audit fields copied as extra properties on the created process
const AUDIT_FIELDS: [&str; 10] = [
    "success",
    "audit_user",
    "auid",
    "group",
    "gid",
    "effective_user",
    "euid",
    "effective_group",
    "egid",
    "cwd",
];

const SUBJECT_FIELDS: [(&str, &str); 4] = [
    ("SubjectUserName", "Name"),
    ("SubjectDomainName", "NTDomain"),
    ("SubjectUserSid", "Sid"),
    ("SubjectLogonId", "LogonId"),
];

impl EntityStore {
    /// Build a process entity from an event record
    pub fn process_from_event(&mut self, event: &Value, role: ProcessRole) -> Result<EntityId> {
        let process = self.create_empty(EntityKind::Process);

        match role {
            ProcessRole::New => {
                self.copy_field(process, event, "NewProcessId", "ProcessId")?;
                self.copy_field(process, event, "CommandLine", "CommandLine")?;
                if !self.copy_field(process, event, "TimeCreatedUtc", "CreationTimeUtc")? {
                    self.copy_field(process, event, "TimeGenerated", "CreationTimeUtc")?;
                }

                if let Some(path) = field_str(event, "NewProcessName") {
                    let file = self.file_from_path(path)?;
                    self.set_property(process, "ImageFile", file)?;
                }

                if let Some(account) = self.subject_account(event)? {
                    self.set_property(process, "Account", account)?;
                }

                if event.get("ParentProcessName").is_some() || event.get("ProcessName").is_some() {
                    let parent = self.process_from_event(event, ProcessRole::Parent)?;
                    self.set_property(process, "ParentProcess", parent)?;
                }

                for field in AUDIT_FIELDS {
                    self.copy_field(process, event, field, field)?;
                }
            }
            ProcessRole::Parent => {
                self.copy_field(process, event, "ProcessId", "ProcessId")?;
                let path = field_str(event, "ParentProcessName")
                    .or_else(|| field_str(event, "ProcessName"));
                if let Some(path) = path {
                    let file = self.file_from_path(path)?;
                    self.set_property(process, "ImageFile", file)?;
                }
            }
        }

        if let Some(computer) = field_str(event, "Computer") {
            let host = self.host_from_fqdn(computer)?;
            self.set_property(process, "Host", host)?;
        }

        tracing::debug!("Built {:?} process {} from event", role, process);
        Ok(process)
    }

    /// File entity with `Name` and `Directory` split from a full path
    pub fn file_from_path(&mut self, path: &str) -> Result<EntityId> {
        let file = self.create_empty(EntityKind::File);
        self.set_property(file, "FullPath", path)?;

        match path.rfind(['\\', '/']) {
            Some(split) => {
                self.set_property(file, "Directory", &path[..split])?;
                self.set_property(file, "Name", &path[split + 1..])?;
            }
            None => self.set_property(file, "Name", path)?,
        }
        Ok(file)
    }

    /// Host entity from a possibly fully qualified name
    pub fn host_from_fqdn(&mut self, fqdn: &str) -> Result<EntityId> {
        let host = self.create_empty(EntityKind::Host);
        match fqdn.split_once('.') {
            Some((name, domain)) => {
                self.set_property(host, "HostName", name)?;
                self.set_property(host, "DnsDomain", domain)?;
            }
            None => self.set_property(host, "HostName", fqdn)?,
        }
        Ok(host)
    }

    fn subject_account(&mut self, event: &Value) -> Result<Option<EntityId>> {
        if !SUBJECT_FIELDS.iter().any(|(field, _)| event.get(*field).is_some()) {
            return Ok(None);
        }
        let account = self.create_empty(EntityKind::Account);
        for (field, property) in SUBJECT_FIELDS {
            self.copy_field(account, event, field, property)?;
        }
        Ok(Some(account))
    }

    /// Copy `field` of the event into `property`, reporting whether it was present
    fn copy_field(
        &mut self,
        id: EntityId,
        event: &Value,
        field: &str,
        property: &str,
    ) -> Result<bool> {
        match event.get(field) {
            Some(value) => {
                self.set_property(id, property, PropertyValue::from(value.clone()))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn field_str<'a>(event: &'a Value, field: &str) -> Option<&'a str> {
    event.get(field).and_then(Value::as_str).filter(|s| !s.is_empty())
}
