//! Request Builders
//!
//! Pure functions turning primary state and sync settings into the payloads
//! written to replicas. Nothing here logs or talks to a node; conditions
//! worth reporting are returned as [`Diagnostic`]s for the caller to emit.

use crate::config::{ConfigSetting, ConfigSettings, GravitySettings};
use crate::error::{FilterError, Result};
use crate::filter;
use crate::model::{
    ConfigDocument, Object, PatchConfig, PatchConfigRequest, PostGravityRequest,
    PostTeleporterRequest, Section,
};

use super::merge::merge_dns_records;

/// Something a builder skipped or worked around
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The section filter could not be applied; the section is not written
    FilterFailed { section: Section, error: FilterError },
    /// The section filter left nothing; the section is not written
    FilteredEmpty { section: Section },
    /// The replica's DNS section has the wrong shape; no records are kept from it
    ReplicaDnsUnusable { reason: String },
}

/// Payload for one section.
///
/// `None` when the section is disabled or its filter fails or leaves it
/// empty. An enabled section without filter is returned unchanged.
pub fn filter_patch_config_request(
    setting: &ConfigSetting,
    section: Section,
    document: Option<Object>,
) -> (Option<Object>, Option<Diagnostic>) {
    if !setting.enabled {
        return (None, None);
    }

    let Some(document) = document else {
        return (None, None);
    };

    let Some(filter) = &setting.filter else {
        return (Some(document), None);
    };

    match filter::by_type(filter.filter_type, &filter.keys, &document) {
        Ok(filtered) if filtered.is_empty() => {
            (None, Some(Diagnostic::FilteredEmpty { section }))
        }
        Ok(filtered) => (Some(filtered), None),
        Err(error) => (None, Some(Diagnostic::FilterFailed { section, error })),
    }
}

/// Build the config patch for one replica.
///
/// With a non-empty exclude list the DNS record lists are merged with the
/// replica's (see [`merge_dns_records`]) before the DNS filter runs. A
/// primary section that is not an object is an error.
pub fn create_patch_config_request(
    settings: &ConfigSettings,
    primary: &ConfigDocument,
    replica: Option<&ConfigDocument>,
    exclude_dns_records: &[String],
) -> Result<(PatchConfigRequest, Vec<Diagnostic>)> {
    let mut patch = PatchConfig::default();
    let mut diagnostics = Vec::new();

    for section in Section::ALL {
        let setting = settings.get(section);
        if !setting.enabled {
            continue;
        }

        let mut document = primary.section(section)?.cloned();

        if section == Section::Dns && !exclude_dns_records.is_empty() {
            let replica_dns = match replica.map(|doc| doc.section(Section::Dns)).transpose() {
                Ok(dns) => dns.flatten(),
                Err(e) => {
                    diagnostics.push(Diagnostic::ReplicaDnsUnusable {
                        reason: e.to_string(),
                    });
                    None
                }
            };
            document = merge_dns_records(document.as_ref(), replica_dns, exclude_dns_records);
        }

        let (payload, diagnostic) = filter_patch_config_request(setting, section, document);
        diagnostics.extend(diagnostic);
        patch.set(section, payload);
    }

    Ok((PatchConfigRequest { config: patch }, diagnostics))
}

/// Teleporter import selection for the given gravity settings.
///
/// The `config` part of a snapshot is never imported; config is only
/// replicated through patches.
pub fn create_post_teleporter_request(gravity: &GravitySettings) -> PostTeleporterRequest {
    PostTeleporterRequest {
        config: false,
        dhcp_leases: gravity.dhcp_leases,
        gravity: PostGravityRequest {
            group: gravity.group,
            adlist: gravity.adlist,
            adlist_by_group: gravity.adlist_by_group,
            domainlist: gravity.domainlist,
            domainlist_by_group: gravity.domainlist_by_group,
            client: gravity.client,
            client_by_group: gravity.client_by_group,
        },
    }
}
