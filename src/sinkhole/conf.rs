use crate::shared::dns;
use crate::sinkhole::template::{RecordTemplate, ZoneTemplates};
use crate::sinkhole::trie::DomainTrie;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::{fs, net};

/// Configuration values obtained parsing the configuration file.
/// Unknown fields anywhere in the file are rejected at parse.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Conf {
    pub log_level: log::Level,
    pub udp_server: UdpServerConf,
    pub tcp_server: TcpServerConf,
    pub sinkhole: SinkholeConf,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UdpServerConf {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub write_timeout: u64,
    pub threads: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TcpServerConf {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub threads: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkholeConf {
    pub upstream: UpstreamConf,
    pub query_deadline: u64,
    pub auto_whitelist: bool,
    pub auto_blacklist: bool,
    pub whitelist_zones: Vec<String>,
    pub blacklist_zones: Vec<BlacklistZoneConf>,
    pub sinkhole_ns_zone: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConf {
    pub address: String,
    pub port: u16,
    pub timeout: u64,
    pub retries: usize,
}

/// A sinkholed zone: the zone name plus its record templates, keyed
/// by record type name.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlacklistZoneConf {
    pub zone: String,
    pub records: HashMap<String, String>,
}

// The bind address of the legacy bootstrap.
fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5252
}

impl Conf {
    /// Read and parse the configuration values from a file. The file must
    /// be JSON-encoded and follow the organization of the [Conf] struct.
    pub fn from_file(path: &str) -> Result<Self, String> {
        let file_bytes = match fs::read_to_string(path) {
            Err(err) => return Err(err.to_string()),
            Ok(v) => v,
        };
        let conf = match serde_json::from_str::<Conf>(&file_bytes) {
            Err(err) => return Err(err.to_string()),
            Ok(conf) => conf,
        };
        match conf.validate() {
            Ok(_) => Ok(conf),
            Err(err) => Err(err),
        }
    }

    /// Validate a configuration struct against some common errors.
    fn validate(&self) -> Result<(), String> {
        // Udp server confs.
        if let Err(err) = net::IpAddr::from_str(self.udp_server.address.as_ref()) {
            return Err(format!("invalid udp address: {}", err));
        }
        if self.udp_server.write_timeout == 0 {
            return Err("invalid udp write timeout: 0 seconds".to_string());
        }
        if self.udp_server.threads == 0 {
            return Err("invalid udp threads: 0".to_string());
        }

        // Tcp server confs.
        if let Err(err) = net::IpAddr::from_str(self.tcp_server.address.as_ref()) {
            return Err(format!("invalid tcp address: {}", err));
        }
        if self.tcp_server.read_timeout == 0 || self.tcp_server.write_timeout == 0 {
            return Err("invalid tcp read/write timeouts: cannot be 0 seconds".to_string());
        }
        if self.tcp_server.threads == 0 {
            return Err("invalid tcp threads: 0".to_string());
        }

        // Upstream and pipeline confs.
        if let Err(err) = net::IpAddr::from_str(self.sinkhole.upstream.address.as_ref()) {
            return Err(format!("invalid upstream address: {}", err));
        }
        if self.sinkhole.upstream.timeout == 0 {
            return Err("invalid upstream timeout: cannot be 0 seconds".to_string());
        }
        if self.sinkhole.upstream.retries == 0 {
            return Err("invalid upstream retries: cannot be 0".to_string());
        }
        if self.sinkhole.query_deadline == 0 {
            return Err("invalid query deadline: cannot be 0 seconds".to_string());
        }

        Ok(())
    }
}

/// Build the whitelist and blacklist tries from the configured lists.
/// Every zone is inserted in its exact and wildcard forms, blacklist
/// zones carry their parsed record templates. The sinkhole nameserver
/// invariant is enforced here: the nameservers named by NS templates
/// must themselves resolve to blacklisted zones with an A template,
/// otherwise the fabricated delegations would point clients nowhere.
pub fn build_tries(conf: &SinkholeConf) -> Result<(DomainTrie, DomainTrie), String> {
    let mut whitelist = DomainTrie::new();
    for zone in &conf.whitelist_zones {
        if let Err(err) = whitelist.add(zone) {
            return Err(format!("whitelist zone '{}': {:?}", zone, err));
        }
    }

    let mut blacklist = DomainTrie::new();
    let mut parsed_zones = vec![];
    for entry in &conf.blacklist_zones {
        let templates = parse_zone_templates(entry)?;
        if let Err(err) = blacklist.add_with(&entry.zone, Some(Arc::clone(&templates))) {
            return Err(format!("blacklist zone '{}': {:?}", entry.zone, err));
        }
        parsed_zones.push((entry.zone.clone(), templates));
    }

    validate_sinkhole_invariant(conf, &blacklist, &parsed_zones)?;
    Ok((whitelist, blacklist))
}

// Parse the record templates of a blacklist entry, checking that each
// template matches the record type it is filed under.
fn parse_zone_templates(entry: &BlacklistZoneConf) -> Result<ZoneTemplates, String> {
    let mut map = HashMap::new();
    for (type_str, line) in &entry.records {
        let declared = match dns::RecordType::from_str(type_str) {
            Err(s) => return Err(format!("zone '{}': unknown record type '{}'", entry.zone, s)),
            Ok(v) => v,
        };
        let template = match RecordTemplate::parse(line) {
            Err(err) => return Err(format!("zone '{}', {} template: {:?}", entry.zone, type_str, err)),
            Ok(v) => v,
        };
        if template.record_type() != declared {
            return Err(format!(
                "zone '{}': template under '{}' is of type {}",
                entry.zone,
                type_str,
                template.record_type().to_str()
            ));
        }
        map.insert(declared, template);
    }

    if !map.contains_key(&dns::RecordType::NS) {
        log::warn!(
            "Blacklist zone '{}' has no NS template, synthesis for it will fail.",
            entry.zone
        );
    }
    Ok(Arc::new(map))
}

fn validate_sinkhole_invariant(
    conf: &SinkholeConf,
    blacklist: &DomainTrie,
    parsed_zones: &[(String, ZoneTemplates)],
) -> Result<(), String> {
    let covered = blacklist
        .lookup_data(&conf.sinkhole_ns_zone)
        .map(|templates| templates.contains_key(&dns::RecordType::A))
        .unwrap_or(false);
    if !covered {
        return Err(format!(
            "sinkhole ns zone '{}' is not a blacklisted zone with an A template",
            conf.sinkhole_ns_zone
        ));
    }

    for (zone, templates) in parsed_zones {
        let ns_target = match templates.get(&dns::RecordType::NS).and_then(|t| t.ns_target()) {
            None => continue,
            Some(v) => v,
        };
        let target_covered = blacklist
            .find_ancestor(ns_target)
            .and_then(|key| blacklist.lookup_data(&key))
            .map(|templates| templates.contains_key(&dns::RecordType::A))
            .unwrap_or(false);
        if !target_covered {
            return Err(format!(
                "nameserver '{}' of blacklisted zone '{}' is not sinkholed with an A template",
                ns_target, zone
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sinkhole_conf(json: &str) -> SinkholeConf {
        serde_json::from_str(json).unwrap()
    }

    const VALID_SINKHOLE: &str = r#"{
        "upstream": {"address": "9.9.9.9", "port": 53, "timeout": 5, "retries": 2},
        "query_deadline": 10,
        "auto_whitelist": true,
        "auto_blacklist": true,
        "whitelist_zones": ["microsoft.com"],
        "blacklist_zones": [
            {"zone": "dyndns.org", "records": {
                "A": "* 86400 IN A 10.1.2.3",
                "NS": "* 86400 IN NS ns.sinkhole.example.com"
            }},
            {"zone": "ns.sinkhole.example.com", "records": {
                "A": "* 86400 IN A 10.1.2.3",
                "NS": "* 86400 IN NS ns.sinkhole.example.com"
            }}
        ],
        "sinkhole_ns_zone": "ns.sinkhole.example.com"
    }"#;

    #[test]
    fn tries_are_built_from_a_valid_conf() {
        let conf = sinkhole_conf(VALID_SINKHOLE);
        let (whitelist, blacklist) = build_tries(&conf).unwrap();
        assert!(whitelist.lookup("microsoft.com").is_some());
        assert!(whitelist.lookup("*.microsoft.com").is_some());
        let templates = blacklist.lookup_data("dyndns.org").unwrap();
        assert!(templates.contains_key(&dns::RecordType::A));
    }

    #[test]
    fn unknown_conf_fields_are_rejected() {
        let json = r#"{"zone": "x.org", "records": {}, "surprise": true}"#;
        assert!(serde_json::from_str::<BlacklistZoneConf>(json).is_err());
    }

    #[test]
    fn template_under_wrong_type_is_rejected() {
        let mut conf = sinkhole_conf(VALID_SINKHOLE);
        conf.blacklist_zones[0]
            .records
            .insert("MX".to_string(), "* 60 IN A 10.0.0.1".to_string());
        let err = build_tries(&conf).unwrap_err();
        assert!(err.contains("is of type A"), "unexpected error: {}", err);
    }

    #[test]
    fn uncovered_sinkhole_nameserver_is_rejected() {
        let mut conf = sinkhole_conf(VALID_SINKHOLE);
        conf.blacklist_zones.remove(1);
        let err = build_tries(&conf).unwrap_err();
        assert!(err.contains("sinkhole ns zone"), "unexpected error: {}", err);
    }

    #[test]
    fn foreign_ns_target_is_rejected() {
        let mut conf = sinkhole_conf(VALID_SINKHOLE);
        conf.blacklist_zones[0]
            .records
            .insert("NS".to_string(), "* 86400 IN NS ns.elsewhere.net".to_string());
        let err = build_tries(&conf).unwrap_err();
        assert!(err.contains("not sinkholed"), "unexpected error: {}", err);
    }
}
