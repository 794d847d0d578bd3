use crate::shared::dns;
use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

/// The record templates of a sinkholed zone, indexed by record type.
/// The map is shared behind an [Arc]: extending the blacklist to a new
/// zone clones the pointer, not the templates.
pub type ZoneTemplates = Arc<HashMap<dns::RecordType, RecordTemplate>>;

/// A resource record in text form whose owner name is the literal `*`,
/// parsed once at configuration load. Synthesized responses are built
/// substituting the wildcard owner with a concrete name via
/// [RecordTemplate::materialize].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTemplate {
    text: String,
    ttl: u32,
    class: dns::Class,
    record_type: dns::RecordType,
    data: TemplateData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplateData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Name(dns::Name),
    Mx { priority: u16, name: dns::Name },
    Txt(Vec<String>),
    Soa {
        ns_name: dns::Name,
        mail_name: dns::Name,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
}

/// Errors returned parsing a [`RecordTemplate`] from its text form.
#[derive(Debug, Clone)]
pub enum TemplateErr {
    EmptyTemplate,
    OwnerNotWildcard(String),
    BadTtl(String),
    UnknownClass(String),
    UnsupportedClass(String),
    UnknownType(String),
    BadData(String),
}

impl RecordTemplate {
    /// Parse a [`RecordTemplate`] from a zone-file-like line, e.g.
    /// `* 86400 IN A 10.1.2.3`. The owner field must be the wildcard.
    pub fn parse(line: &str) -> Result<RecordTemplate, TemplateErr> {
        let mut tokens = line.split_whitespace();
        let owner = tokens.next().ok_or(TemplateErr::EmptyTemplate)?;
        if owner != "*" {
            return Err(TemplateErr::OwnerNotWildcard(owner.to_string()));
        }

        let ttl_token = tokens.next().ok_or_else(|| TemplateErr::BadTtl("missing".to_string()))?;
        let ttl: u32 = ttl_token
            .parse()
            .map_err(|_| TemplateErr::BadTtl(ttl_token.to_string()))?;

        let class_token = tokens
            .next()
            .ok_or_else(|| TemplateErr::UnknownClass("missing".to_string()))?;
        let class = match dns::Class::from_str(class_token) {
            Err(s) => return Err(TemplateErr::UnknownClass(s.to_string())),
            Ok(c) if !c.is_supported() => return Err(TemplateErr::UnsupportedClass(class_token.to_string())),
            Ok(c) => c,
        };

        let type_token = tokens
            .next()
            .ok_or_else(|| TemplateErr::UnknownType("missing".to_string()))?;
        let record_type =
            dns::RecordType::from_str(type_token).map_err(|s| TemplateErr::UnknownType(s.to_string()))?;

        let data_tokens: Vec<&str> = tokens.collect();
        let data = parse_data(record_type, &data_tokens)?;

        Ok(RecordTemplate {
            text: line.trim().to_string(),
            ttl,
            class,
            record_type,
            data,
        })
    }

    /// Returns the [dns::RecordType] the template synthesizes.
    pub fn record_type(&self) -> dns::RecordType {
        self.record_type
    }

    /// Returns the original text form of the template.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The nameserver a NS template points to, if the template is one.
    pub fn ns_target(&self) -> Option<&dns::Name> {
        match (&self.record_type, &self.data) {
            (dns::RecordType::NS, TemplateData::Name(name)) => Some(name),
            _ => None,
        }
    }

    /// Build a concrete [dns::Record] from the template, substituting
    /// the wildcard owner with the passed name.
    pub fn materialize(&self, owner: &dns::Name) -> dns::Record {
        let node = owner.clone();
        let class = self.class;
        let ttl = self.ttl;
        match &self.data {
            TemplateData::A(address) => dns::Record::A {
                node,
                class,
                ttl,
                address: *address,
            },
            TemplateData::Aaaa(address) => dns::Record::AAAA {
                node,
                class,
                ttl,
                address: *address,
            },
            TemplateData::Name(name) => match self.record_type {
                dns::RecordType::NS => dns::Record::NS {
                    node,
                    class,
                    ttl,
                    name: name.clone(),
                },
                dns::RecordType::CNAME => dns::Record::CNAME {
                    node,
                    class,
                    ttl,
                    name: name.clone(),
                },
                dns::RecordType::PTR => dns::Record::PTR {
                    node,
                    class,
                    ttl,
                    name: name.clone(),
                },
                _ => unreachable!("name data on non-name type"),
            },
            TemplateData::Mx { priority, name } => dns::Record::MX {
                node,
                class,
                ttl,
                priority: *priority,
                name: name.clone(),
            },
            TemplateData::Txt(txts) => dns::Record::TXT {
                node,
                class,
                ttl,
                txts: txts.clone(),
            },
            TemplateData::Soa {
                ns_name,
                mail_name,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => dns::Record::SOA {
                node,
                class,
                ttl,
                ns_name: ns_name.clone(),
                mail_name: mail_name.clone(),
                serial: *serial,
                refresh: *refresh,
                retry: *retry,
                expire: *expire,
                minimum: *minimum,
            },
        }
    }
}

// Parse the data section of the template, which has a different
// shape for every record type.
fn parse_data(record_type: dns::RecordType, tokens: &[&str]) -> Result<TemplateData, TemplateErr> {
    let bad = |msg: &str| TemplateErr::BadData(format!("{}: {:?}", msg, tokens));
    match record_type {
        dns::RecordType::A => match tokens {
            [addr] => addr.parse::<Ipv4Addr>().map(TemplateData::A).map_err(|_| bad("invalid IPv4")),
            _ => Err(bad("A expects one address")),
        },
        dns::RecordType::AAAA => match tokens {
            [addr] => addr.parse::<Ipv6Addr>().map(TemplateData::Aaaa).map_err(|_| bad("invalid IPv6")),
            _ => Err(bad("AAAA expects one address")),
        },
        dns::RecordType::NS | dns::RecordType::CNAME | dns::RecordType::PTR => match tokens {
            [name] => parse_name(name).map(TemplateData::Name),
            _ => Err(bad("expects one name")),
        },
        dns::RecordType::MX => match tokens {
            [priority, name] => {
                let priority = priority.parse::<u16>().map_err(|_| bad("invalid priority"))?;
                let name = parse_name(name)?;
                Ok(TemplateData::Mx { priority, name })
            }
            _ => Err(bad("MX expects priority and name")),
        },
        dns::RecordType::TXT => {
            if tokens.is_empty() {
                return Err(bad("TXT expects at least one string"));
            }
            let txts = tokens.iter().map(|t| t.trim_matches('"').to_string()).collect();
            Ok(TemplateData::Txt(txts))
        }
        dns::RecordType::SOA => match tokens {
            [ns_name, mail_name, serial, refresh, retry, expire, minimum] => Ok(TemplateData::Soa {
                ns_name: parse_name(ns_name)?,
                mail_name: parse_name(mail_name)?,
                serial: serial.parse().map_err(|_| bad("invalid serial"))?,
                refresh: refresh.parse().map_err(|_| bad("invalid refresh"))?,
                retry: retry.parse().map_err(|_| bad("invalid retry"))?,
                expire: expire.parse().map_err(|_| bad("invalid expire"))?,
                minimum: minimum.parse().map_err(|_| bad("invalid minimum"))?,
            }),
            _ => Err(bad("SOA expects seven fields")),
        },
    }
}

fn parse_name(token: &str) -> Result<dns::Name, TemplateErr> {
    dns::Name::from_string(token).map_err(|err| TemplateErr::BadData(format!("invalid name '{}': {:?}", token, err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> dns::Name {
        dns::Name::from_string(s).unwrap()
    }

    #[test]
    fn parse_and_materialize_a() {
        let template = RecordTemplate::parse("* 86400 IN A 10.1.2.3").unwrap();
        assert_eq!(template.record_type(), dns::RecordType::A);
        let record = template.materialize(&name("mtfnpy.dyndns.org"));
        assert_eq!(
            record,
            dns::Record::A {
                node: name("mtfnpy.dyndns.org"),
                class: dns::Class::IN,
                ttl: 86400,
                address: "10.1.2.3".parse().unwrap(),
            }
        );
    }

    #[test]
    fn parse_and_materialize_ns() {
        let template = RecordTemplate::parse("* 86400 IN NS ns.sinkhole.example.com").unwrap();
        assert_eq!(template.ns_target(), Some(&name("ns.sinkhole.example.com")));
        let record = template.materialize(&name("dyndns.org"));
        assert_eq!(record.ns_data(), &name("ns.sinkhole.example.com"));
        assert_eq!(record.node(), &name("dyndns.org"));
    }

    #[test]
    fn parse_soa() {
        let line = "* 3600 IN SOA ns.sinkhole.example.com hostmaster.example.com 1 10800 3600 604800 3600";
        let template = RecordTemplate::parse(line).unwrap();
        let record = template.materialize(&name("dyndns.org"));
        assert_eq!(record.record_type(), dns::RecordType::SOA);
        assert_eq!(record.soa_mname(), &name("ns.sinkhole.example.com"));
    }

    #[test]
    fn parse_txt_strips_quotes() {
        let template = RecordTemplate::parse("* 60 IN TXT \"sinkholed\"").unwrap();
        let record = template.materialize(&name("x.example.com"));
        match record {
            dns::Record::TXT { txts, .. } => assert_eq!(txts, vec!["sinkholed"]),
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[test]
    fn parse_rejects_non_wildcard_owner() {
        let err = RecordTemplate::parse("host.example.com 60 IN A 10.0.0.1");
        assert!(matches!(err, Err(TemplateErr::OwnerNotWildcard(_))));
    }

    #[test]
    fn parse_rejects_malformed_fields() {
        assert!(matches!(RecordTemplate::parse(""), Err(TemplateErr::EmptyTemplate)));
        assert!(matches!(
            RecordTemplate::parse("* abc IN A 10.0.0.1"),
            Err(TemplateErr::BadTtl(_))
        ));
        assert!(matches!(
            RecordTemplate::parse("* 60 CH A 10.0.0.1"),
            Err(TemplateErr::UnsupportedClass(_))
        ));
        assert!(matches!(
            RecordTemplate::parse("* 60 IN WKS 10.0.0.1"),
            Err(TemplateErr::UnknownType(_))
        ));
        assert!(matches!(
            RecordTemplate::parse("* 60 IN A not-an-address"),
            Err(TemplateErr::BadData(_))
        ));
    }

    #[test]
    fn text_form_is_preserved() {
        let template = RecordTemplate::parse("  * 86400 IN A 10.1.2.3  ").unwrap();
        assert_eq!(template.text(), "* 86400 IN A 10.1.2.3");
    }
}
