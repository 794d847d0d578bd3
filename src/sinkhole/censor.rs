use crate::shared::dns;
use crate::sinkhole::trie::DomainTrie;
use std::sync::{Arc, RwLock};

/// The learning switches of the [`Censor`]. With a switch off the
/// corresponding list is never extended, only read.
#[derive(Debug, Clone, Copy)]
pub struct CensorParams {
    pub auto_whitelist: bool,
    pub auto_blacklist: bool,
}

/// Inspects the authority section of a response about to leave the
/// server, with two jobs. Learn: when the recursion reveals that a zone
/// is served by a nameserver already claimed by a policy list (or the
/// other way around), the list is extended to the newly seen name and
/// the question must be re-evaluated. Scrub: when neither list claims
/// the delegation, the authority and additional sections are emptied in
/// place, because the records would teach clients the identity of real
/// upstream nameservers and let them route around us.
///
/// The censor holds the same tries the policy handlers read: it is the
/// only component mutating them after startup, and only through the
/// idempotent [DomainTrie::clone_record].
pub struct Censor {
    whitelist: Arc<RwLock<DomainTrie>>,
    blacklist: Arc<RwLock<DomainTrie>>,
    params: CensorParams,
}

impl Censor {
    pub fn new(
        whitelist: Arc<RwLock<DomainTrie>>,
        blacklist: Arc<RwLock<DomainTrie>>,
        params: CensorParams,
    ) -> Self {
        Censor {
            whitelist,
            blacklist,
            params,
        }
    }

    /// Apply the cross-check matrix to every NS/SOA record of the
    /// authority section. Returns whether a list was extended, in which
    /// case the caller must re-run the question through the chain. A
    /// scrub empties both sections and stops the inspection. Internal
    /// inconsistencies are logged and treated as "no action": censoring
    /// never fails the request.
    pub fn inspect(&self, authorities: &mut Vec<dns::Record>, additionals: &mut Vec<dns::Record>) -> bool {
        let mut reprocess = false;
        let mut scrub = false;

        for record in authorities.iter() {
            let (zone, ns) = match record.record_type() {
                dns::RecordType::NS => (record.node(), record.ns_data()),
                dns::RecordType::SOA => (record.node(), record.soa_mname()),
                _ => continue,
            };

            let (wl_zn_anc, wl_ns_anc) = {
                let whitelist = self.whitelist.read().unwrap();
                (whitelist.find_ancestor(zone), whitelist.find_ancestor(ns))
            };
            let (bl_zn_anc, bl_ns_anc) = {
                let blacklist = self.blacklist.read().unwrap();
                (blacklist.find_ancestor(zone), blacklist.find_ancestor(ns))
            };

            if wl_zn_anc.is_some() && wl_ns_anc.is_none() {
                // The whitelist handler already stripped the glue, there
                // is nothing to learn from an unknown nameserver.
                log::warn!("Whitelisted zone '{}' served by non-whitelisted nameserver '{}'.", zone, ns);
            } else if wl_zn_anc.is_none() && wl_ns_anc.is_some() && self.params.auto_whitelist {
                let src = wl_ns_anc.unwrap();
                reprocess |= self.extend(&self.whitelist, "whitelist", &src, zone.as_ref());
            } else if bl_ns_anc.is_some() && bl_zn_anc.is_none() && self.params.auto_blacklist {
                let src = bl_ns_anc.unwrap();
                reprocess |= self.extend(&self.blacklist, "blacklist", &src, zone.as_ref());
            } else if bl_ns_anc.is_none() && bl_zn_anc.is_some() && self.params.auto_blacklist {
                let src = bl_zn_anc.unwrap();
                reprocess |= self.extend(&self.blacklist, "blacklist", &src, ns.as_ref());
            } else if wl_zn_anc.is_none() && wl_ns_anc.is_none() && bl_zn_anc.is_none() && bl_ns_anc.is_none() {
                log::debug!("Unclaimed delegation of '{}' to '{}', scrubbing glue.", zone, ns);
                scrub = true;
                break;
            }
        }

        if scrub {
            authorities.clear();
            additionals.clear();
        }
        reprocess
    }

    // Clone the payload of `src` onto `dst` in the given list. Reports
    // whether the list was extended.
    fn extend(&self, trie: &Arc<RwLock<DomainTrie>>, list: &str, src: &str, dst: &str) -> bool {
        match trie.write().unwrap().clone_record(src, dst) {
            Ok(_) => {
                log::info!("Extended {}: '{}' learned from '{}'.", list, dst, src);
                true
            }
            Err(err) => {
                log::warn!("Cannot extend {} with '{}': {:?}", list, dst, err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinkhole::testing::*;

    fn tries() -> (Arc<RwLock<DomainTrie>>, Arc<RwLock<DomainTrie>>) {
        let mut whitelist = DomainTrie::new();
        whitelist.add("microsoft.com").unwrap();
        let mut blacklist = DomainTrie::new();
        blacklist
            .add_with(
                "ns.sinkhole.example.com",
                Some(zone_templates(&[
                    "* 86400 IN A 10.1.2.3",
                    "* 86400 IN NS ns.sinkhole.example.com",
                ])),
            )
            .unwrap();
        (Arc::new(RwLock::new(whitelist)), Arc::new(RwLock::new(blacklist)))
    }

    fn censor_with(params: CensorParams) -> (Censor, Arc<RwLock<DomainTrie>>, Arc<RwLock<DomainTrie>>) {
        let (whitelist, blacklist) = tries();
        let censor = Censor::new(Arc::clone(&whitelist), Arc::clone(&blacklist), params);
        (censor, whitelist, blacklist)
    }

    const LEARN_ALL: CensorParams = CensorParams {
        auto_whitelist: true,
        auto_blacklist: true,
    };
    const LEARN_NONE: CensorParams = CensorParams {
        auto_whitelist: false,
        auto_blacklist: false,
    };

    #[test]
    fn whitelisted_zone_with_foreign_ns_is_left_alone() {
        let (censor, whitelist, _) = censor_with(LEARN_ALL);
        let mut authorities = vec![ns_record("microsoft.com", "ns1.unrelated.net")];
        let mut additionals = vec![a_record("ns1.unrelated.net", "6.6.6.6")];

        let reprocess = censor.inspect(&mut authorities, &mut additionals);
        assert!(!reprocess);
        assert_eq!(authorities.len(), 1);
        assert_eq!(additionals.len(), 1);
        assert_eq!(whitelist.read().unwrap().lookup("ns1.unrelated.net"), None);
    }

    #[test]
    fn whitelisted_ns_serving_new_zone_extends_the_whitelist() {
        let (censor, whitelist, _) = censor_with(LEARN_ALL);
        whitelist.write().unwrap().add("ns2.msft.net").unwrap();
        let mut authorities = vec![ns_record("fresh.example.net", "ns2.msft.net")];
        let mut additionals = vec![];

        let reprocess = censor.inspect(&mut authorities, &mut additionals);
        assert!(reprocess);
        assert_eq!(
            whitelist.read().unwrap().lookup("fresh.example.net"),
            Some("fresh.example.net.".to_string())
        );
    }

    #[test]
    fn blacklisted_ns_serving_new_zone_extends_the_blacklist() {
        let (censor, _, blacklist) = censor_with(LEARN_ALL);
        let mut authorities = vec![ns_record("new.zone", "ns.sinkhole.example.com")];
        let mut additionals = vec![];

        let reprocess = censor.inspect(&mut authorities, &mut additionals);
        assert!(reprocess);

        // The new zone shares the payload of the nameserver's zone.
        let blacklist = blacklist.read().unwrap();
        let learned = blacklist.lookup_data("new.zone").unwrap();
        let original = blacklist.lookup_data("ns.sinkhole.example.com").unwrap();
        assert!(Arc::ptr_eq(&learned, &original));
    }

    #[test]
    fn new_ns_of_blacklisted_zone_extends_the_blacklist() {
        let (censor, _, blacklist) = censor_with(LEARN_ALL);
        let mut authorities = vec![ns_record("host.ns.sinkhole.example.com", "ns9.fastflux.net")];
        let mut additionals = vec![];

        let reprocess = censor.inspect(&mut authorities, &mut additionals);
        assert!(reprocess);
        assert_eq!(
            blacklist.read().unwrap().lookup("ns9.fastflux.net"),
            Some("ns9.fastflux.net.".to_string())
        );
    }

    #[test]
    fn soa_records_are_inspected_like_ns_records() {
        let (censor, _, blacklist) = censor_with(LEARN_ALL);
        let mut authorities = vec![soa_record("new.zone", "ns.sinkhole.example.com")];
        let mut additionals = vec![];

        let reprocess = censor.inspect(&mut authorities, &mut additionals);
        assert!(reprocess);
        assert!(blacklist.read().unwrap().lookup("new.zone").is_some());
    }

    #[test]
    fn unclaimed_delegation_is_scrubbed() {
        let (censor, _, _) = censor_with(LEARN_ALL);
        let mut authorities = vec![
            ns_record("mtfnpy.org", "ns1.provider.net"),
            ns_record("mtfnpy.org", "ns2.provider.net"),
        ];
        let mut additionals = vec![a_record("ns1.provider.net", "198.51.100.7")];

        let reprocess = censor.inspect(&mut authorities, &mut additionals);
        assert!(!reprocess);
        assert!(authorities.is_empty());
        assert!(additionals.is_empty());
    }

    #[test]
    fn learning_disabled_means_no_extension() {
        let (censor, whitelist, blacklist) = censor_with(LEARN_NONE);
        whitelist.write().unwrap().add("ns2.msft.net").unwrap();
        let mut authorities = vec![
            ns_record("fresh.example.net", "ns2.msft.net"),
            ns_record("new.zone", "ns.sinkhole.example.com"),
        ];
        let mut additionals = vec![];

        let reprocess = censor.inspect(&mut authorities, &mut additionals);
        assert!(!reprocess);
        assert_eq!(whitelist.read().unwrap().lookup("fresh.example.net"), None);
        assert_eq!(blacklist.read().unwrap().lookup("new.zone"), None);

        // With learning off the touched records are not scrubbed either:
        // one of the lists claims the nameserver.
        assert_eq!(authorities.len(), 2);
    }

    #[test]
    fn non_delegation_records_are_skipped() {
        let (censor, _, _) = censor_with(LEARN_ALL);
        let mut authorities = vec![a_record("stray.example.net", "10.0.0.1")];
        let mut additionals = vec![];

        let reprocess = censor.inspect(&mut authorities, &mut additionals);
        assert!(!reprocess);
        assert_eq!(authorities.len(), 1);
    }

    #[test]
    fn learning_is_not_repeated_for_known_pairs() {
        let (censor, _, blacklist) = censor_with(LEARN_ALL);
        let mut authorities = vec![ns_record("new.zone", "ns.sinkhole.example.com")];
        let mut additionals = vec![];

        assert!(censor.inspect(&mut authorities, &mut additionals));
        let dump_once = blacklist.read().unwrap().dump();

        // Once both names are claimed the matrix asks for no action, so a
        // second inspection neither re-arms the pipeline nor mutates lists.
        assert!(!censor.inspect(&mut authorities, &mut additionals));
        assert_eq!(blacklist.read().unwrap().dump(), dump_once);
    }
}
