use crate::shared::dns;
use crate::sinkhole::template::ZoneTemplates;
use std::collections::{BTreeMap, HashMap};

/// A set of domain keys with an optional [ZoneTemplates] payload per key.
/// Keys are stored with their labels reversed, so zones sharing a suffix
/// share a subtree: `www.example.com` lives under `com → example → www`.
/// The dns hierarchy is right-anchored and with lists growing to hundreds
/// of thousands of entries the shared suffixes matter.
///
/// Two invariants hold for every [`DomainTrie`]:
/// - stored labels are lowercase (keys are folded on entry),
/// - adding an exact key `k` also adds the wildcard key `*.k`, sharing
///   the same payload, so subdomain lookups can never disagree with the
///   zone they belong to.
#[derive(Debug, Default)]
pub struct DomainTrie {
    root: Node,
}

#[derive(Debug, Default)]
struct Node {
    children: HashMap<String, Node>,
    entry: Option<Entry>,
}

#[derive(Debug)]
struct Entry {
    key: String,
    templates: Option<ZoneTemplates>,
}

/// Errors returned by the [`DomainTrie`] mutators.
#[derive(Debug, Clone)]
pub enum TrieErr {
    KeyRejected(String),
}

impl DomainTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key with no payload. See [DomainTrie::add_with].
    pub fn add(&mut self, name: &str) -> Result<Vec<String>, TrieErr> {
        self.add_with(name, None)
    }

    /// Insert a key with an optional payload, returning the canonical keys
    /// inserted. An exact key is always accompanied by its wildcard form
    /// pointing at the same payload; a key already in wildcard form is
    /// inserted alone. Inserting an existing key overwrites its payload,
    /// which makes the operation idempotent.
    pub fn add_with(&mut self, name: &str, templates: Option<ZoneTemplates>) -> Result<Vec<String>, TrieErr> {
        let key = canonical_key(name)?;
        let mut inserted = vec![];
        if !key.starts_with("*.") {
            let wildcard_key = format!("*.{}", key);
            self.insert_key(&wildcard_key, templates.clone());
            self.insert_key(&key, templates);
            inserted.push(key);
            inserted.push(wildcard_key);
        } else {
            self.insert_key(&key, templates);
            inserted.push(key);
        }
        Ok(inserted)
    }

    /// Search a key in the trie, returning its canonical form if present.
    /// The deep search is exact: no wildcard fallback is attempted here,
    /// that is the job of [wildcard_candidates] at the querying layer.
    pub fn lookup(&self, name: &str) -> Option<String> {
        self.find_entry(name).map(|entry| entry.key.clone())
    }

    /// Search a key in the trie, returning its payload. Keys present with
    /// no payload and absent keys are not distinguished here, use
    /// [DomainTrie::lookup] for presence.
    pub fn lookup_data(&self, name: &str) -> Option<ZoneTemplates> {
        self.find_entry(name).and_then(|entry| entry.templates.clone())
    }

    /// Run the wildcard-enumerated candidates of `name` through the trie,
    /// returning the first key present: the exact name first, then
    /// progressively broader wildcards toward the TLD.
    pub fn find_ancestor(&self, name: &dns::Name) -> Option<String> {
        wildcard_candidates(name).into_iter().find_map(|cand| self.lookup(&cand))
    }

    /// Copy the payload of `src` onto a new key `dst` (and its wildcard
    /// form). The payload is shared, not duplicated: both keys resolve to
    /// the same templates afterwards. If `src` carries no payload the
    /// operation degrades to a plain insert of `dst`. Idempotent.
    pub fn clone_record(&mut self, src: &str, dst: &str) -> Result<Vec<String>, TrieErr> {
        let templates = self.lookup_data(src);
        self.add_with(dst, templates)
    }

    /// Serialize the trie entries as `key\tpayload_json` lines, sorted by
    /// key. Meant for operators eyeballing the loaded policies, nothing
    /// parses it back.
    pub fn dump(&self) -> Vec<String> {
        let mut entries = BTreeMap::new();
        collect_entries(&self.root, &mut entries);
        entries
            .into_iter()
            .map(|(key, templates)| {
                let payload: BTreeMap<&str, &str> = templates
                    .iter()
                    .flat_map(|t| t.iter())
                    .map(|(rt, tmpl)| (rt.to_str(), tmpl.text()))
                    .collect();
                format!("{}\t{}", key, serde_json::to_string(&payload).unwrap())
            })
            .collect()
    }

    // Insert a single canonical key, overwriting any previous entry.
    fn insert_key(&mut self, key: &str, templates: Option<ZoneTemplates>) {
        let mut node = &mut self.root;
        for label in reversed_labels(key) {
            node = node.children.entry(label.to_string()).or_default();
        }
        node.entry = Some(Entry {
            key: key.to_string(),
            templates,
        });
    }

    // Exact traversal of the reversed labels path of `name`.
    fn find_entry(&self, name: &str) -> Option<&Entry> {
        let key = canonical_key(name).ok()?;
        let mut node = &self.root;
        for label in reversed_labels(&key) {
            node = node.children.get(label)?;
        }
        node.entry.as_ref()
    }
}

fn collect_entries<'a>(node: &'a Node, out: &mut BTreeMap<String, Option<&'a ZoneTemplates>>) {
    if let Some(entry) = &node.entry {
        out.insert(entry.key.clone(), entry.templates.as_ref());
    }
    for child in node.children.values() {
        collect_entries(child, out);
    }
}

/// Generate the lookup candidates for a name, in matching order: the name
/// itself, then wildcards of progressively shorter suffixes, stopping
/// before the root. For `a.b.c.tld` the candidates are `a.b.c.tld`,
/// `*.a.b.c.tld`, `*.b.c.tld`, `*.c.tld`, `*.tld`. The bare root wildcard
/// `*.` is never emitted. Handlers take the first candidate present in
/// their trie, which makes the match a longest-suffix one.
pub fn wildcard_candidates(name: &dns::Name) -> Vec<String> {
    let labels: Vec<&str> = name.labels().collect();
    let mut candidates = Vec::with_capacity(labels.len() + 1);
    candidates.push(name.as_ref().to_string());
    for start in 0..labels.len() {
        candidates.push(format!("*.{}.", labels[start..].join(".")));
    }
    candidates
}

// Normalize a key to its canonical form: lowercase, absolute. The
// wildcard is accepted only as the whole leftmost label.
fn canonical_key(name: &str) -> Result<String, TrieErr> {
    let mut key = name.trim().to_ascii_lowercase();
    if key.is_empty() {
        return Err(TrieErr::KeyRejected("empty key".to_string()));
    }
    if !key.ends_with('.') {
        key.push('.');
    }
    if key == "." || key == "*." {
        return Err(TrieErr::KeyRejected("bare root key".to_string()));
    }
    if key.starts_with('.') || key.contains("..") {
        return Err(TrieErr::KeyRejected(format!("malformed key '{}'", name)));
    }
    let rest = key.strip_prefix("*.").unwrap_or(&key);
    for label in rest.trim_end_matches('.').split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(TrieErr::KeyRejected(format!("malformed label in '{}'", name)));
        }
        let label_ok = label.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if !label_ok {
            return Err(TrieErr::KeyRejected(format!("malformed label in '{}'", name)));
        }
    }
    Ok(key)
}

// Iterate the labels of a canonical key, rightmost (root-nearest) first.
fn reversed_labels(key: &str) -> impl Iterator<Item = &str> {
    key.trim_end_matches('.').rsplit('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinkhole::template::RecordTemplate;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn name(s: &str) -> dns::Name {
        dns::Name::from_string(s).unwrap()
    }

    fn templates(lines: &[&str]) -> ZoneTemplates {
        let map: HashMap<_, _> = lines
            .iter()
            .map(|l| RecordTemplate::parse(l).unwrap())
            .map(|t| (t.record_type(), t))
            .collect();
        Arc::new(map)
    }

    #[test]
    fn add_inserts_wildcard_too() {
        let mut trie = DomainTrie::new();
        let inserted = trie.add("dyndns.org").unwrap();
        assert_eq!(inserted, vec!["dyndns.org.", "*.dyndns.org."]);
        assert_eq!(trie.lookup("dyndns.org"), Some("dyndns.org.".to_string()));
        assert_eq!(trie.lookup("*.dyndns.org"), Some("*.dyndns.org.".to_string()));
    }

    #[test]
    fn lookup_is_exact_not_hierarchical() {
        let mut trie = DomainTrie::new();
        trie.add("dyndns.org").unwrap();
        assert_eq!(trie.lookup("host.dyndns.org"), None);
        assert_eq!(trie.lookup("org"), None);
    }

    #[test]
    fn lookup_folds_case() {
        let mut trie = DomainTrie::new();
        trie.add("DynDNS.Org").unwrap();
        assert_eq!(trie.lookup("dyndns.org"), Some("dyndns.org.".to_string()));
        assert_eq!(trie.lookup("DYNDNS.ORG."), Some("dyndns.org.".to_string()));
    }

    #[test]
    fn candidates_order_and_no_bare_root() {
        let cands = wildcard_candidates(&name("a.b.c.tld"));
        assert_eq!(
            cands,
            vec!["a.b.c.tld.", "*.a.b.c.tld.", "*.b.c.tld.", "*.c.tld.", "*.tld."]
        );
        assert!(!cands.contains(&"*.".to_string()));
    }

    #[test]
    fn find_ancestor_prefers_the_longest_suffix() {
        let mut trie = DomainTrie::new();
        trie.add("org").unwrap();
        trie.add("dyndns.org").unwrap();
        let matched = trie.find_ancestor(&name("host.dyndns.org"));
        assert_eq!(matched, Some("*.dyndns.org.".to_string()));
        let matched = trie.find_ancestor(&name("dyndns.org"));
        assert_eq!(matched, Some("dyndns.org.".to_string()));
        let matched = trie.find_ancestor(&name("example.com"));
        assert_eq!(matched, None);
    }

    #[test]
    fn payload_is_shared_between_exact_and_wildcard() {
        let mut trie = DomainTrie::new();
        let zone_templates = templates(&["* 86400 IN A 10.1.2.3"]);
        trie.add_with("dyndns.org", Some(Arc::clone(&zone_templates))).unwrap();

        let exact = trie.lookup_data("dyndns.org").unwrap();
        let wildcard = trie.lookup_data("*.dyndns.org").unwrap();
        assert!(Arc::ptr_eq(&exact, &wildcard));
        assert!(Arc::ptr_eq(&exact, &zone_templates));
    }

    #[test]
    fn clone_record_shares_payload_and_is_idempotent() {
        let mut trie = DomainTrie::new();
        let zone_templates = templates(&["* 86400 IN A 10.1.2.3", "* 86400 IN NS ns.sinkhole.example.com"]);
        trie.add_with("dyndns.org", Some(zone_templates)).unwrap();

        trie.clone_record("dyndns.org", "new.zone").unwrap();
        let first = trie.lookup_data("new.zone").unwrap();
        assert!(Arc::ptr_eq(&first, &trie.lookup_data("dyndns.org").unwrap()));
        assert!(Arc::ptr_eq(&first, &trie.lookup_data("*.new.zone").unwrap()));

        // A second clone leaves the trie in the same state.
        let dump_before = trie.dump();
        trie.clone_record("dyndns.org", "new.zone").unwrap();
        let second = trie.lookup_data("new.zone").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(trie.dump(), dump_before);
    }

    #[test]
    fn clone_record_without_payload_inserts_destination() {
        let mut trie = DomainTrie::new();
        trie.add("microsoft.com").unwrap();
        trie.clone_record("microsoft.com", "new.zone").unwrap();
        assert_eq!(trie.lookup("new.zone"), Some("new.zone.".to_string()));
        assert_eq!(trie.lookup_data("new.zone"), None);
    }

    #[test]
    fn rejects_malformed_keys() {
        let mut trie = DomainTrie::new();
        assert!(trie.add("").is_err());
        assert!(trie.add(".").is_err());
        assert!(trie.add("*.").is_err());
        assert!(trie.add("bad..key").is_err());
        assert!(trie.add("spa ce.com").is_err());
        assert!(trie.add("mid.*.com").is_err());
    }

    #[test]
    fn dump_lists_entries_with_payloads() {
        let mut trie = DomainTrie::new();
        trie.add_with("dyndns.org", Some(templates(&["* 86400 IN A 10.1.2.3"]))).unwrap();
        trie.add("plain.org").unwrap();

        let lines = trie.dump();
        assert_eq!(lines.len(), 4);
        assert!(lines.contains(&"dyndns.org.\t{\"A\":\"* 86400 IN A 10.1.2.3\"}".to_string()));
        assert!(lines.contains(&"plain.org.\t{}".to_string()));
    }
}
