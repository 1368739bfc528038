//! Filter evaluation against a single entry.

use dirtree_entry::{Entry, Value};
use tracing::debug;

use crate::ast::{Assertion, Extensible, Filter, Substrings};

impl Filter {
    /// Returns `true` if `entry` satisfies this filter.
    pub fn matches(&self, entry: &Entry) -> bool {
        evaluate(self, entry)
    }
}

/// Evaluate `filter` against `entry`.
///
/// Values are compared as raw bytes; there is no attribute-syntax awareness.
pub fn evaluate(filter: &Filter, entry: &Entry) -> bool {
    match filter {
        Filter::And(filters) => filters.iter().all(|f| evaluate(f, entry)),
        Filter::Or(filters) => filters.iter().any(|f| evaluate(f, entry)),
        Filter::Not(filter) => !evaluate(filter, entry),
        Filter::Present(attribute) => entry.contains(attribute),
        Filter::Equality(a) => entry
            .get(&a.attribute)
            .is_some_and(|set| set.contains(&a.value)),
        Filter::Approx(a) => any_value(entry, a, |v| v.eq_ignore_ascii_case(a.value.as_bytes())),
        Filter::GreaterOrEqual(a) => any_value(entry, a, |v| v >= a.value.as_bytes()),
        Filter::LessOrEqual(a) => any_value(entry, a, |v| v <= a.value.as_bytes()),
        Filter::Substrings(s) => substrings_match(s, entry),
        Filter::Extensible(e) => extensible_match(e, entry),
    }
}

fn any_value(entry: &Entry, assertion: &Assertion, test: impl Fn(&[u8]) -> bool) -> bool {
    entry
        .get(&assertion.attribute)
        .is_some_and(|set| set.iter().any(|v| test(v.as_bytes())))
}

fn substrings_match(s: &Substrings, entry: &Entry) -> bool {
    let Some(set) = entry.get(&s.attribute) else {
        return false;
    };

    let mut candidates: Vec<&[u8]> = set.iter().map(Value::as_bytes).collect();
    if let Some(initial) = &s.initial {
        candidates = candidates
            .into_iter()
            .filter_map(|v| v.strip_prefix(initial.as_bytes()))
            .collect();
    }
    if let Some(final_) = &s.final_ {
        candidates = candidates
            .into_iter()
            .filter_map(|v| v.strip_suffix(final_.as_bytes()))
            .collect();
    }
    for fragment in &s.any {
        candidates = candidates
            .into_iter()
            .filter_map(|v| after_first(v, fragment.as_bytes()))
            .collect();
    }
    !candidates.is_empty()
}

/// The bytes following the first occurrence of `needle` in `haystack`.
fn after_first<'a>(haystack: &'a [u8], needle: &[u8]) -> Option<&'a [u8]> {
    if needle.is_empty() {
        return Some(haystack);
    }
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| &haystack[i + needle.len()..])
}

enum Rule {
    Exact,
    IgnoreCase,
}

fn rule(name: Option<&str>) -> Option<Rule> {
    match name {
        None => Some(Rule::Exact),
        Some(n) if n.eq_ignore_ascii_case("caseExactMatch") || n == "2.5.13.5" => Some(Rule::Exact),
        Some(n) if n.eq_ignore_ascii_case("caseIgnoreMatch") || n == "2.5.13.2" => {
            Some(Rule::IgnoreCase)
        }
        Some(_) => None,
    }
}

fn extensible_match(e: &Extensible, entry: &Entry) -> bool {
    let Some(rule) = rule(e.matching_rule.as_deref()) else {
        debug!(rule = ?e.matching_rule, "unsupported matching rule, filter item is false");
        return false;
    };
    let test = |candidate: &[u8]| match rule {
        Rule::Exact => candidate == e.value.as_bytes(),
        Rule::IgnoreCase => candidate.eq_ignore_ascii_case(e.value.as_bytes()),
    };

    let wanted = |key: &str| {
        e.attribute
            .as_deref()
            .map_or(true, |attribute| attribute.eq_ignore_ascii_case(key))
    };

    let in_attributes = entry
        .attributes()
        .iter()
        .filter(|set| wanted(set.key()))
        .any(|set| set.iter().any(|v| test(v.as_bytes())));
    if in_attributes {
        return true;
    }

    e.dn_attributes
        && entry
            .dn()
            .rdns()
            .iter()
            .flat_map(|rdn| rdn.avas())
            .filter(|ava| wanted(ava.attribute_type()))
            .any(|ava| test(ava.value().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_filter;
    use dirtree_entry::AttributeMap;
    use dirtree_name::Dn;

    fn entry(pairs: &[(&str, &[&str])]) -> Entry {
        Entry::with_attributes(
            Dn::parse("cn=foo,ou=people,dc=example").unwrap(),
            AttributeMap::from_pairs(pairs.iter().map(|(k, v)| (*k, v.iter().copied()))),
        )
    }

    fn check(filter: &str, e: &Entry) -> bool {
        parse_filter(filter).unwrap().matches(e)
    }

    // -----------------------------------------------------------------------
    // Substrings
    // -----------------------------------------------------------------------

    #[test]
    fn substring_ordered_fragments() {
        let filter = parse_filter("(cn=foo*bar*baz)").unwrap();
        assert!(filter.matches(&entry(&[("cn", &["fooXXbarYYbaz"])])));
        assert!(!filter.matches(&entry(&[("cn", &["fooXXbazYYbar"])])));
    }

    #[test]
    fn substring_initial_and_final() {
        let e = entry(&[("cn", &["hello world"])]);
        assert!(check("(cn=hello*)", &e));
        assert!(check("(cn=*world)", &e));
        assert!(check("(cn=hel*rld)", &e));
        assert!(!check("(cn=world*)", &e));
        assert!(!check("(cn=*hello)", &e));
    }

    #[test]
    fn substring_fragments_do_not_overlap() {
        let e = entry(&[("cn", &["abc"])]);
        assert!(check("(cn=ab*c)", &e));
        assert!(!check("(cn=ab*bc)", &e));
        assert!(!check("(cn=*b*b*)", &e));
        assert!(check("(cn=*b*)", &e));
    }

    #[test]
    fn substring_any_uses_first_occurrence() {
        let e = entry(&[("cn", &["xaxbxa"])]);
        assert!(check("(cn=*a*b*a*)", &e));
        assert!(!check("(cn=*b*b*)", &e));
    }

    #[test]
    fn substring_one_value_suffices() {
        let e = entry(&[("cn", &["nope", "foobar"])]);
        assert!(check("(cn=foo*)", &e));
        assert!(!check("(sn=foo*)", &e));
    }

    // -----------------------------------------------------------------------
    // Simple items
    // -----------------------------------------------------------------------

    #[test]
    fn equality_and_presence() {
        let e = entry(&[("cn", &["foo", "bar"]), ("objectClass", &["person"])]);
        assert!(check("(cn=bar)", &e));
        assert!(check("(CN=bar)", &e));
        assert!(!check("(cn=BAR)", &e));
        assert!(check("(objectclass=*)", &e));
        assert!(!check("(mail=*)", &e));
    }

    #[test]
    fn ordering_is_bytewise() {
        let e = entry(&[("uid", &["5"])]);
        assert!(check("(uid>=5)", &e));
        assert!(check("(uid>=10)", &e));
        assert!(!check("(uid<=10)", &e));
        assert!(check("(uid<=5)", &e));
        assert!(!check("(gid>=0)", &e));
    }

    #[test]
    fn approx_ignores_ascii_case() {
        let e = entry(&[("cn", &["Foo Bar"])]);
        assert!(check("(cn~=foo bar)", &e));
        assert!(!check("(cn~=foo)", &e));
    }

    // -----------------------------------------------------------------------
    // Composites
    // -----------------------------------------------------------------------

    #[test]
    fn boolean_combinators() {
        let e = entry(&[("cn", &["foo"]), ("sn", &["bar"])]);
        assert!(check("(&(cn=foo)(sn=bar))", &e));
        assert!(!check("(&(cn=foo)(sn=baz))", &e));
        assert!(check("(|(cn=nope)(sn=bar))", &e));
        assert!(!check("(|(cn=nope)(sn=nope))", &e));
        assert!(check("(!(cn=nope))", &e));
        assert!(check("(&(objectClass=*)(cn=foo))", &entry(&[("objectClass", &["top"]), ("cn", &["foo"])])));
    }

    // -----------------------------------------------------------------------
    // Extensible
    // -----------------------------------------------------------------------

    #[test]
    fn extensible_rules() {
        let e = entry(&[("cn", &["Foo"])]);
        assert!(check("(cn:=Foo)", &e));
        assert!(!check("(cn:=foo)", &e));
        assert!(check("(cn:caseIgnoreMatch:=foo)", &e));
        assert!(check("(cn:2.5.13.2:=FOO)", &e));
        assert!(check("(cn:caseExactMatch:=Foo)", &e));
        assert!(!check("(cn:1.2.3.4:=Foo)", &e));
    }

    #[test]
    fn extensible_without_attribute_checks_every_attribute() {
        let e = entry(&[("cn", &["a"]), ("sn", &["Target"])]);
        assert!(check("(:caseIgnoreMatch:=target)", &e));
        assert!(!check("(:caseExactMatch:=target)", &e));
    }

    #[test]
    fn extensible_dn_attributes() {
        let e = entry(&[("cn", &["foo"])]);
        assert!(!check("(ou:=people)", &e));
        assert!(check("(ou:dn:=people)", &e));
        assert!(check("(:dn:caseIgnoreMatch:=EXAMPLE)", &e));
        assert!(!check("(ou:dn:=example)", &e));
    }
}
