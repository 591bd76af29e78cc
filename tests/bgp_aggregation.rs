use prefixagg::attributes::{Origin, RouteAttributes, merge};
use prefixagg::prefix::{AddressFamily, Prefix};
use prefixagg::trie::AggregationTrie;
use std::collections::BTreeSet;

fn route(cidr: &str, communities: &[&str], med: Option<u32>, origin: Origin) -> Prefix {
    let mut attributes = RouteAttributes::new()
        .with_origin(origin)
        .with_communities(communities.iter().copied());
    attributes.med = med;
    cidr.parse::<Prefix>().unwrap().with_attributes(attributes)
}

fn plain(cidr: &str) -> Prefix {
    cidr.parse::<Prefix>().unwrap()
}

fn communities(prefix: &Prefix) -> BTreeSet<String> {
    prefix.attributes().unwrap().communities.clone()
}

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn exported_with_len(exported: &[Prefix], prefix_len: u8) -> Prefix {
    let matching: Vec<&Prefix> = exported
        .iter()
        .filter(|p| p.prefix_len() == prefix_len)
        .collect();
    assert_eq!(matching.len(), 1, "expected exactly one /{prefix_len} in {exported:?}");
    matching[0].clone()
}

#[test]
fn test_merge_rejects_different_med() {
    let a = RouteAttributes::new().with_med(10);
    let b = RouteAttributes::new().with_med(20);
    assert_eq!(merge(&a, &b), None);
}

#[test]
fn test_merge_absent_med_is_not_equal_to_present_med() {
    let a = RouteAttributes::new();
    let b = RouteAttributes::new().with_med(200);
    assert_eq!(merge(&a, &b), None);
    assert_eq!(merge(&b, &a), None);
}

#[test]
fn test_merge_combines_attributes() {
    let a = RouteAttributes::new()
        .with_med(5)
        .with_origin(Origin::Egp)
        .with_atomic_aggregate(true)
        .with_communities(["A", "B"]);
    let b = RouteAttributes::new()
        .with_med(5)
        .with_origin(Origin::Igp)
        .with_communities(["B", "C"]);

    let merged = merge(&a, &b).unwrap();

    assert_eq!(merged.med, Some(5));
    assert_eq!(merged.origin, Origin::Egp);
    assert!(merged.atomic_aggregate);
    assert_eq!(merged.communities, set(&["A", "B", "C"]));
}

#[test]
fn test_merge_origin_precedence() {
    let with = |origin| RouteAttributes::new().with_origin(origin);
    let merged_origin = |a, b| merge(&with(a), &with(b)).unwrap().origin;

    assert_eq!(merged_origin(Origin::Igp, Origin::Igp), Origin::Igp);
    assert_eq!(merged_origin(Origin::Igp, Origin::Egp), Origin::Egp);
    assert_eq!(merged_origin(Origin::Incomplete, Origin::Egp), Origin::Incomplete);
    assert_eq!(merged_origin(Origin::Igp, Origin::Incomplete), Origin::Incomplete);
}

#[test]
fn test_adjacent_routes_aggregate_with_community_union() {
    let mut trie = AggregationTrie::new(AddressFamily::Ipv4);
    let left = route("10.0.0.0/24", &["A", "B"], Some(100), Origin::Igp);
    let right = route("10.0.1.0/24", &["B", "C"], Some(100), Origin::Igp);

    let actual = trie.apply(&[left, right], &[]).unwrap();

    assert_eq!(actual.exported.len(), 1, "Only the aggregate should be exported.");
    assert!(actual.withdrawn.is_empty());
    let aggregate = &actual.exported[0];
    assert_eq!(*aggregate, plain("10.0.0.0/23"));
    let attributes = aggregate.attributes().unwrap();
    assert_eq!(attributes.communities, set(&["A", "B", "C"]));
    assert_eq!(attributes.med, Some(100));
    assert_eq!(attributes.origin, Origin::Igp);
    assert!(!attributes.atomic_aggregate);
}

#[test]
fn test_atomic_aggregate_true_if_any_child_sets_it() {
    let mut trie = AggregationTrie::new(AddressFamily::Ipv4);
    let left = route("10.0.0.0/24", &["AA"], Some(5), Origin::Igp);
    let right = route("10.0.1.0/24", &["BB"], Some(5), Origin::Igp);
    let left = left.clone().with_attributes(
        left.attributes().unwrap().clone().with_atomic_aggregate(true),
    );

    let actual = trie.apply(&[left, right], &[]).unwrap();

    let aggregate = exported_with_len(&actual.exported, 23);
    assert!(aggregate.attributes().unwrap().atomic_aggregate);
}

#[test]
fn test_med_mismatch_prevents_aggregation() {
    let mut trie = AggregationTrie::new(AddressFamily::Ipv4);
    let a = route("10.0.0.0/24", &["L"], Some(10), Origin::Igp);
    let b = route("10.0.1.0/24", &["R"], Some(20), Origin::Igp);

    let actual = trie.apply(&[a, b], &[]).unwrap();

    assert!(actual.is_empty(), "No aggregate should form when MED differs.");
}

#[test]
fn test_both_med_absent_aggregates() {
    let mut trie = AggregationTrie::new(AddressFamily::Ipv4);
    let a = route("10.20.0.0/24", &["A"], None, Origin::Igp);
    let b = route("10.20.1.0/24", &["B"], None, Origin::Igp);

    let actual = trie.apply(&[a, b], &[]).unwrap();

    let aggregate = exported_with_len(&actual.exported, 23);
    assert_eq!(aggregate.attributes().unwrap().med, None);
}

#[test]
fn test_plain_route_next_to_route_with_med_does_not_aggregate() {
    let mut trie = AggregationTrie::new(AddressFamily::Ipv4);

    let actual = trie
        .apply(
            &[
                plain("10.30.0.0/24"),
                route("10.30.1.0/24", &["B"], Some(200), Origin::Igp),
            ],
            &[],
        )
        .unwrap();

    assert!(actual.is_empty());
}

#[test]
fn test_multi_level_aggregation_merges_all_communities() {
    let mut trie = AggregationTrie::new(AddressFamily::Ipv4);
    let actual = trie
        .apply(
            &[
                route("10.0.0.0/24", &["A"], Some(30), Origin::Igp),
                route("10.0.1.0/24", &["B"], Some(30), Origin::Igp),
            ],
            &[],
        )
        .unwrap();
    exported_with_len(&actual.exported, 23);

    let actual = trie
        .apply(
            &[
                route("10.0.2.0/24", &["C"], Some(30), Origin::Igp),
                route("10.0.3.0/24", &["D"], Some(30), Origin::Igp),
            ],
            &[],
        )
        .unwrap();

    let aggregate = exported_with_len(&actual.exported, 22);
    assert_eq!(communities(&aggregate), set(&["A", "B", "C", "D"]));
    assert_eq!(actual.withdrawn, vec![plain("10.0.0.0/23")]);
}

#[test]
fn test_delete_half_reexports_remaining_aggregate_with_its_own_communities() {
    let mut trie = AggregationTrie::new(AddressFamily::Ipv4);
    trie.apply(
        &[
            route("10.0.0.0/24", &["L0"], Some(40), Origin::Igp),
            route("10.0.1.0/24", &["L1"], Some(40), Origin::Igp),
            route("10.0.2.0/24", &["R0"], Some(40), Origin::Igp),
            route("10.0.3.0/24", &["R1"], Some(40), Origin::Igp),
        ],
        &[],
    )
    .unwrap();

    let actual = trie
        .apply(&[], &[plain("10.0.2.0/24"), plain("10.0.3.0/24")])
        .unwrap();

    assert_eq!(actual.withdrawn.len(), 1);
    let withdrawn = &actual.withdrawn[0];
    assert_eq!(*withdrawn, plain("10.0.0.0/22"));
    assert_eq!(
        communities(withdrawn),
        set(&["L0", "L1", "R0", "R1"]),
        "The withdrawal carries the value that was announced."
    );
    let aggregate = exported_with_len(&actual.exported, 23);
    assert_eq!(communities(&aggregate), set(&["L0", "L1"]));
}

#[test]
fn test_delete_one_child_withdraws_aggregate() {
    let mut trie = AggregationTrie::new(AddressFamily::Ipv4);
    let a = route("10.0.0.0/24", &["A"], Some(55), Origin::Igp);
    let b = route("10.0.1.0/24", &["B"], Some(55), Origin::Igp);
    trie.apply(&[a, b.clone()], &[]).unwrap();

    let actual = trie.apply(&[], &[b]).unwrap();

    assert_eq!(actual.withdrawn, vec![plain("10.0.0.0/23")]);
    assert!(actual.exported.is_empty());
}

#[test]
fn test_gap_fill_triggers_aggregation() {
    let mut trie = AggregationTrie::new(AddressFamily::Ipv4);
    let actual = trie
        .apply(&[route("10.60.0.0/24", &["A"], Some(5), Origin::Igp)], &[])
        .unwrap();
    assert!(actual.is_empty());

    let actual = trie
        .apply(&[route("10.60.1.0/24", &["B"], Some(5), Origin::Igp)], &[])
        .unwrap();

    assert_eq!(actual.exported, vec![plain("10.60.0.0/23")]);
}

#[test]
fn test_med_mismatch_then_fix_aggregates() {
    let mut trie = AggregationTrie::new(AddressFamily::Ipv4);
    let actual = trie
        .apply(
            &[
                route("10.70.0.0/24", &["A"], Some(10), Origin::Igp),
                route("10.70.1.0/24", &["B"], Some(20), Origin::Igp),
            ],
            &[],
        )
        .unwrap();
    assert!(actual.is_empty());

    let actual = trie
        .apply(&[route("10.70.1.0/24", &["B"], Some(10), Origin::Igp)], &[])
        .unwrap();

    let aggregate = exported_with_len(&actual.exported, 23);
    assert_eq!(aggregate, plain("10.70.0.0/23"));
    assert_eq!(communities(&aggregate), set(&["A", "B"]));
    assert_eq!(aggregate.attributes().unwrap().med, Some(10));
}

#[test]
fn test_med_break_withdraws_aggregate() {
    let mut trie = AggregationTrie::new(AddressFamily::Ipv4);
    trie.apply(
        &[
            route("10.80.0.0/24", &["A"], Some(10), Origin::Igp),
            route("10.80.1.0/24", &["B"], Some(10), Origin::Igp),
        ],
        &[],
    )
    .unwrap();

    let actual = trie
        .apply(&[route("10.80.1.0/24", &["B"], Some(99), Origin::Igp)], &[])
        .unwrap();

    assert_eq!(actual.withdrawn, vec![plain("10.80.0.0/23")]);
    assert!(actual.exported.is_empty());
}

#[test]
fn test_leaf_attribute_change_reannounces_exported_aggregate() {
    let mut trie = AggregationTrie::new(AddressFamily::Ipv4);
    trie.apply(
        &[
            route("10.40.0.0/24", &["A"], Some(10), Origin::Igp),
            route("10.40.1.0/24", &["B"], Some(10), Origin::Igp),
        ],
        &[],
    )
    .unwrap();

    let actual = trie
        .apply(&[route("10.40.0.0/24", &["A", "C"], Some(10), Origin::Igp)], &[])
        .unwrap();

    assert!(actual.withdrawn.is_empty(), "An update replaces the announcement.");
    let aggregate = exported_with_len(&actual.exported, 23);
    assert_eq!(communities(&aggregate), set(&["A", "B", "C"]));

    let actual = trie
        .apply(
            &[
                route("10.40.2.0/24", &["X"], Some(10), Origin::Igp),
                route("10.40.3.0/24", &["Y"], Some(10), Origin::Igp),
            ],
            &[],
        )
        .unwrap();

    let aggregate = exported_with_len(&actual.exported, 22);
    assert_eq!(communities(&aggregate), set(&["A", "B", "C", "X", "Y"]));
}

#[test]
fn test_leaf_attribute_change_reaches_higher_exported_aggregate() {
    let mut trie = AggregationTrie::new(AddressFamily::Ipv4);
    trie.apply(
        &[
            route("10.50.0.0/24", &["L"], Some(15), Origin::Igp),
            route("10.50.1.0/24", &["R"], Some(15), Origin::Igp),
            route("10.50.2.0/24", &["X"], Some(15), Origin::Igp),
            route("10.50.3.0/24", &["Y"], Some(15), Origin::Igp),
        ],
        &[],
    )
    .unwrap();
    assert_eq!(trie.announced(), vec![plain("10.50.0.0/22")]);

    let changed = route("10.50.1.0/24", &["R"], Some(15), Origin::Incomplete);
    let actual = trie.apply(&[changed], &[]).unwrap();

    assert!(actual.withdrawn.is_empty());
    let aggregate = exported_with_len(&actual.exported, 22);
    assert_eq!(aggregate.attributes().unwrap().origin, Origin::Incomplete);
    assert_eq!(trie.announced(), vec![plain("10.50.0.0/22")]);
}

#[test]
fn test_identical_readd_does_not_reannounce() {
    let mut trie = AggregationTrie::new(AddressFamily::Ipv4);
    let a = route("10.90.0.0/24", &["A"], Some(1), Origin::Igp);
    let b = route("10.90.1.0/24", &["B"], Some(1), Origin::Igp);
    trie.apply(&[a.clone(), b], &[]).unwrap();

    let actual = trie.apply(&[a], &[]).unwrap();

    assert!(actual.is_empty());
}

#[test]
fn test_aggregate_of_plain_routes_has_no_attributes() {
    let mut trie = AggregationTrie::new(AddressFamily::Ipv4);

    let actual = trie
        .apply(&[plain("10.0.0.0/24"), plain("10.0.1.0/24")], &[])
        .unwrap();

    assert!(actual.exported[0].attributes().is_none());
}
