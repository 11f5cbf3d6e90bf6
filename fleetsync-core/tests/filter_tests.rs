use fleetsync_core::{blacklist, Blacklist, PipelineRecord, WorkingSet};
use rstest::rstest;

fn catalog() -> Vec<PipelineRecord> {
    ["rnaseq", "chipseq", "rnafusion"]
        .into_iter()
        .map(PipelineRecord::named)
        .collect()
}

// ---------------------------------------------------------------------------
// Explicit name vs. blacklist
// ---------------------------------------------------------------------------

#[rstest]
#[case::substring_match(&[], Some("rna"), &["rnaseq", "rnafusion"])]
#[case::blacklist_only(&["chipseq"], None, &["rnaseq", "rnafusion"])]
#[case::explicit_ignores_blacklist(&["rnaseq"], Some("rnaseq"), &["rnaseq"])]
#[case::no_match(&[], Some("sarek"), &[])]
#[case::empty_blacklist(&[], None, &["rnaseq", "chipseq", "rnafusion"])]
#[case::blacklist_everything(&["rnaseq", "chipseq", "rnafusion"], None, &[])]
fn working_set_selection(
    #[case] excluded: &[&str],
    #[case] explicit: Option<&str>,
    #[case] expected: &[&str],
) {
    let set = blacklist::filter(catalog(), &Blacklist::new(excluded.iter().copied()), explicit);
    assert_eq!(set.names(), expected);
}

#[test]
fn filtering_is_idempotent() {
    let excluded = Blacklist::new(["chipseq"]);
    let once = WorkingSet::build(catalog(), &excluded, None);
    let twice = WorkingSet::build(once.records().to_vec(), &excluded, None);
    assert_eq!(once, twice);

    let once = WorkingSet::build(catalog(), &excluded, Some("rna"));
    let twice = WorkingSet::build(once.records().to_vec(), &excluded, Some("rna"));
    assert_eq!(once, twice);
}

#[test]
fn working_set_never_contains_blacklisted_or_duplicate_names() {
    let mut records = catalog();
    records.extend(catalog());
    records.push(PipelineRecord::named("sarek"));

    let excluded = Blacklist::new(["chipseq", "sarek"]);
    let set = WorkingSet::build(records, &excluded, None);

    let names = set.names();
    assert_eq!(names, vec!["rnaseq", "rnafusion"]);
    let mut unique = names.clone();
    unique.dedup();
    assert_eq!(unique.len(), names.len());
}
