//! Relational loader tests — replace semantics, independent loads, scripts.

use funnel_core::{
    error::FunnelError,
    report,
    store::{FunnelStore, LoadOutcome},
    types::CanonicalRow,
};

const FUNNEL_SQL: &str = include_str!("../../sql/funnel_metrics.sql");

fn row(campaign: &str, channel: &str, values: [f64; 6]) -> CanonicalRow {
    let [impressions, clicks, leads, conversions, cost, revenue] = values;
    CanonicalRow {
        campaign: campaign.into(),
        channel: channel.into(),
        impressions,
        clicks,
        leads,
        conversions,
        cost,
        revenue,
    }
}

fn store() -> FunnelStore {
    FunnelStore::in_memory().expect("in-memory store")
}

/// Loading over an existing table replaces it; nothing is appended.
#[test]
fn replace_table_overwrites_existing_rows() {
    let store = store();
    let first = vec![
        row("A", "Google", [1.0; 6]),
        row("B", "Google", [2.0; 6]),
        row("C", "Bing", [3.0; 6]),
    ];
    let second = vec![row("D", "Meta", [4.0; 6]), row("E", "Meta", [5.0; 6])];

    store.replace_table("ppc_campaign", &first).unwrap();
    assert_eq!(store.row_count("ppc_campaign").unwrap(), 3);

    store.replace_table("ppc_campaign", &second).unwrap();
    assert_eq!(store.row_count("ppc_campaign").unwrap(), 2);
    assert_eq!(store.canonical_rows("ppc_campaign").unwrap(), second);
}

#[test]
fn table_names_are_validated() {
    let store = store();
    let err = store.replace_table("x; DROP TABLE y", &[]).unwrap_err();
    assert!(matches!(err, FunnelError::InvalidTableName { .. }));
    assert!(store.replace_table("_ok_name1", &[]).is_ok());
}

/// One table failing to load leaves the other load untouched.
#[test]
fn table_loads_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("ppc_cleaned.csv");
    let bad = dir.path().join("marketing_cleaned.csv");
    report::write_canonical(&good, &[row("C1", "Google", [10.0, 1.0, 1.0, 0.0, 5.0, 0.0])]).unwrap();
    std::fs::write(&bad, "campaign,channel\nAcme,Email\n").unwrap();

    let store = store();
    let outcomes = store.load_tables(&[
        ("ppc_campaign", good.as_path()),
        ("marketing_campaign", bad.as_path()),
    ]);

    assert_eq!(
        outcomes[0],
        LoadOutcome::Loaded { table: "ppc_campaign".into(), rows: 1 }
    );
    assert!(!outcomes[1].is_loaded());
    assert_eq!(store.row_count("ppc_campaign").unwrap(), 1);
    assert!(!store.table_exists("marketing_campaign").unwrap());
}

/// Statements before a failing one stay applied.
#[test]
fn script_failure_keeps_earlier_statements() {
    let store = store();
    let err = store
        .execute_script(
            "CREATE TABLE applied (x INTEGER);
             INSERT INTO applied VALUES (1);
             INSERT INTO no_such_table VALUES (1);
             CREATE TABLE never_created (x INTEGER);",
        )
        .unwrap_err();

    assert!(matches!(err, FunnelError::Database(_)));
    assert_eq!(store.row_count("applied").unwrap(), 1);
    assert!(!store.table_exists("never_created").unwrap());
}

/// Scripts run with SQLite's default foreign-key setting, so a dangling
/// reference is stored rather than rejected.
#[test]
fn script_with_dangling_reference_is_accepted() {
    let store = store();
    store
        .execute_script(
            "CREATE TABLE Campaigns (campaign_id INTEGER PRIMARY KEY, campaign_name TEXT);
             CREATE TABLE Leads (
                 lead_id     INTEGER PRIMARY KEY,
                 campaign_id INTEGER REFERENCES Campaigns(campaign_id)
             );
             INSERT INTO Leads (campaign_id) VALUES (42);",
        )
        .expect("dangling reference accepted");

    assert_eq!(store.row_count("Leads").unwrap(), 1);
}

#[test]
fn file_store_accepts_dangling_reference() {
    let dir = tempfile::tempdir().unwrap();
    let store = FunnelStore::open(&dir.path().join("campaigns.db")).unwrap();
    store
        .execute_script(
            "CREATE TABLE Parent (id INTEGER PRIMARY KEY);
             CREATE TABLE Child (parent_id INTEGER REFERENCES Parent(id));
             INSERT INTO Child VALUES (7);",
        )
        .unwrap();
    assert_eq!(store.row_count("Child").unwrap(), 1);
}

fn seeded_store() -> FunnelStore {
    let store = store();
    store
        .replace_table(
            "ppc_campaign",
            &[
                row("C1", "Google", [1000.0, 50.0, 50.0, 5.0, 100.0, 0.0]),
                row("C1", "Google", [400.0, 10.0, 10.0, 0.0, 50.0, 0.0]),
            ],
        )
        .unwrap();
    store
        .replace_table(
            "marketing_campaign",
            &[row("Acme", "Email", [5000.0, 200.0, 200.0, 20.0, 200.0, 5.0])],
        )
        .unwrap();
    store.execute_script(FUNNEL_SQL).expect("funnel script");
    store
}

#[test]
fn funnel_script_builds_normalized_tables() {
    let store = seeded_store();
    assert_eq!(store.row_count("Campaigns").unwrap(), 2);
    assert_eq!(store.row_count("Leads").unwrap(), 3);
    assert_eq!(store.row_count("Conversions").unwrap(), 2);

    // Idempotent: a second run rebuilds the same tables.
    store.execute_script(FUNNEL_SQL).unwrap();
    assert_eq!(store.row_count("Campaigns").unwrap(), 2);
    assert_eq!(store.row_count("Leads").unwrap(), 3);
}

#[test]
fn leads_preview_counts_lead_records() {
    let store = seeded_store();
    let preview = store.leads_per_campaign().unwrap();

    assert_eq!(preview.len(), 2);
    let c1 = preview.iter().find(|p| p.campaign_name == "C1").unwrap();
    let acme = preview.iter().find(|p| p.campaign_name == "Acme").unwrap();
    assert_eq!(c1.total_leads, 2);
    assert_eq!(acme.total_leads, 1);
}

#[test]
fn roi_preview_compares_revenue_with_budget() {
    let store = seeded_store();
    let preview = store.roi_per_campaign().unwrap();

    let c1 = preview.iter().find(|p| p.campaign_name == "C1").unwrap();
    assert_eq!(c1.budget, Some(150.0));
    assert_eq!(c1.total_revenue, Some(0.0));
    assert_eq!(c1.profit_or_loss, Some(-150.0));
    assert_eq!(c1.roi_percentage, Some(-100.0));

    let acme = preview.iter().find(|p| p.campaign_name == "Acme").unwrap();
    assert_eq!(acme.total_revenue, Some(5.0));
    assert_eq!(acme.profit_or_loss, Some(-195.0));
    assert_eq!(acme.roi_percentage, Some(-97.5));
}

/// Previews over tables the script never created surface as errors.
#[test]
fn previews_fail_without_script_tables() {
    let store = store();
    assert!(store.leads_per_campaign().is_err());
    assert!(store.roi_per_campaign().is_err());
}
