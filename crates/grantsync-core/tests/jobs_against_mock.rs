//! Integration test: run each job against a local mock of the platform API and
//! check what was sent, what was skipped and what came back into the rows.

mod common;

use common::mock_platform::{self, MockPlatform};
use grantsync_core::client::PlatformClient;
use grantsync_core::config::{
    Endpoints, PipelineDefinition, PipelineStages, RetryConfig, Settings,
};
use grantsync_core::jobs::columns::ID;
use grantsync_core::jobs::{
    add_organisations, create_grantees, create_grants, update_grantees, update_grants, JobOptions,
};
use grantsync_core::records::{self, Table};
use grantsync_core::report::Step;

const CREATE_GRANTEE: &str = "f/f-1/nonprofits";
const CONTACTS: &str = "f/f-1/contacts/search";
const GRANTS: &str = "f/f-1/grants/search";
const CREATE_GRANT: &str = "f/f-1/grants";
const GRANT_METADATA: &str = "grants/metadata";

fn settings(server: &MockPlatform) -> Settings {
    let base = server.base();
    let mut s = Settings {
        foundation_id: "f-1".to_string(),
        bearer_token: "test-token".to_string(),
        connect_timeout_secs: 2,
        timeout_secs: 5,
        endpoints: Endpoints {
            create_grantee: format!("{base}f/{{foundation_id}}/nonprofits"),
            update_grantee: format!("{base}nonprofits/{{nonprofit_id}}/custom"),
            get_contacts: format!("{base}f/{{}}/contacts/search"),
            get_grants: format!("{base}f/{{foundation_id}}/grants/search"),
            create_grant: format!("{base}f/{{foundation_id}}/grants"),
            update_grant_metadata: format!("{base}grants/metadata"),
        },
        retry: Some(RetryConfig {
            max_attempts: 3,
            base_delay_secs: 0.01,
            max_delay_secs: 1,
        }),
        ..Settings::default()
    };
    s.lookups
        .support_types
        .insert("SAFE".to_string(), "t-safe".to_string());
    s.lookups
        .pipelines
        .insert("Main".to_string(), "p-main".to_string());
    s.lookups.pipeline_stages.insert(
        "Main".to_string(),
        PipelineDefinition {
            stages: PipelineStages::Map([("Active grant".to_string(), "s-active".to_string())].into()),
        },
    );
    s
}

fn table(csv: &str) -> Table {
    records::read_from(csv.as_bytes()).unwrap()
}

#[test]
fn create_grantees_writes_ids_and_failures_back() {
    let server = mock_platform::start(vec![(CREATE_GRANTEE, vec![(200, r#"{"id":"np-1"}"#)])]);
    let settings = settings(&server);
    let client = PlatformClient::from_settings(&settings);
    let mut t = table("Name,LIF Primary Lead Name\nAcme,Seth Andrews\nBeta,\n");

    let report = create_grantees::run(&settings, &client, &mut t, JobOptions::default()).unwrap();

    assert_eq!(t.rows[0].value(ID), Some("np-1"));
    assert_eq!(t.rows[1].value(ID), Some(create_grantees::FAILED_ID));
    assert!(t.headers.iter().any(|h| h == ID));
    assert_eq!(report.count(Step::Create), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].step, Step::Validate);

    let sent = server.requests_to(CREATE_GRANTEE);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body["legalName"], "Acme");
    assert_eq!(sent[0].body["primaryContactName"], "Seth Andrews");
}

#[test]
fn throttled_create_is_retried() {
    let server = mock_platform::start(vec![(
        CREATE_GRANTEE,
        vec![(503, ""), (200, r#"{"id":"np-2"}"#)],
    )]);
    let settings = settings(&server);
    let client = PlatformClient::from_settings(&settings);
    let mut t = table("Name,LIF Primary Lead Name\nAcme,Seth Andrews\n");

    let report = create_grantees::run(&settings, &client, &mut t, JobOptions::default()).unwrap();

    assert_eq!(server.requests_to(CREATE_GRANTEE).len(), 2);
    assert_eq!(t.rows[0].value(ID), Some("np-2"));
    assert!(report.failed.is_empty());
}

#[test]
fn client_error_is_not_retried() {
    let server = mock_platform::start(vec![(
        CREATE_GRANTEE,
        vec![(400, r#"{"error":"legalName taken"}"#)],
    )]);
    let settings = settings(&server);
    let client = PlatformClient::from_settings(&settings);
    let mut t = table("Name,LIF Primary Lead Name\nAcme,Seth Andrews\n");

    let report = create_grantees::run(&settings, &client, &mut t, JobOptions::default()).unwrap();

    assert_eq!(server.requests_to(CREATE_GRANTEE).len(), 1);
    assert_eq!(t.rows[0].value(ID), Some(create_grantees::FAILED_ID));
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].message.contains("legalName taken"));
}

#[test]
fn add_organisations_skips_existing_and_updates_new() {
    let server = mock_platform::start(vec![
        (
            CONTACTS,
            vec![(
                200,
                r#"{"searchResponse":{"responses":[
                    {"nonprofitId":"np-old","customFields":{"Affinity ID-4jS8olxc":"100"}}
                ]}}"#,
            )],
        ),
        (CREATE_GRANTEE, vec![(200, r#"{"id":"np-new"}"#)]),
        ("nonprofits/np-new/custom", vec![(204, "")]),
    ]);
    let settings = settings(&server);
    let client = PlatformClient::from_settings(&settings);
    let t = table(
        "Name,Organization Id,Website,Tags\n\
         Old Org,100,https://old.org,Non-grantee\n\
         New Org,200,https://new.org,Non-grantee\n\
         New Org again,200,https://new.org,Non-grantee\n",
    );

    let report = add_organisations::run(&settings, &client, &t, 2, JobOptions::default()).unwrap();

    assert_eq!(server.requests_to(CREATE_GRANTEE).len(), 1);
    let updates = server.requests_to("nonprofits/np-new/custom");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].body["customFields"]["Affinity ID-4jS8olxc"], "200");
    assert_eq!(updates[0].body["website"], "https://new.org");
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(report.count(Step::Create), 1);
    assert_eq!(report.count(Step::Update), 1);
    assert!(report.failed.is_empty());
}

#[test]
fn update_grantees_only_touches_rows_with_an_id() {
    let server = mock_platform::start(vec![("nonprofits/np-1/custom", vec![(204, "")])]);
    let settings = settings(&server);
    let client = PlatformClient::from_settings(&settings);
    let t = table(
        "Name,id,Region,LIF Primary Lead Name\n\
         Acme,np-1,East Africa,Seth Andrews\n\
         Beta,Failed,West Africa,Seth Andrews\n\
         Gamma,,West Africa,Seth Andrews\n",
    );

    let report = update_grantees::run(&settings, &client, &t, JobOptions::default()).unwrap();

    let sent = server.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].path, "/nonprofits/np-1/custom");
    assert_eq!(sent[0].body["customFields"]["Region-ObIfV84Z"], "East Africa");
    assert_eq!(report.count(Step::Update), 1);
    assert_eq!(report.skipped.len(), 2);
}

#[test]
fn create_grants_skips_existing_and_duplicate_names() {
    let server = mock_platform::start(vec![
        (
            CONTACTS,
            vec![(
                200,
                r#"{"searchResponse":{"responses":[
                    {"nonprofitId":"np-1","customFields":{"Affinity ID-4jS8olxc":4711}}
                ]}}"#,
            )],
        ),
        (GRANTS, vec![(200, r#"{"responses":[{"id":"g-1","name":"Acme 2022"}]}"#)]),
        (CREATE_GRANT, vec![(200, r#"{"id":"g-2"}"#)]),
    ]);
    let settings = settings(&server);
    let client = PlatformClient::from_settings(&settings);
    let t = table(
        "Name,Organization Id,Support type,Stage,Pipeline,Amount\n\
         Acme 2022,4711,SAFE,Active grant,Main,\"1,000\"\n\
         Acme 2023,4711,S.A.F.E,Active grant,Main,\"2,000\"\n\
         Acme 2023,4711,SAFE,Active grant,Main,\"2,000\"\n\
         Acme 2024,4711,,Active grant,Main,\n",
    );

    let report = create_grants::run(&settings, &client, &t, JobOptions::default()).unwrap();

    let created = server.requests_to(CREATE_GRANT);
    assert_eq!(created.len(), 1);
    let proposal = &created[0].body["grantProposalSubmission"];
    assert_eq!(proposal["name"], "Acme 2023");
    assert_eq!(proposal["nonprofitId"], "np-1");
    assert_eq!(proposal["pipelineId"], "p-main");
    assert_eq!(proposal["additionalInfo"]["customGrantTypeId"], "t-safe");
    assert_eq!(proposal["awardedAmount"], 2000.0);
    assert_eq!(created[0].body["grantPayments"].as_array().map(Vec::len), Some(1));

    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.succeeded[0].id.as_deref(), Some("g-2"));
    assert_eq!(report.skipped.len(), 3);
}

#[test]
fn update_grants_sends_stage_metadata_for_matched_rows() {
    let server = mock_platform::start(vec![
        (
            GRANTS,
            vec![(
                200,
                r#"{"responses":[
                    {"id":"g-1","name":"Acme 2023","nonprofitId":"np-1"},
                    {"id":"g-2","name":"Beta 2023","nonprofitId":"np-2"}
                ]}"#,
            )],
        ),
        (GRANT_METADATA, vec![(200, "{}")]),
    ]);
    let settings = settings(&server);
    let client = PlatformClient::from_settings(&settings);
    let t = table(
        "Name,Pipeline,Stage\n\
         Acme 2023,Main,Active grant\n\
         Beta 2023,Main,Declined\n\
         Gamma 2023,Main,Active grant\n",
    );

    let report = update_grants::run(&settings, &client, &t, JobOptions::default()).unwrap();

    let sent = server.requests_to(GRANT_METADATA);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body["id"], "g-1");
    assert_eq!(sent[0].body["StageId"], "s-active");
    assert_eq!(sent[0].body["pipelineId"], "p-main");

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].label, "Beta 2023");
    assert_eq!(report.failed[0].step, Step::Mapping);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].label, "Gamma 2023");
}

#[test]
fn dry_run_sends_lookups_but_no_writes() {
    let server = mock_platform::start(vec![
        (CONTACTS, vec![(200, r#"{"searchResponse":{"responses":[]}}"#)]),
        (GRANTS, vec![(200, r#"{"responses":[]}"#)]),
    ]);
    let settings = settings(&server);
    let client = PlatformClient::from_settings(&settings);
    let t = table("Name,Support type,Stage\nAcme 2023,SAFE,Proposal\n");

    let report = create_grants::run(&settings, &client, &t, JobOptions { dry_run: true }).unwrap();

    assert!(report.dry_run);
    assert_eq!(report.count(Step::Create), 1);
    assert!(server.requests_to(CREATE_GRANT).is_empty());
    assert_eq!(server.requests().len(), 2);
}

#[test]
fn failed_lookup_aborts_the_job() {
    let server = mock_platform::start(vec![(CONTACTS, vec![(401, "unauthorized")])]);
    let settings = settings(&server);
    let client = PlatformClient::from_settings(&settings);
    let t = table("Name,Support type\nAcme 2023,SAFE\n");

    assert!(create_grants::run(&settings, &client, &t, JobOptions::default()).is_err());
    assert!(server.requests_to(CREATE_GRANT).is_empty());
}

#[test]
fn create_grantees_dry_run_leaves_rows_alone() {
    let server = mock_platform::start(vec![(CREATE_GRANTEE, vec![(200, r#"{"id":"np-1"}"#)])]);
    let settings = settings(&server);
    let client = PlatformClient::from_settings(&settings);
    let mut t = table("Name,LIF Primary Lead Name\nAcme,Seth Andrews\n");

    let report = create_grantees::run(&settings, &client, &mut t, JobOptions { dry_run: true }).unwrap();

    assert!(server.requests().is_empty());
    assert!(!t.headers.iter().any(|h| h == ID));
    assert_eq!(t.rows[0].get(ID), None);
    assert_eq!(report.count(Step::Create), 1);
    assert_eq!(report.succeeded[0].id, None);
}

#[test]
fn add_organisations_records_failed_update_after_create() {
    let server = mock_platform::start(vec![
        (CONTACTS, vec![(200, r#"{"searchResponse":{"responses":[]}}"#)]),
        (CREATE_GRANTEE, vec![(200, r#"{"id":"np-new"}"#)]),
        ("nonprofits/np-new/custom", vec![(400, r#"{"error":"bad field"}"#)]),
    ]);
    let settings = settings(&server);
    let client = PlatformClient::from_settings(&settings);
    let t = table("Name,Organization Id,Website,Tags\nNew Org,200,https://new.org,Non-grantee\n");

    let report = add_organisations::run(&settings, &client, &t, 10, JobOptions::default()).unwrap();

    assert_eq!(server.requests_to("nonprofits/np-new/custom").len(), 1);
    assert_eq!(report.count(Step::Create), 1);
    assert_eq!(report.succeeded[0].id.as_deref(), Some("np-new"));
    assert_eq!(report.count(Step::Update), 0);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].step, Step::Update);
    assert!(report.failed[0].message.contains("bad field"));
}

#[test]
fn add_organisations_dry_run_dedups_like_a_real_run() {
    let server = mock_platform::start(vec![(
        CONTACTS,
        vec![(200, r#"{"searchResponse":{"responses":[]}}"#)],
    )]);
    let settings = settings(&server);
    let client = PlatformClient::from_settings(&settings);
    let t = table(
        "Name,Organization Id,Website,Tags\n\
         New Org,200,https://new.org,Non-grantee\n\
         New Org again,200,https://new.org,Non-grantee\n",
    );

    let report = add_organisations::run(&settings, &client, &t, 10, JobOptions { dry_run: true }).unwrap();

    assert_eq!(report.count(Step::Create), 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].label, "New Org again");
    assert_eq!(server.requests().len(), 1);
    assert_eq!(server.requests_to(CONTACTS).len(), 1);
}

#[test]
fn update_grants_reports_rows_without_a_name() {
    let server = mock_platform::start(vec![
        (GRANTS, vec![(200, r#"{"responses":[{"id":"g-1","name":"Acme 2023"}]}"#)]),
        (GRANT_METADATA, vec![(200, "{}")]),
    ]);
    let settings = settings(&server);
    let client = PlatformClient::from_settings(&settings);
    let t = table("Name,Pipeline,Stage\n ,Main,Active grant\n");

    let report = update_grants::run(&settings, &client, &t, JobOptions::default()).unwrap();

    assert!(server.requests_to(GRANT_METADATA).is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].step, Step::Validate);
    assert!(report.skipped.is_empty());
}
