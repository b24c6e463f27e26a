//! Read-only functional tests
//!
//! Safe to run against any environment.

use glpidesk::client::{CategoryApi, DirectoryApi, ReportApi, TicketApi, TicketFilters};
use glpidesk::SessionPhase;

use super::FunctionalTestContext;

#[tokio::test]
#[cfg_attr(not(feature = "functional-tests"), ignore)]
async fn test_sign_in_installs_session() {
    let ctx = FunctionalTestContext::new();
    let client = ctx.signed_in().await;

    assert_eq!(client.session().phase().await, SessionPhase::Authenticated);
    assert!(client.session().role().await.is_some());
}

#[tokio::test]
#[cfg_attr(not(feature = "functional-tests"), ignore)]
async fn test_list_categories_is_cached() {
    let ctx = FunctionalTestContext::new();
    let client = ctx.signed_in().await;

    let first = client.get_categories().await.unwrap();
    let second = client.get_categories().await.unwrap();

    assert_eq!(first, second);
    assert!(!client.cache().is_empty());
}

#[tokio::test]
#[cfg_attr(not(feature = "functional-tests"), ignore)]
async fn test_list_tickets_and_filter_by_status() {
    let ctx = FunctionalTestContext::new();
    let client = ctx.signed_in().await;

    client.get_tickets(&TicketFilters::new()).await.unwrap();

    let new_tickets = client
        .get_tickets(&TicketFilters::new().status(1))
        .await
        .unwrap();
    assert!(new_tickets.iter().all(|t| t.status_label() == "new"));
}

#[tokio::test]
#[cfg_attr(not(feature = "functional-tests"), ignore)]
async fn test_directory_reads() {
    let ctx = FunctionalTestContext::new();
    let client = ctx.signed_in().await;

    let users = client.get_users().await.unwrap();
    assert!(!users.is_empty());
    client.get_groups().await.unwrap();
}

#[tokio::test]
#[cfg_attr(not(feature = "functional-tests"), ignore)]
async fn test_ticket_report_totals_add_up() {
    let ctx = FunctionalTestContext::new();
    let client = ctx.signed_in().await;

    let report = client.ticket_report(&TicketFilters::new()).await.unwrap();
    assert_eq!(report.open + report.closed, report.total);
}
