//! Functional tests that create, update and purge data
//!
//! Every resource is named with the functest prefix and purged at the end.

use glpidesk::client::models::{CategoryUpdate, NewCategory, NewTicket, Upload};
use glpidesk::client::{CategoryApi, DocumentApi, FollowupApi, TicketApi};

use super::FunctionalTestContext;

#[tokio::test]
#[cfg_attr(not(feature = "functional-tests"), ignore)]
async fn test_category_lifecycle() {
    let ctx = FunctionalTestContext::new();
    let client = ctx.signed_in().await;
    let name = ctx.resource_name("category");

    let id = client
        .create_category(NewCategory::new(&name))
        .await
        .unwrap();
    assert!(client.get_categories().await.unwrap().iter().any(|c| c.id == id));

    let renamed = format!("{}-renamed", name);
    client
        .update_category(
            id,
            CategoryUpdate {
                name: Some(renamed.clone()),
                ..CategoryUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(client.get_category(id).await.unwrap().name, renamed);

    client.delete_category(id).await.unwrap();
    assert!(!client.get_categories().await.unwrap().iter().any(|c| c.id == id));
}

#[tokio::test]
#[cfg_attr(not(feature = "functional-tests"), ignore)]
async fn test_ticket_followup_and_attachment() {
    let ctx = FunctionalTestContext::new();
    let client = ctx.signed_in().await;
    let name = ctx.resource_name("ticket");

    let ticket_id = client
        .create_ticket(NewTicket::new(&name, "Created by the functional test suite"))
        .await
        .unwrap();

    client
        .add_followup(ticket_id, "Functional test followup", false)
        .await
        .unwrap();
    let document_id = client
        .attach_to_ticket(
            Upload::new(format!("{}.txt", name), b"functional test".to_vec()).mime("text/plain"),
            ticket_id,
            None,
        )
        .await
        .unwrap();

    let details = client.get_ticket_details(ticket_id).await.unwrap();
    assert_eq!(details.followups.len(), 1);
    assert!(details.documents.iter().any(|d| d.id == document_id));

    client.delete_ticket(ticket_id).await.unwrap();
}
