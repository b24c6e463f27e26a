//! Expected failure scenarios against a real instance

use glpidesk::client::TicketApi;
use glpidesk::{AuthError, ErrorKind};

use super::FunctionalTestContext;

#[tokio::test]
#[cfg_attr(not(feature = "functional-tests"), ignore)]
async fn test_wrong_password_is_rejected() {
    let ctx = FunctionalTestContext::new();
    let client = ctx.client();

    let err = client
        .session()
        .authenticate(&ctx.login, "definitely-not-the-password")
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::Rejected);
}

#[tokio::test]
#[cfg_attr(not(feature = "functional-tests"), ignore)]
async fn test_missing_ticket_is_not_found() {
    let ctx = FunctionalTestContext::new();
    let client = ctx.signed_in().await;

    let err = client.get_ticket(u32::MAX as u64).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
#[cfg_attr(not(feature = "functional-tests"), ignore)]
async fn test_signed_out_client_fails_fast() {
    let ctx = FunctionalTestContext::new();
    let client = ctx.signed_in().await;
    client.session().sign_out().await;

    let err = client.get_ticket(1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
}
