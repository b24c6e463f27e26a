//! HTTP-level tests for the GLPI client against a mock server

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use mockito::{Matcher, Mock, ServerGuard};
use reqwest::Method;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use glpidesk::client::models::{CategoryUpdate, NewTicket, Upload};
use glpidesk::client::{
    CategoryApi, DirectoryApi, DocumentApi, ReportApi, TicketApi, TicketFilters,
};
use glpidesk::{
    ApiError, AttachError, Config, Error, ErrorKind, GlpiClient, RequestOptions, Role, Session,
    SessionPhase,
};

const APP_TOKEN: &str = "app-token";
const SESSION_TOKEN: &str = "tok-1";

fn config_for(url: &str) -> Config {
    let mut config = Config::new(format!("{}/apirest.php/", url));
    config.app_token = Some(APP_TOKEN.to_string());
    config.request.max_retries = 0;
    config.request.retry_backoff_ms = 10;
    config.request.requests_per_second = 100;
    config
}

async fn mock_init_session(server: &mut ServerGuard) -> Mock {
    server
        .mock("GET", "/apirest.php/initSession")
        .match_query(Matcher::UrlEncoded(
            "get_full_session".into(),
            "true".into(),
        ))
        // base64("maria:pw")
        .match_header("authorization", "Basic bWFyaWE6cHc=")
        .match_header("app-token", APP_TOKEN)
        .with_status(200)
        .with_body(
            json!({
                "session_token": SESSION_TOKEN,
                "session": {
                    "glpiID": 7,
                    "glpiname": "maria",
                    "glpiactiveprofile": {"id": 6, "name": "Technician"}
                }
            })
            .to_string(),
        )
        .create_async()
        .await
}

async fn signed_in_client(server: &mut ServerGuard) -> GlpiClient {
    let _init = mock_init_session(server).await;
    let client = GlpiClient::from_config(&config_for(&server.url())).unwrap();
    client.session().authenticate("maria", "pw").await.unwrap();
    client
}

/// Client with a restored session, for servers that cannot answer initSession
async fn client_with_session(api_url: &str) -> GlpiClient {
    let client = GlpiClient::from_config(&config_for(api_url)).unwrap();
    client
        .session()
        .restore(Session::new(
            SESSION_TOKEN,
            Utc::now() + chrono::Duration::hours(1),
            Role::User,
        ))
        .await;
    client
}

/// Raw HTTP server counting connections. Each request is answered with
/// `status` and `body` after `delay`; `None` never answers.
async fn counting_server(
    delay: Duration,
    reply: Option<(u16, &'static str)>,
) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                tokio::time::sleep(delay).await;
                match reply {
                    Some((status, body)) => {
                        let response = format!(
                            "HTTP/1.1 {} Status\r\ncontent-type: application/json\r\n\
                             content-length: {}\r\nconnection: close\r\n\r\n{}",
                            status,
                            body.len(),
                            body
                        );
                        let _ = stream.write_all(response.as_bytes()).await;
                    }
                    // Hold the connection open without answering
                    None => tokio::time::sleep(Duration::from_secs(30)).await,
                }
            });
        }
    });

    (url, accepted)
}

#[tokio::test]
async fn sign_in_reads_role_from_profile() {
    let mut server = mockito::Server::new_async().await;
    let client = signed_in_client(&mut server).await;

    let session = client.session().current().await.unwrap();
    assert_eq!(session.token, SESSION_TOKEN);
    assert_eq!(session.role, Role::Admin);
    assert_eq!(session.user.unwrap().login, "maria");
    assert_eq!(client.session().phase().await, SessionPhase::Authenticated);
}

#[tokio::test]
async fn rejected_sign_in_is_coarse() {
    let mut server = mockito::Server::new_async().await;
    let _init = server
        .mock("GET", "/apirest.php/initSession")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"["ERROR_GLPI_LOGIN","Incorrect username or password"]"#)
        .create_async()
        .await;

    let client = GlpiClient::from_config(&config_for(&server.url())).unwrap();
    let err = client
        .session()
        .authenticate("maria", "wrong")
        .await
        .unwrap_err();

    assert_eq!(err, glpidesk::AuthError::Rejected);
    assert!(client.session().current().await.is_none());
}

#[tokio::test]
async fn requests_carry_session_and_app_tokens() {
    let mut server = mockito::Server::new_async().await;
    let client = signed_in_client(&mut server).await;

    let ticket = server
        .mock("GET", "/apirest.php/Ticket/3")
        .match_query(Matcher::UrlEncoded(
            "expand_dropdowns".into(),
            "true".into(),
        ))
        .match_header("session-token", SESSION_TOKEN)
        .match_header("app-token", APP_TOKEN)
        .with_status(200)
        .with_body(r#"{"id": 3, "name": "Sem acesso ao Moodle", "status": 2, "priority": 4}"#)
        .create_async()
        .await;

    let fetched = client.get_ticket(3).await.unwrap();

    assert_eq!(fetched.name, "Sem acesso ao Moodle");
    assert_eq!(fetched.status_label(), "assigned");
    assert_eq!(fetched.priority_label(), "high");
    ticket.assert_async().await;
}

#[tokio::test]
async fn category_reads_are_cached_until_an_update() {
    let mut server = mockito::Server::new_async().await;
    let client = signed_in_client(&mut server).await;

    let list = server
        .mock("GET", "/apirest.php/ITILCategory")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("range".into(), "0-999".into()),
            Matcher::UrlEncoded("expand_dropdowns".into(), "true".into()),
        ]))
        .with_status(200)
        .with_body(r#"[{"id": 1, "name": "Moodle", "completename": "Moodle"}]"#)
        .expect(2)
        .create_async()
        .await;
    let update = server
        .mock("PUT", "/apirest.php/ITILCategory/1")
        .match_body(Matcher::PartialJson(json!({"input": {"name": "AVA"}})))
        .with_status(200)
        .with_body(r#"[{"1": true, "message": ""}]"#)
        .create_async()
        .await;

    assert_eq!(client.get_categories().await.unwrap().len(), 1);
    assert_eq!(client.get_categories().await.unwrap().len(), 1);

    client
        .update_category(
            1,
            CategoryUpdate {
                name: Some("AVA".to_string()),
                ..CategoryUpdate::default()
            },
        )
        .await
        .unwrap();
    client.get_categories().await.unwrap();

    list.assert_async().await;
    update.assert_async().await;
}

#[tokio::test]
async fn creating_a_ticket_invalidates_ticket_listings() {
    let mut server = mockito::Server::new_async().await;
    let client = signed_in_client(&mut server).await;

    let list = server
        .mock("GET", "/apirest.php/Ticket")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"id": 41, "name": "Senha", "status": 1, "priority": 3}]"#)
        .expect(2)
        .create_async()
        .await;
    let create = server
        .mock("POST", "/apirest.php/Ticket")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "input": {"name": "Sem acesso", "content": "Não consigo entrar"}
        })))
        .with_status(201)
        .with_body(r#"{"id": 42, "message": "Item successfully added: Ticket (42)"}"#)
        .create_async()
        .await;

    let filters = TicketFilters::new();
    client.get_tickets(&filters).await.unwrap();
    client.get_tickets(&filters).await.unwrap();

    let id = client
        .create_ticket(NewTicket::new("Sem acesso", "Não consigo entrar"))
        .await
        .unwrap();
    assert_eq!(id, 42);

    client.get_tickets(&filters).await.unwrap();

    list.assert_async().await;
    create.assert_async().await;
}

#[tokio::test]
async fn filtered_listing_uses_search_engine() {
    let mut server = mockito::Server::new_async().await;
    let client = signed_in_client(&mut server).await;

    let search = server
        .mock("GET", "/apirest.php/search/Ticket")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("criteria[0][field]".into(), "12".into()),
            Matcher::UrlEncoded("criteria[0][searchtype]".into(), "equals".into()),
            Matcher::UrlEncoded("criteria[0][value]".into(), "2".into()),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "totalcount": 1,
                "count": 1,
                "data": [{"2": 5, "1": "Erro no boleto", "12": 2, "3": "5"}]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let tickets = client
        .get_tickets(&TicketFilters::new().status(2))
        .await
        .unwrap();

    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].id, 5);
    assert_eq!(tickets[0].status_label(), "assigned");
    assert_eq!(tickets[0].priority_label(), "very_high");
    search.assert_async().await;
}

#[tokio::test]
async fn ticket_details_and_report() {
    let mut server = mockito::Server::new_async().await;
    let client = signed_in_client(&mut server).await;

    let _ticket = server
        .mock("GET", "/apirest.php/Ticket/5")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"id": 5, "name": "Erro", "status": 5, "priority": 3}"#)
        .create_async()
        .await;
    let _followups = server
        .mock("GET", "/apirest.php/Ticket/5/ITILFollowup")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"[{"id": 9, "items_id": 5, "content": "Resolvido", "is_private": 0},
                {"id": 8, "items_id": 5, "content": "Verificando", "is_private": 1}]"#,
        )
        .create_async()
        .await;
    let _documents = server
        .mock("GET", "/apirest.php/Ticket/5/Document")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"id": 77, "name": "print.png", "filename": "print.png"}]"#)
        .create_async()
        .await;
    let _list = server
        .mock("GET", "/apirest.php/Ticket")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"[{"id": 5, "status": 5, "priority": 3, "itilcategories_id": "Moodle"},
                {"id": 6, "status": 1, "priority": 6}]"#,
        )
        .create_async()
        .await;

    let details = client.get_ticket_details(5).await.unwrap();
    assert_eq!(details.ticket.id, 5);
    assert_eq!(
        details.followups.iter().map(|f| f.id).collect::<Vec<_>>(),
        vec![8, 9]
    );
    assert!(details.followups[0].is_private);
    assert_eq!(details.documents[0].id, 77);

    let report = client.ticket_report(&TicketFilters::new()).await.unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.open, 1);
    assert_eq!(report.by_priority["major"], 1);
    assert_eq!(report.by_category["Moodle"], 1);
}

#[tokio::test]
async fn unauthorized_response_normalizes_and_signs_out() {
    let mut server = mockito::Server::new_async().await;
    let client = signed_in_client(&mut server).await;

    let _rejected = server
        .mock("GET", "/apirest.php/Ticket/9")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"["ERROR_SESSION_TOKEN_INVALID","session_token seems invalid"]"#)
        .create_async()
        .await;
    let _kill = server
        .mock("GET", "/apirest.php/killSession")
        .with_status(200)
        .create_async()
        .await;

    let err = client.get_ticket(9).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);

    let normalized = err.normalize("load ticket");
    assert_eq!(normalized.message, ErrorKind::Auth.user_message());
    assert!(!normalized.message.contains("ERROR_SESSION_TOKEN_INVALID"));

    for _ in 0..200 {
        if client.session().current().await.is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(client.session().current().await.is_none());
    assert_eq!(
        client.session().phase().await,
        SessionPhase::Unauthenticated
    );
}

#[tokio::test]
async fn status_codes_map_to_error_kinds() {
    let mut server = mockito::Server::new_async().await;
    let client = signed_in_client(&mut server).await;

    let cases = [
        (403, r#"["ERROR_RIGHT_MISSING","You don't have permission"]"#, ErrorKind::Permission),
        (404, r#"["ERROR_ITEM_NOT_FOUND","Item not found"]"#, ErrorKind::NotFound),
        (400, r#"["ERROR_BAD_ARRAY","input is invalid"]"#, ErrorKind::Validation),
        (500, "Internal Server Error", ErrorKind::Server),
    ];

    for (i, (status, body, kind)) in cases.into_iter().enumerate() {
        let endpoint = format!("/apirest.php/Ticket/{}", 100 + i);
        let mock = server
            .mock("GET", endpoint.as_str())
            .match_query(Matcher::Any)
            .with_status(status)
            .with_body(body)
            .expect(1)
            .create_async()
            .await;

        let err = client.get_ticket(100 + i as u64).await.unwrap_err();
        assert_eq!(err.kind(), kind, "status {}", status);
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn requests_without_session_fail_fast() {
    let mut server = mockito::Server::new_async().await;
    let never = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = GlpiClient::from_config(&config_for(&server.url())).unwrap();
    let err = client.get_categories().await.unwrap_err();

    assert!(matches!(err, Error::Api(ApiError::NoSession)));
    assert_eq!(err.kind(), ErrorKind::Auth);
    never.assert_async().await;
}

#[tokio::test]
async fn connection_refused_is_network() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_with_session(&format!("http://{}", addr)).await;
    let err = client.get_ticket(1).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
}

#[tokio::test]
async fn silent_server_times_out() {
    // Accepts connections but never answers
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let client = client_with_session(&format!("http://{}", addr)).await;
    let err = client
        .request_value(
            Method::GET,
            "Ticket/1",
            RequestOptions::new().timeout(Duration::from_millis(200)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Timeout));
    assert_eq!(err.kind(), ErrorKind::Timeout);
    drop(listener);
}

#[tokio::test]
async fn cancelled_request_reports_timeout_kind() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let client = client_with_session(&format!("http://{}", addr)).await;
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = client
        .request_value(
            Method::GET,
            "Ticket/1",
            RequestOptions::new()
                .timeout(Duration::from_secs(5))
                .cancel(token),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Cancelled));
    assert_eq!(err.kind(), ErrorKind::Timeout);
    drop(listener);
}

#[tokio::test]
async fn failed_link_keeps_uploaded_document() {
    let mut server = mockito::Server::new_async().await;
    let client = signed_in_client(&mut server).await;

    let upload = server
        .mock("POST", "/apirest.php/Document")
        .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
        .match_body(Matcher::Regex("uploadManifest".into()))
        .with_status(201)
        .with_body(r#"{"id": 77, "message": ""}"#)
        .create_async()
        .await;
    let link = server
        .mock("POST", "/apirest.php/Document_Item")
        .match_body(Matcher::PartialJson(json!({
            "input": {"documents_id": 77, "items_id": 5, "itemtype": "Ticket"}
        })))
        .with_status(400)
        .with_body(r#"["ERROR_GLPI_ADD","Document_Item could not be added"]"#)
        .create_async()
        .await;

    let err = client
        .attach_to_ticket(
            Upload::new("print.png", b"not really a png".to_vec()).mime("image/png"),
            5,
            Some(7),
        )
        .await
        .unwrap_err();

    match &err {
        Error::Attach(attach @ AttachError::LinkFailed { document_id, .. }) => {
            assert_eq!(*document_id, 77);
            assert_eq!(attach.orphaned_document(), Some(77));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.kind(), ErrorKind::Validation);
    upload.assert_async().await;
    link.assert_async().await;
}

#[tokio::test]
async fn failed_upload_is_reported_as_upload_failure() {
    let mut server = mockito::Server::new_async().await;
    let client = signed_in_client(&mut server).await;

    let _upload = server
        .mock("POST", "/apirest.php/Document")
        .with_status(500)
        .create_async()
        .await;
    let link = server
        .mock("POST", "/apirest.php/Document_Item")
        .expect(0)
        .create_async()
        .await;

    let err = client
        .attach_to_ticket(Upload::new("print.png", vec![1, 2, 3]), 5, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Attach(AttachError::UploadFailed(_))));
    assert_eq!(err.kind(), ErrorKind::Server);
    link.assert_async().await;
}

#[tokio::test]
async fn reads_retry_up_to_the_limit_and_writes_never_do() {
    let (url, accepted) = counting_server(Duration::ZERO, None).await;
    let mut config = config_for(&url);
    config.request.max_retries = 2;
    let client = GlpiClient::from_config(&config).unwrap();
    client
        .session()
        .restore(Session::new(
            SESSION_TOKEN,
            Utc::now() + chrono::Duration::hours(1),
            Role::User,
        ))
        .await;
    let quick = || RequestOptions::new().timeout(Duration::from_millis(150));

    let err = client
        .request_value(Method::GET, "Ticket/1", quick())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Timeout));
    assert_eq!(accepted.load(Ordering::SeqCst), 3);

    let err = client
        .request_value(Method::POST, "Ticket", quick().body(json!({"input": {}})))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Timeout));
    assert_eq!(accepted.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn cancelled_reads_are_not_retried() {
    let (url, accepted) = counting_server(Duration::ZERO, None).await;
    let mut config = config_for(&url);
    config.request.max_retries = 2;
    let client = GlpiClient::from_config(&config).unwrap();
    client
        .session()
        .restore(Session::new(
            SESSION_TOKEN,
            Utc::now() + chrono::Duration::hours(1),
            Role::User,
        ))
        .await;

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = client
        .request_value(Method::GET, "Ticket/1", RequestOptions::new().cancel(token))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Cancelled));
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejection_of_a_replaced_token_keeps_the_new_session() {
    let (url, _) = counting_server(
        Duration::from_millis(300),
        Some((401, r#"["ERROR_SESSION_TOKEN_INVALID","session_token seems invalid"]"#)),
    )
    .await;
    let client = client_with_session(&url).await;

    let in_flight = client.request_value(Method::GET, "Ticket/1", RequestOptions::new());
    let replace = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        client
            .session()
            .restore(Session::new(
                "tok-2",
                Utc::now() + chrono::Duration::hours(1),
                Role::User,
            ))
            .await;
    };
    let (result, ()) = tokio::join!(in_flight, replace);
    assert!(matches!(result, Err(ApiError::Unauthorized)));

    tokio::time::sleep(Duration::from_millis(50)).await;
    let current = client.session().current().await.unwrap();
    assert_eq!(current.token, "tok-2");
    assert!(current.refresh_error.is_none());
    assert_eq!(client.session().phase().await, SessionPhase::Authenticated);
}

#[tokio::test]
async fn failed_update_still_invalidates_categories() {
    let mut server = mockito::Server::new_async().await;
    let client = signed_in_client(&mut server).await;

    let list = server
        .mock("GET", "/apirest.php/ITILCategory")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"id": 1, "name": "Moodle", "completename": "Moodle"}]"#)
        .expect(2)
        .create_async()
        .await;
    let _update = server
        .mock("PUT", "/apirest.php/ITILCategory/1")
        .with_status(502)
        .with_body("Bad Gateway")
        .create_async()
        .await;

    client.get_categories().await.unwrap();
    let err = client
        .update_category(
            1,
            CategoryUpdate {
                name: Some("AVA".to_string()),
                ..CategoryUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Server);

    client.get_categories().await.unwrap();
    list.assert_async().await;
}

#[tokio::test]
async fn cached_reads_need_a_session() {
    let mut server = mockito::Server::new_async().await;
    let client = signed_in_client(&mut server).await;
    let _kill = server
        .mock("GET", "/apirest.php/killSession")
        .with_status(200)
        .create_async()
        .await;

    let users = server
        .mock("GET", "/apirest.php/User")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"id": 7, "name": "maria"}]"#)
        .expect(1)
        .create_async()
        .await;

    assert_eq!(client.get_users().await.unwrap().len(), 1);
    client.sign_out().await;

    let err = client.get_users().await.unwrap_err();
    assert!(matches!(err, Error::Api(ApiError::NoSession)));
    assert!(client.cache().is_empty());
    users.assert_async().await;
}

#[tokio::test]
async fn cached_reads_are_not_shared_between_users() {
    let mut server = mockito::Server::new_async().await;
    let client = signed_in_client(&mut server).await;
    let _kill = server
        .mock("GET", "/apirest.php/killSession")
        .with_status(200)
        .create_async()
        .await;
    let _joao = server
        .mock("GET", "/apirest.php/initSession")
        .match_query(Matcher::Any)
        // base64("joao:pw")
        .match_header("authorization", "Basic am9hbzpwdw==")
        .with_status(200)
        .with_body(
            json!({
                "session_token": "tok-2",
                "session": {
                    "glpiID": 9,
                    "glpiname": "joao",
                    "glpiactiveprofile": {"id": 1, "name": "Self-Service"}
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let users = server
        .mock("GET", "/apirest.php/User")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"id": 7, "name": "maria"}]"#)
        .expect(2)
        .create_async()
        .await;

    client.get_users().await.unwrap();
    client.session().sign_out().await;
    let joao = client.session().authenticate("joao", "pw").await.unwrap();
    assert_eq!(joao.role, Role::User);

    client.get_users().await.unwrap();
    users.assert_async().await;
}
