use roomdb::wire::ErrorResponse;
use roomdb::{Client, Database, RawValue, RemoteClient, RoomError, Template, Term, server};
use serde_json::json;

async fn serve(db: Database) -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, server::router(db)).await.unwrap();
    });
    port
}

#[tokio::test]
async fn remote_client_round_trip() {
    let db = Database::new();
    let port = serve(db.clone()).await;
    let mut client = RemoteClient::new("127.0.0.1", port, "remote");

    client
        .assert("#gorog is a barbarian at 40, 50")
        .unwrap()
        .assert(Template::new("_ has _ gold").fill(Term::identifier("gorog")).fill(12.5))
        .unwrap();
    let outcome = client.flush_changes().await.unwrap();
    assert_eq!(outcome.asserted, 2);
    assert!(!client.buffer().has_pending());

    // the server stored them under the remote client's id
    assert_eq!(db.store().unwrap().get("#gorog has 12.5 gold").unwrap().asserter(), "remote");

    let selection = client.select(["$who has $amount gold"]).await.unwrap();
    assert_eq!(selection.count(), 1);
    let solution = &selection.solutions()[0];
    assert_eq!(solution["who"], RawValue::Identifier("gorog".into()));
    assert_eq!(solution["amount"], 12.5);

    client.retract("#gorog is a barbarian at $x, $y").unwrap();
    let outcome = client.flush_changes().await.unwrap();
    assert_eq!(outcome.retracted, 1);
    assert_eq!(client.get_all_facts().await.unwrap(), vec!["#gorog has 12.5 gold"]);

    assert_eq!(client.immediately_retract_everything_about("gorog").await.unwrap(), 1);
    assert!(client.get_all_facts().await.unwrap().is_empty());
}

#[tokio::test]
async fn forget_by_asserter_over_http() {
    let db = Database::new();
    let port = serve(db.clone()).await;
    let mut mine = RemoteClient::new("127.0.0.1", port, "mine");
    let mut theirs = RemoteClient::new("127.0.0.1", port, "theirs");
    mine.immediately_assert("#a is mine").await.unwrap();
    theirs.immediately_assert("#b is theirs").await.unwrap();
    assert_eq!(mine.immediately_retract_everything_asserted_by_me().await.unwrap(), 1);
    assert_eq!(theirs.get_all_facts().await.unwrap(), vec!["#b is theirs"]);
}

#[tokio::test]
async fn failed_flush_keeps_pending_mutations() {
    // grab a free port and release it so nothing is listening there
    let port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut client = RemoteClient::new("127.0.0.1", port, "offline");
    client.assert("#a is lost").unwrap();
    let err = client.flush_changes().await.unwrap_err();
    assert!(matches!(err, RoomError::Transport(_)));
    assert_eq!(client.buffer().pending_asserts().len(), 1);
}

#[tokio::test]
async fn validation_errors_are_bad_requests() {
    let port = serve(Database::new()).await;
    let http = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{}/facts", port);

    let response = http.get(&base).query(&[("query", "not json")]).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.status, "error");

    let request = json!({
        "clientId": "raw",
        "assertions": [[{"variable": "x"}, {"word": " "}, {"word": "is"}]]
    });
    let response = http.put(&base).json(&request).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let request = json!({"clientId": "raw", "assertions": [[{"mystery": 1}]]});
    let response = http.put(&base).json(&request).send().await.unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn broken_invariants_are_server_errors() {
    let port = serve(Database::new()).await;
    let mut client = RemoteClient::new("127.0.0.1", port, "remote");
    let http = reqwest::Client::new();
    let request = json!({"clientId": "raw", "retractions": [[{"hole": true}]]});
    let response = http
        .put(format!("http://127.0.0.1:{}/facts", port))
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert!(client.get_all_facts().await.unwrap().is_empty());
}
