use raspe_core::HttpConfig;
use raspe_harvest::{FetchOutcome, HttpMethod, HttpTransport, PageRequest, Query, Transport};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(query: Query) -> PageRequest {
    PageRequest::page(1, query)
}

#[tokio::test]
async fn get_sends_query_pairs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "vacina"))
        .and(query_param("sr", "26"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(
        format!("{}/search", server.uri()),
        HttpMethod::Get,
        &HttpConfig::default(),
    )
    .unwrap();

    let outcome = transport
        .send(&request(Query::new().with("q", "vacina").with("sr", 26)))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        FetchOutcome::Success {
            payload: b"<html>ok</html>".to_vec(),
            status: 200,
        }
    );
}

#[tokio::test]
async fn post_sends_form_body_and_default_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ajax"))
        .and(header("X-Requested-With", "XMLHttpRequest"))
        .and(body_string_contains("termo=dengue"))
        .and(body_string_contains("posicao=10"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fragment"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::with_headers(
        format!("{}/ajax", server.uri()),
        HttpMethod::Post,
        &HttpConfig::default(),
        &[("X-Requested-With", "XMLHttpRequest")],
    )
    .unwrap();

    let outcome = transport
        .send(&request(Query::new().with("termo", "dengue").with("posicao", 10)))
        .await
        .unwrap();
    assert!(matches!(outcome, FetchOutcome::Success { status: 200, .. }));
}

#[tokio::test]
async fn status_codes_are_classified() {
    let server = MockServer::start().await;
    Mock::given(path("/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .mount(&server)
        .await;
    Mock::given(path("/limited-no-hint"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;
    Mock::given(path("/broken"))
        .respond_with(ResponseTemplate::new(503).set_body_string("x".repeat(2000)))
        .mount(&server)
        .await;

    let config = HttpConfig::default();
    let send = |route: &str| {
        let transport =
            HttpTransport::new(format!("{}{route}", server.uri()), HttpMethod::Get, &config)
                .unwrap();
        async move { transport.send(&request(Query::new())).await.unwrap() }
    };

    assert_eq!(
        send("/limited").await,
        FetchOutcome::RateLimited {
            retry_after: Some(30)
        }
    );
    assert_eq!(
        send("/limited-no-hint").await,
        FetchOutcome::RateLimited { retry_after: None }
    );
    assert_eq!(
        send("/missing").await,
        FetchOutcome::ClientError {
            status: 404,
            body: "not here".into()
        }
    );
    match send("/broken").await {
        FetchOutcome::ServerError { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body.len(), 500);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_host_is_transport_failure() {
    // nothing listens on port 9 of localhost
    let transport =
        HttpTransport::new("http://127.0.0.1:9/", HttpMethod::Get, &HttpConfig::default())
            .unwrap();

    let outcome = transport.send(&request(Query::new())).await.unwrap();
    assert!(matches!(outcome, FetchOutcome::TransportFailure { .. }));
}

#[tokio::test]
async fn stalled_read_is_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = HttpConfig {
        read_timeout_secs: 1,
        ..HttpConfig::default()
    };
    let transport =
        HttpTransport::new(format!("{}/slow", server.uri()), HttpMethod::Get, &config).unwrap();

    let outcome = transport.send(&request(Query::new())).await.unwrap();
    assert!(
        matches!(outcome, FetchOutcome::TransportFailure { .. }),
        "{outcome:?}"
    );
}

#[tokio::test]
async fn get_url_shares_client_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/home"))
        .and(header("Referer", "https://portal/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("home"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::with_headers(
        format!("{}/search", server.uri()),
        HttpMethod::Get,
        &HttpConfig::default(),
        &[("Referer", "https://portal/")],
    )
    .unwrap();

    let outcome = transport.get_url(&format!("{}/home", server.uri())).await;
    assert_eq!(
        outcome,
        FetchOutcome::Success {
            payload: b"home".to_vec(),
            status: 200,
        }
    );
}
