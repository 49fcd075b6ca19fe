//! HTTP repository against a mock record service.

use std::time::Duration;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::json;
use telas_core::model::{ClientPatch, NewClient};
use telas_core::{
    ErrorCode, HttpRollRepository, NewRoll, RollFilter, RollPatch, RollRepository, ServiceConfig,
    TelasError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn repository(server: &MockServer) -> HttpRollRepository {
    let config = ServiceConfig::new(server.uri()).with_timeout(Duration::from_secs(5));
    HttpRollRepository::new(&config).unwrap()
}

fn roll_json(id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "cliente": 3,
        "numero_rollo": "12",
        "lote": null,
        "tipo_tela": "Gabardina",
        "color": "Azul",
        "fecha": "2024-03-15",
        "metraje": "100.00",
        "disponible": true,
        "resto_limpio": "0.00",
        "resto_sucio": 0
    })
}

// ==================== Client endpoint tests ====================

#[tokio::test]
async fn test_list_clients_sends_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clientes/"))
        .and(query_param("search", "ruiz"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 3, "nombre": "Textiles Ruiz", "created_at": "2024-05-01T12:30:00Z"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let clients = repository(&server)
        .await
        .list_clients(Some(" ruiz "))
        .await
        .unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].nombre, "Textiles Ruiz");
}

#[tokio::test]
async fn test_list_clients_tolerates_loose_created_at() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clientes/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "nombre": "Sin fecha"},
            {"id": 2, "nombre": "Nula", "created_at": null},
            {"id": 3, "nombre": "Local", "created_at": "2024-05-01T12:30:00.123456"}
        ])))
        .mount(&server)
        .await;

    let clients = repository(&server).await.list_clients(None).await.unwrap();
    assert_eq!(clients.len(), 3);
    assert_eq!(clients[0].created_at, None);
    assert_eq!(clients[1].created_at, None);
    assert_eq!(
        clients[2].created_at.unwrap().to_rfc3339(),
        "2024-05-01T12:30:00.123456+00:00"
    );
}

#[tokio::test]
async fn test_create_and_patch_client() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/clientes/"))
        .and(body_json(json!({"nombre": "Sol"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!(
            {"id": 9, "nombre": "Sol", "created_at": "2024-05-01T12:30:00Z"}
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/clientes/9/"))
        .and(body_json(json!({"nombre": "Sol SRL"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(
            {"id": 9, "nombre": "Sol SRL", "created_at": "2024-05-01T12:30:00Z"}
        )))
        .expect(1)
        .mount(&server)
        .await;

    let repo = repository(&server).await;
    let client = repo
        .create_client(&NewClient {
            nombre: "Sol".into(),
        })
        .await
        .unwrap();
    assert_eq!(client.id, 9);

    let renamed = repo
        .patch_client(
            9,
            &ClientPatch {
                nombre: Some("Sol SRL".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.nombre, "Sol SRL");
}

#[tokio::test]
async fn test_delete_client_with_rolls_is_validation() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/clientes/3/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "detail": "No se puede eliminar un cliente con rollos asociados"
        })))
        .mount(&server)
        .await;

    let err = repository(&server).await.delete_client(3).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Validation);
    assert_eq!(
        err.to_string(),
        "No se puede eliminar un cliente con rollos asociados"
    );
}

// ==================== Roll endpoint tests ====================

#[tokio::test]
async fn test_client_rolls_decode_service_values() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clientes/3/rollos/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([roll_json(1)])))
        .mount(&server)
        .await;

    let rolls = repository(&server)
        .await
        .list_client_rolls(3, None)
        .await
        .unwrap();
    let roll = &rolls[0];
    assert_eq!(roll.cliente_id, 3);
    assert_eq!(roll.metraje, 100.0);
    assert_eq!(roll.lote, "");
    assert_eq!(roll.fecha, NaiveDate::from_ymd_opt(2024, 3, 15));
}

#[tokio::test]
async fn test_list_rolls_sends_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rollos/"))
        .and(query_param("cliente_id", "3"))
        .and(query_param("disponible", "true"))
        .and(query_param("tipo_tela", "gab"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([roll_json(1), roll_json(2)])))
        .expect(1)
        .mount(&server)
        .await;

    let filter = RollFilter::for_client(3).available(true).tipo_tela("gab");
    let rolls = repository(&server).await.list_rolls(&filter).await.unwrap();
    assert_eq!(rolls.len(), 2);
}

#[tokio::test]
async fn test_patch_roll_body_has_no_metraje() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rollos/1/"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "numero_rollo": "12",
            "disponible": false,
            "resto_limpio": 10.0,
            "resto_sucio": 2.0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(roll_json(1)))
        .expect(1)
        .mount(&server)
        .await;

    let patch = RollPatch {
        numero_rollo: Some("12".into()),
        disponible: Some(false),
        resto_limpio: Some(10.0),
        resto_sucio: Some(2.0),
        ..Default::default()
    };
    repository(&server).await.patch_roll(1, &patch).await.unwrap();
}

#[tokio::test]
async fn test_create_roll_field_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rollos/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "numero_rollo": ["This field may not be blank."]
        })))
        .mount(&server)
        .await;

    let roll = NewRoll {
        cliente_id: 3,
        numero_rollo: String::new(),
        lote: "F".into(),
        tipo_tela: "lino".into(),
        color: "azul".into(),
        fecha: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        metraje: 10.0,
        disponible: true,
        resto_limpio: 0.0,
        resto_sucio: 0.0,
    };
    match repository(&server).await.create_roll(&roll).await.unwrap_err() {
        TelasError::Validation { message } => {
            assert_eq!(message, "numero_rollo: This field may not be blank.")
        }
        other => panic!("Expected Validation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_roll_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rollos/5/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    repository(&server).await.delete_roll(5).await.unwrap();
}

// ==================== Failure classification tests ====================

#[tokio::test]
async fn test_missing_roll_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rollos/77/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
        .mount(&server)
        .await;

    let err = repository(&server).await.get_roll(77).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(err.to_string(), "Not found.");
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rollos/1/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = repository(&server).await.get_roll(1).await.unwrap_err();
    assert!(err.is_transient());
    match err {
        TelasError::Server { status, message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "GET /rollos/1/ failed with HTTP 502");
        }
        other => panic!("Expected Server, got {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_body_is_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clientes/1/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = repository(&server).await.get_client(1).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Server);
}

#[tokio::test]
async fn test_unreachable_service_is_network_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let config = ServiceConfig::new(uri).with_timeout(Duration::from_secs(2));
    let repo = HttpRollRepository::new(&config).unwrap();
    let err = repo.ping().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Network);
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_truncated_body_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await;
        let response = "HTTP/1.1 200 OK\r\n\
                        Content-Type: application/json\r\n\
                        Content-Length: 500\r\n\r\n\
                        [{\"id\": 1, \"nombre\": \"Textiles";
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });

    let config = ServiceConfig::new(format!("http://{}", addr)).with_timeout(Duration::from_secs(5));
    let repo = HttpRollRepository::new(&config).unwrap();
    let err = repo.list_clients(None).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Network);
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_complete_but_malformed_body_is_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clientes/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[{\"id\": 1"))
        .mount(&server)
        .await;

    let err = repository(&server).await.list_clients(None).await.unwrap_err();
    match err {
        TelasError::Server { status, message } => {
            assert_eq!(status, 200);
            assert!(message.starts_with("malformed response from GET /clientes/"));
        }
        other => panic!("Expected Server, got {:?}", other),
    }
}
