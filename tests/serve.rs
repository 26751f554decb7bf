use std::sync::Arc;

use auditzip::audit::O365AuditParser;
use auditzip::lifecycle::ShutdownSignal;
use auditzip::server::{self, ServerConfig};
use auditzip::zip::unpack_bytes;
use reqwest::multipart::{Form, Part};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const SAMPLE: &str = "CreationDate,UserIds,Operations\n\
                      2023-01-01T00:00:00,alice@example.com,FileAccessed\n";

#[tokio::test]
async fn serves_uploads_until_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = server::router(&ServerConfig::default(), Arc::new(O365AuditParser));
    let (stop, stopped) = oneshot::channel();
    let server = tokio::spawn(server::serve(listener, app, async move {
        stopped.await.unwrap_or(ShutdownSignal::Terminate)
    }));

    let client = reqwest::Client::new();
    let form = Form::new().part(
        "file",
        Part::bytes(SAMPLE.as_bytes().to_vec()).file_name("audit.csv"),
    );
    let response = client
        .post(format!("http://{addr}/process_file"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/zip");
    let length: usize = response.headers()["content-length"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();

    let body = response.bytes().await.unwrap();
    assert_eq!(body.len(), length);

    let files = unpack_bytes(body).await.unwrap();
    assert_eq!(files["AuditLog.csv"], SAMPLE);

    let response = client
        .post(format!("http://{addr}/process_file"))
        .multipart(Form::new().text("comment", "no file here"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    drop(client);
    stop.send(ShutdownSignal::Interrupt).unwrap();
    assert_eq!(server.await.unwrap().unwrap(), ShutdownSignal::Interrupt);
}
