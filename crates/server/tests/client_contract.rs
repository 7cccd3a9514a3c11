use std::net::SocketAddr;

use common::client::{ClientError, ServerBacked, StorageClient};
use serde::{Deserialize, Serialize};
use service::storage::DocumentStore;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use server::routes::{self, AppState, FacadeSettings};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Shift {
    id: String,
    employee_id: String,
    start: String,
    end: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag_ids: Option<Vec<String>>,
}

fn shift(id: &str) -> Shift {
    Shift {
        id: id.into(),
        employee_id: "1".into(),
        start: "2024-03-04T08:00".into(),
        end: "2024-03-04T16:00".into(),
        kind: "morning".into(),
        comment: None,
        tag_ids: Some(vec!["t1".into()]),
    }
}

async fn start_server(settings: FacadeSettings) -> anyhow::Result<String> {
    let data_dir = format!("target/test-data/{}", Uuid::new_v4());
    let store = DocumentStore::open(data_dir).await?;
    let app = routes::build_router(AppState::new(store, settings), CorsLayer::very_permissive(), None);
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await { eprintln!("server error: {}", e); }
    });
    Ok(format!("http://{}", addr))
}

#[tokio::test]
async fn set_writes_through_and_survives_remount() -> anyhow::Result<()> {
    let base_url = start_server(FacadeSettings::default()).await?;
    let client = StorageClient::new(&base_url);

    // pre-seed so the first load decodes as a list
    client.save("shifts", &Vec::<Shift>::new()).await?;

    let mut shifts = ServerBacked::mount(client.clone(), "shifts", Vec::<Shift>::new()).await;
    assert!(shifts.last_error().is_none());
    assert!(shifts.get().is_empty());

    shifts.set(vec![shift("s1")]).await?;
    shifts
        .update(|prev| {
            let mut next = prev.clone();
            next.push(shift("s2"));
            next
        })
        .await?;
    assert_eq!(shifts.get().len(), 2);

    let remounted = ServerBacked::mount(client, "shifts", Vec::<Shift>::new()).await;
    assert_eq!(remounted.get(), &vec![shift("s1"), shift("s2")]);
    Ok(())
}

#[tokio::test]
async fn fresh_key_with_list_shape_falls_back_to_initial() -> anyhow::Result<()> {
    let base_url = start_server(FacadeSettings::default()).await?;
    let client = StorageClient::new(&base_url);

    // the server's default document is `{}`, which is not a list
    let tags = ServerBacked::mount(client, "tags", vec!["fallback".to_string()]).await;
    assert_eq!(tags.get(), &vec!["fallback".to_string()]);
    assert!(matches!(tags.last_error(), Some(ClientError::Parse(_))));
    Ok(())
}

#[tokio::test]
async fn rejected_save_is_not_adopted() -> anyhow::Result<()> {
    let settings = FacadeSettings { api_key: Some("k".into()), ..FacadeSettings::default() };
    let base_url = start_server(settings).await?;

    let authed = StorageClient::new(&base_url).with_api_key("k");
    authed.save("shifts", &vec![shift("s1")]).await?;

    let anonymous = StorageClient::new(&base_url);
    let mut shifts = ServerBacked::mount(anonymous, "shifts", Vec::<Shift>::new()).await;
    assert_eq!(
        shifts.last_error(),
        Some(&ClientError::Status { status: 401, message: "Unauthorized".into() })
    );

    let err = shifts.set(vec![shift("s9")]).await.unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 401, .. }));
    assert!(shifts.get().is_empty());

    // the stored value is untouched
    let stored: Vec<Shift> = authed.load("shifts").await?;
    assert_eq!(stored, vec![shift("s1")]);
    Ok(())
}
