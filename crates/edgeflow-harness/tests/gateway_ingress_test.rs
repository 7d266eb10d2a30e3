//! Two producers on distinct topics, streamed to a real gateway ingress socket, both show up in
//! `/api/resources` within 200ms.

use std::time::Duration;

use edgeflow_handlers::{OutputHandler, TcpHandler};
use edgeflow_harness::GatewayUnderTest;
use edgeflow_proto::{Frame, MetaMap};

#[tokio::test]
async fn two_topics_both_land_in_resources() {
    let gateway = GatewayUnderTest::spawn(19_100, 19_101, None).await;

    let handler_a = TcpHandler::new("127.0.0.1", 19_100, "a");
    let handler_b = TcpHandler::new("127.0.0.1", 19_100, "b");

    handler_a.send(&Frame::new(1, 1.0, MetaMap::new(), vec![1, 2, 3])).await;
    handler_b.send(&Frame::new(1, 1.0, MetaMap::new(), vec![4, 5, 6])).await;

    tokio::time::sleep(Duration::from_millis(200)).await;

    let body: serde_json::Value =
        reqwest::get(format!("{}/api/resources", gateway.http_base)).await.unwrap().json().await.unwrap();

    assert!(body["buffers"]["a"]["current"].as_u64().unwrap() >= 1);
    assert!(body["buffers"]["b"]["current"].as_u64().unwrap() >= 1);

    handler_a.close().await;
    handler_b.close().await;
}
