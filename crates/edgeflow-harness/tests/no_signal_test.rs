//! A gateway with no upstream producer still serves a placeholder MJPEG frame for any topic a
//! client asks for, within 3s (`SPEC_FULL.md` §8 scenario 5).

use std::time::Duration;

use edgeflow_harness::GatewayUnderTest;

#[tokio::test]
async fn video_with_no_upstream_serves_placeholder() {
    let gateway = GatewayUnderTest::spawn(19_200, 19_201, None).await;

    // `/video/{topic}` is an infinite MJPEG stream, so the body must be read chunk by chunk
    // rather than awaited to completion.
    let mut response = reqwest::get(format!("{}/video/nobody", gateway.http_base)).await.unwrap();
    assert!(response.status().is_success());
    let content_type = response.headers().get("content-type").expect("content-type header").to_str().unwrap();
    assert!(content_type.starts_with("multipart/x-mixed-replace"), "got {content_type}");

    let first_part = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            let chunk = response.chunk().await.unwrap().expect("stream should not end");
            if chunk.windows(2).any(|w| w == [0xFF, 0xD8]) {
                return chunk;
            }
        }
    })
    .await
    .expect("gateway should emit the placeholder within 3s");

    assert!(
        first_part.windows(b"Content-Type: image/jpeg".len()).any(|w| w == b"Content-Type: image/jpeg"),
        "mjpeg part should declare image/jpeg"
    );
}
