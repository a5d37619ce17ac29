//! Interop scenarios run against the in-process test service.

mod common;

use std::time::{Duration, SystemTime};

use anyhow::Result;
use bytes::Bytes;
use futures::StreamExt;

use common::*;
use grpc_web_core::{
    Call, CallEvent, CallObserver, Code, Deadline, Metadata, MethodPath, Status, WireFormat,
};

const SPECIAL_MESSAGE: &str =
    "\t\ntest with whitespace\r\nand Unicode BMP \u{263A} and non-BMP \u{1F608}\t\n";

fn formats() -> [WireFormat; 2] {
    [WireFormat::Binary, WireFormat::Text]
}

async fn collect_events(mut handle: grpc_web_core::CallHandle) -> Vec<CallEvent> {
    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_empty_unary() -> Result<()> {
    for format in formats() {
        let (client, transport) = InteropService::default().client(format);
        let response = client
            .unary(&method("EmptyCall"), Bytes::new(), Metadata::new(), None)
            .await?;

        assert!(response.is_ok(), "{format}: {}", response.status);
        assert_eq!(response.message.as_deref(), Some(&b""[..]));

        let request = &transport.requests()[0];
        assert_eq!(request.path, "/grpc.testing.TestService/EmptyCall");
        assert_eq!(request.header("x-grpc-web"), Some("1"));
        assert_eq!(request.header("content-type"), Some(format.content_type()));
        assert_eq!(request.header("accept"), Some(format.content_type()));
        assert!(request.header("x-user-agent").is_some());
        assert!(request.header("grpc-timeout").is_none());
    }
    Ok(())
}

#[tokio::test]
async fn test_empty_unary_with_timeout() -> Result<()> {
    let (client, transport) = InteropService::default().client(WireFormat::Binary);
    let deadline = Deadline::after(Duration::from_secs(10));
    let response = client
        .unary(&method("EmptyCall"), Bytes::new(), Metadata::new(), Some(deadline))
        .await?;

    assert!(response.is_ok());
    let timeout = transport.requests()[0]
        .header("grpc-timeout")
        .map(str::to_string)
        .expect("grpc-timeout header");
    let parsed = grpc_web_core::deadline::decode_timeout(&timeout).expect("valid timeout");
    assert!(parsed <= Duration::from_secs(10));
    assert!(parsed > Duration::from_secs(9));
    Ok(())
}

#[tokio::test]
async fn test_large_unary() -> Result<()> {
    for format in formats() {
        let (client, _transport) = InteropService::default().with_chunk_size(1000).client(format);
        let request = SimpleRequest {
            response_size: 314_159,
            payload: vec![0; 271_828],
            response_status: None,
        };
        let response = client
            .unary(&method("UnaryCall"), encode(&request), Metadata::new(), None)
            .await?;

        assert_eq!(response.status.code(), 0);
        let message = response.into_result().expect("ok response");
        let decoded: SimpleResponse = decode(&message);
        assert_eq!(decoded.payload.len(), 314_159);
    }
    Ok(())
}

#[tokio::test]
async fn test_server_streaming() -> Result<()> {
    let sizes = [31_415usize, 9, 2_653, 58_979];
    for format in formats() {
        let (client, _transport) = InteropService::default().with_chunk_size(777).client(format);
        let request = StreamingOutputCallRequest {
            response_sizes: sizes.to_vec(),
            response_status: None,
        };
        let handle = client.streaming(
            &method("StreamingOutputCall"),
            encode(&request),
            Metadata::new(),
            None,
        )?;

        let events = collect_events(handle).await;
        assert_eq!(events.len(), sizes.len() + 2, "{format}");
        assert!(matches!(events[0], CallEvent::Metadata(_)));

        let received: Vec<usize> = events[1..=sizes.len()]
            .iter()
            .map(|event| match event {
                CallEvent::Message(bytes) => decode::<SimpleResponse>(bytes).payload.len(),
                other => panic!("expected message, got {other:?}"),
            })
            .collect();
        assert_eq!(received, sizes);

        match events.last() {
            Some(CallEvent::Status(status)) => assert!(status.is_ok()),
            other => panic!("expected status, got {other:?}"),
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_server_streaming_as_stream() -> Result<()> {
    let (client, _transport) = InteropService::default().client(WireFormat::Binary);
    let request = StreamingOutputCallRequest {
        response_sizes: vec![1, 2, 3],
        response_status: None,
    };
    let call = Call::new(
        MethodPath::new(SERVICE, "StreamingOutputCall")?,
        encode(&request),
    );
    let messages = client
        .server_streaming_call(call)
        .filter_map(|event| async move {
            match event {
                CallEvent::Message(bytes) => Some(bytes),
                _ => None,
            }
        })
        .collect::<Vec<_>>()
        .await;
    assert_eq!(messages.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_custom_metadata() -> Result<()> {
    for format in formats() {
        let (client, transport) = InteropService::default().client(format);
        let mut metadata = Metadata::new();
        metadata.set(ECHO_INITIAL_KEY, "test_initial_metadata_value")?;
        metadata.set_bin(ECHO_TRAILING_KEY, &[0xab, 0xab, 0xab])?;

        let request = SimpleRequest {
            response_size: 314_159,
            payload: vec![0; 271_828],
            response_status: None,
        };
        let response = client
            .unary(&method("UnaryCall"), encode(&request), metadata, None)
            .await?;

        assert!(response.is_ok());
        assert_eq!(
            response.initial_metadata.get("X-GRPC-TEST-ECHO-INITIAL"),
            Some("test_initial_metadata_value")
        );
        assert_eq!(
            response
                .status
                .metadata()
                .get_bin("X-Grpc-Test-Echo-Trailing-Bin")?,
            Some(vec![0xab, 0xab, 0xab])
        );
        assert!(!response.status.metadata().has("grpc-status"));
        assert_eq!(
            transport.requests()[0].header(ECHO_TRAILING_KEY),
            Some("q6ur")
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_status_code_and_message() -> Result<()> {
    for format in formats() {
        let (client, _transport) = InteropService::default().client(format);
        let request = SimpleRequest {
            response_status: Some(EchoStatus {
                code: 2,
                message: "test status message".to_string(),
            }),
            ..Default::default()
        };
        let response = client
            .unary(&method("UnaryCall"), encode(&request), Metadata::new(), None)
            .await?;

        assert_eq!(response.status.code(), 2);
        assert_eq!(response.status.named_code(), Some(Code::Unknown));
        assert_eq!(response.status.message(), "test status message");
        assert!(response.message.is_none());

        let status = response.into_result().unwrap_err();
        assert_eq!(status.to_string(), "UNKNOWN: test status message");
    }
    Ok(())
}

#[tokio::test]
async fn test_streaming_status_code_and_message() -> Result<()> {
    let (client, _transport) = InteropService::default().client(WireFormat::Binary);
    let request = StreamingOutputCallRequest {
        response_sizes: vec![5],
        response_status: Some(EchoStatus {
            code: 2,
            message: "test status message".to_string(),
        }),
    };
    let events = collect_events(client.streaming(
        &method("StreamingOutputCall"),
        encode(&request),
        Metadata::new(),
        None,
    )?)
    .await;

    assert!(matches!(events[1], CallEvent::Message(_)));
    match events.last() {
        Some(CallEvent::Status(status)) => {
            assert_eq!(status.code(), 2);
            assert_eq!(status.message(), "test status message");
        }
        other => panic!("expected status, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_special_status_message() -> Result<()> {
    for format in formats() {
        let (client, _transport) = InteropService::default().with_chunk_size(3).client(format);
        let request = SimpleRequest {
            response_status: Some(EchoStatus {
                code: 2,
                message: SPECIAL_MESSAGE.to_string(),
            }),
            ..Default::default()
        };
        let response = client
            .unary(&method("UnaryCall"), encode(&request), Metadata::new(), None)
            .await?;
        assert_eq!(response.status.code(), 2);
        assert_eq!(response.status.message(), SPECIAL_MESSAGE);
    }
    Ok(())
}

#[tokio::test]
async fn test_unimplemented_method() -> Result<()> {
    for format in formats() {
        let (client, _transport) = InteropService::default().client(format);
        let events = collect_events(client.streaming(
            &method("UnimplementedCall"),
            Bytes::new(),
            Metadata::new(),
            None,
        )?)
        .await;

        assert!(!events.iter().any(|e| matches!(e, CallEvent::Message(_))));
        match events.last() {
            Some(CallEvent::Status(status)) => {
                assert_eq!(status.code(), 12);
                assert_eq!(status.named_code(), Some(Code::Unimplemented));
                assert!(status.message().contains("UnimplementedCall"));
            }
            other => panic!("expected status, got {other:?}"),
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_unimplemented_service() -> Result<()> {
    let (client, _transport) = InteropService::default().client(WireFormat::Binary);
    let response = client
        .unary(
            "/grpc.testing.UnimplementedService/UnimplementedCall",
            Bytes::new(),
            Metadata::new(),
            None,
        )
        .await?;
    assert!(!response.is_ok());
    assert!(response.message.is_none());
    Ok(())
}

#[tokio::test]
async fn test_past_deadline_never_reaches_transport() -> Result<()> {
    let (client, transport) = InteropService::default().client(WireFormat::Binary);
    let deadline = Deadline::at(SystemTime::now() - Duration::from_secs(1));
    let response = client
        .unary(&method("EmptyCall"), Bytes::new(), Metadata::new(), Some(deadline))
        .await?;

    assert_eq!(response.status.named_code(), Some(Code::DeadlineExceeded));
    assert_eq!(transport.request_count(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_deadline_mid_stream_aborts_transport() -> Result<()> {
    let (client, transport) = InteropService::default()
        .with_chunk_size(64)
        .with_chunk_delay(Duration::from_millis(100))
        .client(WireFormat::Binary);
    let request = StreamingOutputCallRequest {
        response_sizes: vec![10, 10, 10, 10, 10, 10],
        response_status: None,
    };
    let deadline = Deadline::after(Duration::from_millis(250));
    let events = collect_events(client.streaming(
        &method("StreamingOutputCall"),
        encode(&request),
        Metadata::new(),
        Some(deadline),
    )?)
    .await;

    match events.last() {
        Some(CallEvent::Status(status)) => {
            assert_eq!(status.named_code(), Some(Code::DeadlineExceeded));
        }
        other => panic!("expected status, got {other:?}"),
    }
    let messages = events
        .iter()
        .filter(|e| matches!(e, CallEvent::Message(_)))
        .count();
    assert!(messages < 6);
    assert_eq!(transport.abort_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_deadline_enforced_while_caller_is_not_reading() -> Result<()> {
    let transport = InteropService::default().transport();
    let client = grpc_web_core::GrpcWebClient::with_transport(
        grpc_web_core::ClientConfig::default().with_event_buffer(1),
        std::sync::Arc::new(transport.clone()),
    )?;
    let request = StreamingOutputCallRequest {
        response_sizes: vec![4; 50],
        response_status: None,
    };
    let handle = client.streaming(
        &method("StreamingOutputCall"),
        encode(&request),
        Metadata::new(),
        Some(Deadline::after(Duration::from_millis(100))),
    )?;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(transport.abort_count(), 1);

    let events = collect_events(handle).await;
    assert!(matches!(events.first(), Some(CallEvent::Metadata(_))));
    assert!(!events.iter().any(|e| matches!(e, CallEvent::Message(_))));
    match events.last() {
        Some(CallEvent::Status(status)) => {
            assert_eq!(status.named_code(), Some(Code::DeadlineExceeded));
        }
        other => panic!("expected status, got {other:?}"),
    }
    assert_eq!(events.len(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_default_timeout_from_config() -> Result<()> {
    let transport = InteropService::default()
        .with_chunk_delay(Duration::from_secs(60))
        .transport();
    let client = grpc_web_core::GrpcWebClient::with_transport(
        grpc_web_core::ClientConfig::default().with_default_timeout_ms(500),
        std::sync::Arc::new(transport.clone()),
    )?;

    let response = client
        .unary(&method("EmptyCall"), Bytes::new(), Metadata::new(), None)
        .await?;
    assert_eq!(response.status.named_code(), Some(Code::DeadlineExceeded));
    assert!(transport.requests()[0].header("grpc-timeout").is_some());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_stream() -> Result<()> {
    let (client, transport) = InteropService::default()
        .with_chunk_size(16)
        .with_chunk_delay(Duration::from_millis(50))
        .client(WireFormat::Binary);
    let request = StreamingOutputCallRequest {
        response_sizes: vec![4; 20],
        response_status: None,
    };
    let mut handle = client.streaming(
        &method("StreamingOutputCall"),
        encode(&request),
        Metadata::new(),
        None,
    )?;

    loop {
        match handle.next_event().await {
            Some(CallEvent::Message(_)) => break,
            Some(CallEvent::Metadata(_)) => continue,
            other => panic!("unexpected event {other:?}"),
        }
    }
    handle.cancel();

    assert_eq!(handle.next_event().await, Some(CallEvent::Cancelled));
    assert_eq!(handle.next_event().await, None);
    assert!(handle.is_finished());
    assert_eq!(transport.abort_count(), 1);
    Ok(())
}

#[derive(Default)]
struct RecordingObserver {
    metadata: usize,
    messages: Vec<Bytes>,
    status: Option<Status>,
    cancelled: bool,
}

impl CallObserver for RecordingObserver {
    fn on_metadata(&mut self, _metadata: &Metadata) {
        self.metadata += 1;
    }

    fn on_message(&mut self, message: Bytes) {
        assert!(self.status.is_none(), "message after status");
        self.messages.push(message);
    }

    fn on_status(&mut self, status: &Status) {
        self.status = Some(status.clone());
    }

    fn on_cancelled(&mut self) {
        self.cancelled = true;
    }
}

#[tokio::test]
async fn test_observer_receives_ordered_callbacks() -> Result<()> {
    let (client, _transport) = InteropService::default().client(WireFormat::Text);
    let request = StreamingOutputCallRequest {
        response_sizes: vec![8, 16, 32],
        response_status: None,
    };
    let handle = client.streaming(
        &method("StreamingOutputCall"),
        encode(&request),
        Metadata::new(),
        None,
    )?;
    let observer = handle.observe(RecordingObserver::default()).await;

    assert_eq!(observer.metadata, 1);
    assert_eq!(observer.messages.len(), 3);
    assert!(observer.status.expect("status").is_ok());
    assert!(!observer.cancelled);
    Ok(())
}

#[tokio::test]
async fn test_invalid_method_path_rejected() {
    let (client, transport) = InteropService::default().client(WireFormat::Binary);
    let result = client
        .unary("EmptyCall", Bytes::new(), Metadata::new(), None)
        .await;
    assert!(matches!(
        result,
        Err(grpc_web_core::GrpcWebError::InvalidRequest(_))
    ));
    assert_eq!(transport.request_count(), 0);
}
