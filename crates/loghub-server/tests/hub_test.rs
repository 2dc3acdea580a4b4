// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! End-to-end tests: gRPC ingress through the dispatcher to TCP consumers.

use std::sync::Arc;
use std::time::Duration;

use prost::Message;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};

use loghub::chunked_emitter::{ChunkInfo, ChunkStream, ChunkedStreamer};
use loghub::proto::ingress_service_client::IngressServiceClient;
use loghub::proto::ingress_service_server::IngressServiceServer;
use loghub::proto::{IngressBatch, LogEntry};
use loghub::remote::RemoteStreamer;
use loghub::StreamError;
use loghub_server::{Dispatcher, IngressServer, LogStore};

fn entry(nano_ts: i64, message: &str) -> LogEntry {
    LogEntry {
        nano_ts,
        message: message.to_string(),
        ..Default::default()
    }
}

/// Starts an ingress server and a dispatcher on ephemeral ports; returns
/// their addresses.
async fn start_hub(dispatcher: Arc<Dispatcher>) -> (String, String) {
    let grpc_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let grpc_addr = grpc_listener.local_addr().unwrap().to_string();
    let egress_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let egress_addr = egress_listener.local_addr().unwrap().to_string();

    let store: Arc<dyn LogStore> = dispatcher.clone();
    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(IngressServiceServer::new(IngressServer::new(store)))
            .serve_with_incoming(TcpListenerStream::new(grpc_listener))
            .await
            .unwrap();
    });
    tokio::spawn(dispatcher.serve(egress_listener));
    (grpc_addr, egress_addr)
}

async fn wait_for_consumers(dispatcher: &Dispatcher, count: usize) {
    for _ in 0..200 {
        if dispatcher.consumer_count() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "expected {count} consumers, have {}",
        dispatcher.consumer_count()
    );
}

async fn read_frame(stream: &mut TcpStream) -> LogEntry {
    let mut frame_len = [0u8; 4];
    stream.read_exact(&mut frame_len).await.unwrap();
    let mut payload = vec![0u8; u32::from_be_bytes(frame_len) as usize];
    stream.read_exact(&mut payload).await.unwrap();
    LogEntry::decode(&payload[..]).unwrap()
}

#[tokio::test]
async fn test_fanout_to_all_consumers_with_ack() {
    let dispatcher = Arc::new(Dispatcher::new());
    let (grpc_addr, egress_addr) = start_hub(dispatcher.clone()).await;

    let mut consumer_a = TcpStream::connect(&egress_addr).await.unwrap();
    let mut consumer_b = TcpStream::connect(&egress_addr).await.unwrap();
    wait_for_consumers(&dispatcher, 2).await;

    let streamer = RemoteStreamer::connect("alice", &grpc_addr).unwrap();
    let entries = [entry(100, "e1"), entry(200, "e2")];
    let mut chunk = streamer
        .start_stream(ChunkInfo {
            total_size: entries.iter().map(|e| e.encoded_len()).sum(),
            num_entries: entries.len(),
            first_nano_ts: 100,
            last_nano_ts: 200,
        })
        .await
        .unwrap();
    for entry in &entries {
        chunk.stream_entry(entry).await.unwrap();
    }
    let (last_nano_ts, result) = chunk.stream_end().await;
    assert!(result.is_ok(), "stream_end: {result:?}");
    assert_eq!(last_nano_ts, 200);

    for consumer in [&mut consumer_a, &mut consumer_b] {
        let first = read_frame(consumer).await;
        let second = read_frame(consumer).await;
        assert_eq!(first, entries[0]);
        assert_eq!(second, entries[1]);
    }
}

#[tokio::test]
async fn test_consumer_disconnect_does_not_affect_others() {
    let dispatcher = Arc::new(Dispatcher::new());
    let (grpc_addr, egress_addr) = start_hub(dispatcher.clone()).await;

    let dropped = TcpStream::connect(&egress_addr).await.unwrap();
    let mut kept = TcpStream::connect(&egress_addr).await.unwrap();
    wait_for_consumers(&dispatcher, 2).await;
    drop(dropped);
    wait_for_consumers(&dispatcher, 1).await;

    let streamer = RemoteStreamer::connect("alice", &grpc_addr).unwrap();
    let sent = entry(7, "still flowing");
    let mut chunk = streamer
        .start_stream(ChunkInfo {
            total_size: sent.encoded_len(),
            num_entries: 1,
            first_nano_ts: 7,
            last_nano_ts: 7,
        })
        .await
        .unwrap();
    chunk.stream_entry(&sent).await.unwrap();
    let (last_nano_ts, _) = chunk.stream_end().await;
    assert_eq!(last_nano_ts, 7);

    assert_eq!(read_frame(&mut kept).await, sent);
}

#[tokio::test]
async fn test_missing_client_name_is_unauthenticated() {
    let dispatcher = Arc::new(Dispatcher::new());
    let (grpc_addr, _egress_addr) = start_hub(dispatcher.clone()).await;

    let streamer = RemoteStreamer::connect("", &grpc_addr).unwrap();
    let result = streamer
        .start_stream(ChunkInfo {
            total_size: 0,
            num_entries: 1,
            first_nano_ts: 1,
            last_nano_ts: 1,
        })
        .await;
    match result {
        Err(StreamError::Rpc(status)) => {
            assert_eq!(status.code(), tonic::Code::Unauthenticated);
        }
        other => panic!("expected unauthenticated, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_one_ack_per_chunk_on_raw_stream() {
    let dispatcher = Arc::new(Dispatcher::new());
    let (grpc_addr, _egress_addr) = start_hub(dispatcher.clone()).await;

    let mut client = IngressServiceClient::connect(format!("http://{grpc_addr}"))
        .await
        .unwrap();
    let (tx, rx) = mpsc::channel(4);
    let mut request = tonic::Request::new(ReceiverStream::new(rx));
    request
        .metadata_mut()
        .insert("logs-client", "alice".parse().unwrap());
    let mut events = client.ingress_stream(request).await.unwrap().into_inner();

    tx.send(IngressBatch {
        entries: vec![entry(1, "a"), entry(2, "b")],
        chunk_end: true,
    })
    .await
    .unwrap();

    let event = events.message().await.unwrap().expect("one ack");
    assert_eq!(event.last_nano_ts, 2);

    drop(tx);
    assert!(events.message().await.unwrap().is_none());
}
