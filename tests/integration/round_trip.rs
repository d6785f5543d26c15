//! Whole transfers: transmitter → receiver → finalizer.

use pyng_core::digest::DigestAlgorithm;
use pyng_core::wire::CHUNK_SIZE;
use pyng_services::{ReceiverState, Transmitter};

use crate::{output_dir, Loopback, RECEIVER, SENDER};

async fn send(loopback: Loopback, path: &str, content: &[u8]) -> Loopback {
    let mut tx = Transmitter::new(loopback);
    tx.transmit_file(RECEIVER, path, content, |_| {})
        .await
        .expect("loopback transfer failed");
    tx.into_sender()
}

#[tokio::test]
async fn text_file_round_trip() {
    let dir = output_dir("text");
    let content = b"the quick brown fox jumps over the lazy dog\n".repeat(20);

    let link = send(Loopback::new(dir.clone()), "/home/alice/fox.txt", &content).await;

    assert_eq!(link.received.len(), 1);
    let file = &link.received[0];
    assert_eq!(file.transfer, 1);
    assert_eq!(file.source, SENDER);
    assert_eq!(file.remote_path, "/home/alice/fox.txt");
    assert_eq!(file.data, content);
    assert_eq!(file.fingerprint, DigestAlgorithm::Md5.fingerprint(&content));
    assert_eq!(file.local_path, dir.join("pyng_192.0.2.10_1"));
    assert_eq!(std::fs::read(&file.local_path).unwrap(), content);
    assert_eq!(link.machine.state(), ReceiverState::Idle);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn sizes_around_chunk_boundaries() {
    let dir = output_dir("sizes");
    let mut link = Loopback::new(dir.clone());

    let sizes = [1usize, CHUNK_SIZE - 1, CHUNK_SIZE, CHUNK_SIZE + 1, 3 * CHUNK_SIZE, 1000];
    for (i, &size) in sizes.iter().enumerate() {
        // No zero bytes: a chunk ending in 0x00 would lose it to trimming.
        let content: Vec<u8> = (0..size).map(|n| (n % 250) as u8 + 1).collect();
        let path = format!("file-{i}");
        link = send(link, &path, &content).await;

        let file = link.received.last().unwrap();
        assert_eq!(file.transfer, i as u64 + 1);
        assert_eq!(file.remote_path, path);
        assert_eq!(file.data, content, "size {size}");
    }
    assert_eq!(link.received.len(), sizes.len());
    assert_eq!(link.failures, 0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn empty_file_round_trip() {
    let dir = output_dir("empty");
    let link = send(Loopback::new(dir.clone()), "/dev/null", b"").await;

    assert_eq!(link.wire.len(), 4);
    let file = &link.received[0];
    assert!(file.data.is_empty());
    assert_eq!(file.fingerprint.to_hex(), "d41d8cd98f00b204e9800998ecf8427e");
    assert_eq!(std::fs::read(&file.local_path).unwrap().len(), 0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn hello_scenario() {
    let dir = output_dir("hello");
    let link = send(Loopback::new(dir.clone()), "", b"hello").await;

    let file = &link.received[0];
    assert_eq!(file.remote_path, "");
    assert_eq!(file.data, b"hello");
    assert_eq!(file.fingerprint.to_hex(), "5d41402abc4b2a76b9719d911017c592");

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn non_utf8_path_is_displayed_lossily() {
    let dir = output_dir("lossy");
    let mut link = Loopback::new(dir.clone());

    // Build the metadata section by hand: a path with an invalid byte.
    let chunks: [&[u8]; 6] = [
        b"PYNGMETASTART",
        b"dir/\xffname",
        b"PYNGMETAEND",
        b"PYNGDATASTART",
        b"abc",
        b"PYNGDATAEND",
    ];
    for chunk in chunks {
        link.deliver(SENDER, pyng_core::codec::pad(chunk).unwrap().as_ref());
    }

    let file = &link.received[0];
    assert_eq!(file.remote_path, "dir/\u{fffd}name");
    assert_eq!(file.data, b"abc");

    let _ = std::fs::remove_dir_all(&dir);
}
