//! Receiver behaviour on imperfect streams: noise, loss, restarts.

use std::net::Ipv4Addr;

use pyng_core::codec::{frame_transfer, pad};
use pyng_core::wire::{DATA_END, DATA_START, META_START};
use pyng_services::{ReceiverState, Transmitter};

use crate::{output_dir, Loopback, RECEIVER, SENDER};

const BYSTANDER: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 99);

#[test]
fn plain_pings_never_open_a_transfer() {
    let dir = output_dir("noise-only");
    let mut link = Loopback::new(dir.clone());

    for i in 0..50u8 {
        link.deliver(BYSTANDER, &[i; 16]);
        link.deliver(BYSTANDER, b"abcdefghijklmnop");
    }
    link.deliver(BYSTANDER, pad(DATA_START).unwrap().as_ref());
    link.deliver(BYSTANDER, pad(DATA_END).unwrap().as_ref());

    assert_eq!(link.machine.state(), ReceiverState::Idle);
    assert!(link.machine.buffer().is_none());
    assert!(link.received.is_empty());
    assert_eq!(link.failures, 0);
    assert!(!dir.exists(), "no file may be written");
}

#[tokio::test]
async fn noise_before_and_after_a_transfer() {
    let dir = output_dir("noise-around");
    let mut link = Loopback::new(dir.clone());

    link.deliver(BYSTANDER, b"ordinary payload");
    let mut tx = Transmitter::new(link);
    tx.transmit_file(RECEIVER, "a.txt", b"framed between pings", |_| {})
        .await
        .unwrap();
    let mut link = tx.into_sender();
    link.deliver(BYSTANDER, b"ordinary payload");

    assert_eq!(link.received.len(), 1);
    assert_eq!(link.received[0].data, b"framed between pings");
    assert_eq!(link.machine.state(), ReceiverState::Idle);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn aborted_transfer_is_replaced_by_the_retry() {
    let dir = output_dir("retry");
    let mut link = Loopback::new(dir.clone());

    let first = frame_transfer("big.iso", b"first attempt that never ends").unwrap();
    // Sender died after four chunks.
    for chunk in &first[..4] {
        link.deliver(SENDER, chunk.as_ref());
    }
    assert_eq!(link.machine.state(), ReceiverState::Active);

    for chunk in frame_transfer("big.iso", b"second attempt").unwrap() {
        link.deliver(SENDER, chunk.as_ref());
    }

    assert_eq!(link.received.len(), 1);
    let file = &link.received[0];
    assert_eq!(file.transfer, 1);
    assert_eq!(file.remote_path, "big.iso");
    assert_eq!(file.data, b"second attempt");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn lost_data_start_fails_only_that_transfer() {
    let dir = output_dir("lost-ds");
    let mut link = Loopback::new(dir.clone());

    for chunk in frame_transfer("x", b"doomed")
        .unwrap()
        .iter()
        .filter(|c| **c != pad(DATA_START).unwrap())
    {
        link.deliver(SENDER, chunk.as_ref());
    }
    assert_eq!(link.failures, 1);
    assert_eq!(link.machine.transfer_number(), 2);

    for chunk in frame_transfer("y", b"fine").unwrap() {
        link.deliver(SENDER, chunk.as_ref());
    }
    assert_eq!(link.received.len(), 1);
    assert_eq!(link.received[0].transfer, 2);
    assert_eq!(link.received[0].local_path, dir.join("pyng_192.0.2.10_2"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn lost_data_end_keeps_receiver_active() {
    let dir = output_dir("lost-de");
    let mut link = Loopback::new(dir.clone());

    let chunks = frame_transfer("x", b"no end").unwrap();
    for chunk in &chunks[..chunks.len() - 1] {
        link.deliver(SENDER, chunk.as_ref());
    }
    // Unrelated traffic is swept into the open buffer.
    link.deliver(BYSTANDER, b"bystander ping!!");

    assert_eq!(link.machine.state(), ReceiverState::Active);
    assert!(link.received.is_empty());
    assert_eq!(link.machine.buffer().unwrap().len(), chunks.len());
}

#[test]
fn interleaved_foreign_chunk_ends_up_in_data() {
    let dir = output_dir("interleave");
    let mut link = Loopback::new(dir.clone());

    let chunks = frame_transfer("p", b"AAAA").unwrap();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 5 {
            link.deliver(BYSTANDER, b"BB");
        }
        link.deliver(SENDER, chunk.as_ref());
    }

    assert_eq!(link.received[0].data, b"AAAABB");

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn payload_equal_to_a_marker_is_lost() {
    let dir = output_dir("collision");
    let mut tx = Transmitter::new(Loopback::new(dir.clone()));

    let mut content = b"0123456789abcdef".to_vec();
    content.extend_from_slice(META_START);
    tx.transmit_file(RECEIVER, "c", &content, |_| {}).await.unwrap();

    let link = tx.into_sender();
    // The second data chunk is META_START once trimmed. It restarts the
    // buffer, which then closes without a DATA_START.
    assert!(link.received.is_empty());
    assert_eq!(link.failures, 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn trailing_zero_bytes_of_a_chunk_are_padding() {
    let dir = output_dir("zeros");
    let mut tx = Transmitter::new(Loopback::new(dir.clone()));

    let content = b"abc\0\0".to_vec();
    tx.transmit_file(RECEIVER, "z", &content, |_| {}).await.unwrap();

    let link = tx.into_sender();
    assert_eq!(link.received[0].data, b"abc");

    let _ = std::fs::remove_dir_all(&dir);
}
