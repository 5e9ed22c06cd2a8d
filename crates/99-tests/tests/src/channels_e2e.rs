use runtime_native::{frame_stream, sync_bridge};
use service_abi::{RenderCommand, ResourceLoad};
use std::sync::Arc;
use std::thread;
use transport::{RingBuffer, StatusWord};

const BATCHES: u32 = 5_000;

fn blob_for(i: u32) -> Vec<u8> {
    i.to_le_bytes()[..(i % 4 + 1) as usize].to_vec()
}

/// A small ring carries thousands of batches when the consumer acks each one.
#[test]
fn acked_batches_cross_threads_in_order() {
    let (mut tx, mut rx) = RingBuffer::with_capacity_words(16).unwrap();
    let acked = Arc::new(StatusWord::new());

    let producer = {
        let acked = acked.clone();
        thread::spawn(move || {
            for i in 0..BATCHES {
                tx.push_word(i).unwrap();
                tx.push_bytes(&blob_for(i)).unwrap();
                assert!(tx.commit());
                acked.wait_while(i);
            }
        })
    };

    for i in 0..BATCHES {
        let mut batch = rx.wait_and_read().unwrap();
        assert_eq!(batch.next_word(), Some(i));
        assert_eq!(batch.next_blob().unwrap(), blob_for(i));
        assert!(batch.is_exhausted());
        drop(batch);
        acked.bump();
    }
    producer.join().unwrap();
    assert!(!rx.has_batch());
}

/// The frame fence keeps the stream lossless without any other flow control.
#[test]
fn frames_arrive_in_order_until_close() {
    const FRAMES: u32 = 300;
    let (mut sender, mut receiver) = frame_stream(1024).unwrap();
    let producer = thread::spawn(move || {
        for width in 0..FRAMES {
            sender
                .send(vec![RenderCommand::Resize { width, height: 1 }, RenderCommand::Fill])
                .unwrap();
        }
        sender.close().unwrap();
        sender.published()
    });

    let mut widths = Vec::new();
    while receiver
        .present_next(|commands| match commands.first() {
            Some(RenderCommand::Resize { width, .. }) => widths.push(*width),
            other => panic!("unexpected frame head {other:?}"),
        })
        .unwrap()
    {}
    // The close marker counts as a publish.
    assert_eq!(producer.join().unwrap(), FRAMES + 1);
    assert_eq!(widths, (0..FRAMES).collect::<Vec<_>>());
}

/// Every blocking load gets the answer to its own request.
#[test]
fn bridge_answers_each_request() {
    let (mut requester, mut responder) = sync_bridge(4096).unwrap();
    let requests = responder.requests().clone();
    let host = thread::spawn(move || {
        for request in requests.iter() {
            let reply = match request.name.strip_prefix("ok-") {
                Some(rest) => ResourceLoad::Loaded(rest.as_bytes().to_vec()),
                None => ResourceLoad::Failed(format!("refused {}", request.name)),
            };
            responder.respond(&request, reply).unwrap();
        }
    });

    for i in 0..200 {
        let name = if i % 3 == 0 {
            format!("bad-{i}")
        } else {
            format!("ok-{i}")
        };
        let reply = requester.load(&name).unwrap();
        match name.strip_prefix("ok-") {
            Some(rest) => assert_eq!(reply, ResourceLoad::Loaded(rest.as_bytes().to_vec())),
            None => assert_eq!(reply, ResourceLoad::Failed(format!("refused {name}"))),
        }
        assert!(!requester.is_outstanding());
    }
    drop(requester);
    host.join().unwrap();
}
