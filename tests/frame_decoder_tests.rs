//! NDJSON decoding tests
//!
//! The decoded frames must not depend on where the network happens to cut
//! the body, including cuts inside multibyte characters.

use futures::{stream, StreamExt};
use kb_chat::chat::{decode_frames, ChatError, FrameDecoder, StreamFrame};

const BODY: &str = concat!(
    "{\"step\":\"_analyze_user_intent\",\"message\":\"質問の意図を分析しています\"}\n",
    "{\"step\":\"identify_column\",\"message\":\"\"}\n",
    "{\"step\":\"docs_retrieved\",\"message\":\"関連文書を3件取得しました\",\"data\":{\"count\":3}}\n",
    "{\"step\":\"final_answer\",\"message\":\"売上が最も高いのは東京支店です。\"}\n",
);

fn decode_in_pieces(bytes: &[u8], cuts: &[usize]) -> Vec<StreamFrame> {
    let mut decoder = FrameDecoder::new();
    let mut frames = Vec::new();
    let mut start = 0;
    for &cut in cuts.iter().chain(std::iter::once(&bytes.len())) {
        frames.extend(decoder.push(&bytes[start..cut]));
        start = cut;
    }
    frames.extend(decoder.finish());
    frames
}

/// Test every single split point of the body
#[test]
fn test_every_split_point_yields_same_frames() {
    let bytes = BODY.as_bytes();
    let expected = decode_in_pieces(bytes, &[]);
    assert_eq!(expected.len(), 4);
    assert_eq!(expected[0].message, "質問の意図を分析しています");
    assert_eq!(expected[3].message, "売上が最も高いのは東京支店です。");

    for cut in 1..bytes.len() {
        let frames = decode_in_pieces(bytes, &[cut]);
        assert_eq!(frames, expected, "split at byte {} changed the result", cut);
    }
}

/// Test byte-at-a-time delivery
#[test]
fn test_one_byte_chunks() {
    let bytes = BODY.as_bytes();
    let cuts: Vec<usize> = (1..bytes.len()).collect();
    assert_eq!(decode_in_pieces(bytes, &cuts), decode_in_pieces(bytes, &[]));
}

/// Test a multi-MiB final answer trickling in as 1 KiB chunks.
///
/// The carried-over tail must not be rescanned on every chunk, otherwise this
/// takes seconds and starves the session timer.
#[test]
fn test_large_line_in_small_chunks() {
    let answer = "回答".repeat(700_000);
    let line = format!(
        "{{\"step\":\"final_answer\",\"message\":\"{}\",\"data\":{{\"source_documents\":[]}}}}\n",
        answer
    );
    let bytes = line.as_bytes();
    assert!(bytes.len() > 4 * 1024 * 1024);

    let started = std::time::Instant::now();
    let mut decoder = FrameDecoder::new();
    let mut frames = Vec::new();
    for chunk in bytes.chunks(1024) {
        frames.extend(decoder.push(chunk));
    }
    let elapsed = started.elapsed();

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].message, answer);
    assert_eq!(decoder.pending_bytes(), 0);
    assert!(
        elapsed < std::time::Duration::from_secs(3),
        "decoding took {:?}",
        elapsed
    );
}

/// Test that a null message still yields the step
#[test]
fn test_null_message_is_not_dropped() {
    let body = "{\"step\":\"identify_column\",\"message\":null}\n{\"step\":\"docs_retrieved\",\"message\":null}\n";
    let mut decoder = FrameDecoder::new();
    let frames = decoder.push(body.as_bytes());

    let steps: Vec<&str> = frames.iter().map(|f| f.step.as_str()).collect();
    assert_eq!(steps, vec!["identify_column", "docs_retrieved"]);
    assert!(frames.iter().all(|f| f.message.is_empty()));
    assert_eq!(decoder.dropped(), 0);
}

/// Test that a bad line in the middle is dropped and counted
#[test]
fn test_malformed_line_is_skipped() {
    let body = "{\"step\":\"process_start\",\"message\":\"a\"}\nnot json at all\n{\"step\":\"final_answer\",\"message\":\"b\"}\n";
    let mut decoder = FrameDecoder::new();
    let frames = decoder.push(body.as_bytes());

    let steps: Vec<&str> = frames.iter().map(|f| f.step.as_str()).collect();
    assert_eq!(steps, vec!["process_start", "final_answer"]);
    assert_eq!(decoder.dropped(), 1);
}

/// Test the final line without a trailing newline
#[test]
fn test_unterminated_last_line() {
    let mut decoder = FrameDecoder::new();
    assert!(decoder
        .push(b"{\"step\":\"final_answer\",\"message\":\"tail\"}")
        .is_empty());
    assert!(decoder.pending_bytes() > 0);

    let last = decoder.finish().expect("buffered frame should be flushed");
    assert_eq!(last.message, "tail");
    assert_eq!(decoder.pending_bytes(), 0);
}

/// Test the lazy stream over a chunked body
#[tokio::test]
async fn test_decode_frames_over_chunked_body() {
    let chunks: Vec<Result<Vec<u8>, ChatError>> = BODY
        .as_bytes()
        .chunks(5)
        .map(|c| Ok(c.to_vec()))
        .collect();

    let frames: Vec<StreamFrame> = decode_frames(stream::iter(chunks).boxed())
        .map(|f| f.expect("no transport error expected"))
        .collect()
        .await;

    assert_eq!(frames, decode_in_pieces(BODY.as_bytes(), &[]));
    assert_eq!(frames[2].data, Some(serde_json::json!({"count": 3})));
}

/// Test that a transport error ends the stream after frames already decoded
#[tokio::test]
async fn test_transport_error_ends_stream() {
    let chunks: Vec<Result<Vec<u8>, ChatError>> = vec![
        Ok(b"{\"step\":\"process_start\",\"message\":\"\"}\n".to_vec()),
        Err(ChatError::Transport("reset".to_string())),
        Ok(b"{\"step\":\"final_answer\",\"message\":\"never\"}\n".to_vec()),
    ];

    let items: Vec<Result<StreamFrame, ChatError>> =
        decode_frames(stream::iter(chunks).boxed()).collect().await;

    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert_eq!(items[1], Err(ChatError::Transport("reset".to_string())));
}
