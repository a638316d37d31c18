use futures_util::{Stream, StreamExt};

use crate::decoder::{Decoded, StreamDecoder};

/// Decode a body of byte chunks into a stream of `Decoded` events.
///
/// The next chunk is only pulled once every complete line of the current one
/// has been yielded. The stream ends right after `Done`, or after the body
/// closes (with a final `Truncated` if undecoded data was left behind).
/// A chunk error is yielded as-is and ends the stream.
pub fn decode_stream<S, B, E>(
    body: S,
    max_pending_bytes: usize,
) -> impl Stream<Item = Result<Decoded, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    async_stream::try_stream! {
        let mut decoder = StreamDecoder::with_max_pending(max_pending_bytes);
        futures_util::pin_mut!(body);

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for event in decoder.feed(chunk.as_ref()) {
                yield event;
            }
            if decoder.is_finished() {
                break;
            }
        }

        if let Some(tail) = decoder.finish() {
            yield tail;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[tokio::test]
    async fn decodes_chunked_body() {
        let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"He".to_vec()),
            Ok(b"llo\"}}]}\n\ndata: [DO".to_vec()),
            Ok(b"NE]\n\n".to_vec()),
        ];
        let events: Vec<_> = decode_stream(stream::iter(chunks), 1024)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(events, vec![Decoded::Delta("Hello".into()), Decoded::Done]);
    }

    #[tokio::test]
    async fn stops_pulling_after_sentinel() {
        let chunks = stream::iter(vec![Ok::<_, std::io::Error>(b"data: [DONE]\n".to_vec())])
            .chain(stream::pending());
        let events: Vec<_> = decode_stream(chunks, 1024).collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Ok(Decoded::Done)));
    }

    #[tokio::test]
    async fn read_error_is_forwarded() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n".to_vec()),
            Err("connection reset".to_string()),
        ];
        let events: Vec<_> = decode_stream(stream::iter(chunks), 1024).collect().await;
        assert_eq!(events[0], Ok(Decoded::Delta("a".into())));
        assert_eq!(events[1], Err("connection reset".to_string()));
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn truncated_tail_is_reported_last() {
        let chunks = vec![Ok::<_, std::io::Error>(b"data: {\"choi".to_vec())];
        let events: Vec<_> = decode_stream(stream::iter(chunks), 1024).collect().await;
        assert!(matches!(
            events.as_slice(),
            [Ok(Decoded::Truncated { discarded_bytes: 12 })]
        ));
    }
}
