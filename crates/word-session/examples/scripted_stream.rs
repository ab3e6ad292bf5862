use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt as _;
use word_session::prelude::*;
use word_session::{init_observability, sse_event_stream};

/// Serves a canned `text/event-stream` body, cut at awkward offsets.
struct ScriptedSource {
    body: &'static str,
}

#[async_trait::async_trait]
impl EventSource for ScriptedSource {
    async fn open(&self, request: &StreamRequest) -> Result<EventStream, SourceError> {
        let body: &'static str = self.body;
        let cuts = [0, 40, 97, 131, body.len()];
        let chunks: Vec<Result<Bytes, std::io::Error>> = cuts
            .windows(2)
            .map(|w| Ok(Bytes::from_static(&body.as_bytes()[w[0]..w[1]])))
            .collect();
        Ok(sse_event_stream(
            futures::stream::iter(chunks),
            request.signal().clone(),
        ))
    }
}

const BODY: &str = concat!(
    "event: metadata\n",
    "data: {\"versions\":[{\"id\":\"v1\",\"markdown\":\"old\"}],\"activeVersionId\":\"v1\",\"reviewer\":\"r1\"}\n\n",
    "event: chunk\n",
    "data: {\"id\":\"v2\",\"term\":\"test\",\n\n",
    "event: chunk\n",
    "data: \"markdown\":\"a procedure to establish quality\"}\n\n",
    "data: [DONE]\n\n",
);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), SessionError> {
    init_observability();

    let streamer = WordStreamer::builder()
        .source(Arc::new(ScriptedSource { body: BODY }))
        .options(SessionOptions::from_env())
        .build()?;

    let request = StreamRequest::builder("demo-user", "test", "words:test:ENGLISH")
        .language("ENGLISH")
        .flavor("BILINGUAL")
        .build()?;

    let mut session = streamer.session(request);
    {
        let mut updates = session.stream();
        while let Some(update) = updates.next().await {
            print!("{}", update?.chunk);
        }
    }
    println!();

    let payload = session.store_payload()?;
    println!(
        "stored {} version(s) under {}, active {:?}",
        payload.versions.len(),
        payload.key,
        payload.options.active_version_id
    );
    Ok(())
}
