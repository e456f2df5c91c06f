use views_store::ResultStore;

use crate::{
    bili::{SubtitleSource, VideoSource},
    llm::ChatModel,
    DigestProcessor,
};

/// Type-state builder: `build` is only available once the video source,
/// subtitle source and chat model are set. The result store is optional;
/// without one the processor can extract but not `run`.
pub struct DigestProcessorBuilder<V = (), S = (), M = (), R = ()> {
    video_source: V,
    subtitle_source: S,
    chat_model: M,
    store: R,
}

impl DigestProcessorBuilder {
    pub fn new() -> Self {
        Self {
            video_source: (),
            subtitle_source: (),
            chat_model: (),
            store: (),
        }
    }
}

impl Default for DigestProcessorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, S, M, R> DigestProcessorBuilder<V, S, M, R> {
    pub fn video_source<V2: VideoSource + Send + Sync>(
        self,
        video_source: V2,
    ) -> DigestProcessorBuilder<V2, S, M, R> {
        DigestProcessorBuilder {
            video_source,
            subtitle_source: self.subtitle_source,
            chat_model: self.chat_model,
            store: self.store,
        }
    }

    pub fn subtitle_source<S2: SubtitleSource + Send + Sync>(
        self,
        subtitle_source: S2,
    ) -> DigestProcessorBuilder<V, S2, M, R> {
        DigestProcessorBuilder {
            video_source: self.video_source,
            subtitle_source,
            chat_model: self.chat_model,
            store: self.store,
        }
    }

    pub fn chat_model<M2: ChatModel + Send + Sync>(
        self,
        chat_model: M2,
    ) -> DigestProcessorBuilder<V, S, M2, R> {
        DigestProcessorBuilder {
            video_source: self.video_source,
            subtitle_source: self.subtitle_source,
            chat_model,
            store: self.store,
        }
    }

    pub fn result_store<R2: ResultStore + Send + Sync>(
        self,
        store: R2,
    ) -> DigestProcessorBuilder<V, S, M, R2> {
        DigestProcessorBuilder {
            video_source: self.video_source,
            subtitle_source: self.subtitle_source,
            chat_model: self.chat_model,
            store,
        }
    }
}

impl<V, S, M, R> DigestProcessorBuilder<V, S, M, R>
where
    V: VideoSource + Send + Sync,
    S: SubtitleSource + Send + Sync,
    M: ChatModel + Send + Sync,
{
    pub fn build(self) -> DigestProcessor<V, S, M, R> {
        DigestProcessor {
            video_source: self.video_source,
            subtitle_source: self.subtitle_source,
            chat_model: self.chat_model,
            store: self.store,
        }
    }
}
