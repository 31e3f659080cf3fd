//! biosketch-core: catalogs, intent classification, reply parsing and drawing timelines.
//!
//! ```text
//! transcript ──► Responder (keyword | symptom | hosted | streaming)
//!                   │
//!                   ├─► AssistantReply { text, events }  ──► speech
//!                   └─► Timeline (estimated duration)     ──► illustration player
//! ```

pub mod catalog;
pub mod chat;
pub mod classifier;
pub mod config;
pub mod error;
pub mod message;
pub mod prompts;
pub mod reply;
pub mod responder;
pub mod stream;
pub mod subtitles;
pub mod timeline;

pub use catalog::{is_known_drawing, Catalog, KeywordEntry, SymptomEntry, DEFAULT_DRAWING, DRAWINGS, GENERAL_CATEGORY};
pub use chat::ChatClient;
pub use classifier::{KeywordClassifier, SymptomClassifier};
pub use config::{ClassifierMode, RenderMode, SpeechMode, StudioConfig, DEFAULT_CONFIG_FILE};
pub use error::{SketchError, SketchResult};
pub use message::{ActionLog, Conversation, Message, Role, ACTION_LOG_CAPACITY};
pub use reply::{parse_reply, strip_viz_markers, AssistantReply, ReplyFormat};
pub use responder::{
    build_responder, HostedResponder, KeywordResponder, Responder, Response, StreamingResponder,
    SymptomResponder, FALLBACK_REPLY, NO_KEYWORDS_ACTION,
};
pub use stream::{MarkerFilter, SseDecoder, SseEvent};
pub use subtitles::Subtitles;
pub use timeline::{estimate_duration, Timeline, TimelineEvent};
