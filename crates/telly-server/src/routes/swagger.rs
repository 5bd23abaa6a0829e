//! OpenAPI Documentation
//!
//! Centralized API documentation using utoipa.

use utoipa::OpenApi;

use crate::models::{
    AppendEventRequest,
    BackfillRequest,
    // Session models
    CaptureMemoryRequest,
    CaptureResponse,
    CloseEpisodeRequest,
    ContextEntryResponse,
    ContextResponse,
    ConversationTurnResponse,
    // Memory models
    CreateMemoryRequest,
    EpisodeHitResponse,
    EpisodeResponse,
    EpisodeSearchRequest,
    EpisodeSearchResponse,
    EventResponse,
    LinkMemoryRequest,
    MemoryResponse,
    MetricsResponse,
    RecallResponse,
    RecordMessageRequest,
    RecordMessageResponse,
    // Transcript models
    SaveTranscriptRequest,
    SaveTranscriptResponse,
    ScoredMemoryResponse,
    SearchMemoriesRequest,
    // Episode models
    StartEpisodeRequest,
    SweepResponse,
    TranscriptHitResponse,
    TranscriptResponse,
    TranscriptSearchRequest,
    TranscriptSearchResponse,
    TranscriptStatsResponse,
};
use crate::HealthCheck;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::health_check,
        // Memory endpoints
        super::memory::add_memory,
        super::memory::search_memories,
        super::memory::get_memory,
        super::memory::recall_memory,
        super::memory::delete_memory,
        // Session endpoints
        super::session::capture_memory,
        super::session::recent_memories,
        super::session::search_session,
        super::session::recall_session_memory,
        super::session::clear_session,
        super::session::turn_context,
        super::session::record_message,
        super::session::session_episodes,
        // Episode endpoints
        super::episode::start_episode,
        super::episode::append_event,
        super::episode::close_episode,
        super::episode::backfill_episode,
        super::episode::link_memory,
        super::episode::get_episode,
        super::episode::conversation_history,
        super::episode::list_active,
        super::episode::search_episodes,
        super::episode::sweep_idle,
        // Transcript endpoints
        super::transcript::save_transcript,
        super::transcript::recent_transcripts,
        super::transcript::transcript_stats,
        super::transcript::get_by_url,
        super::transcript::search_transcripts,
        super::transcript::get_transcript,
        super::transcript::related_transcripts,
    ),
    info(
        title = "Telly Memory API",
        version = "0.1.0",
        description = "Memory subsystem for a conversational assistant: short-term buffers, a long-term vector store, episodic recording and a transcript store.",
        license(name = "MIT"),
    ),
    servers(
        (url = "/", description = "Current server"),
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Memory", description = "Long-term memory store"),
        (name = "Session", description = "Short-term memory, chat turns and turn context"),
        (name = "Episode", description = "Episodic recorder"),
        (name = "Transcript", description = "Transcript store with semantic search"),
    ),
    components(
        schemas(
            HealthCheck,
            // Memory
            CreateMemoryRequest,
            SearchMemoriesRequest,
            MemoryResponse,
            ScoredMemoryResponse,
            // Session
            CaptureMemoryRequest,
            CaptureResponse,
            RecallResponse,
            ContextEntryResponse,
            ContextResponse,
            RecordMessageRequest,
            RecordMessageResponse,
            // Episode
            StartEpisodeRequest,
            AppendEventRequest,
            CloseEpisodeRequest,
            BackfillRequest,
            LinkMemoryRequest,
            EpisodeSearchRequest,
            EventResponse,
            MetricsResponse,
            EpisodeResponse,
            EpisodeHitResponse,
            EpisodeSearchResponse,
            ConversationTurnResponse,
            SweepResponse,
            // Transcript
            SaveTranscriptRequest,
            SaveTranscriptResponse,
            TranscriptResponse,
            TranscriptSearchRequest,
            TranscriptHitResponse,
            TranscriptSearchResponse,
            TranscriptStatsResponse,
        )
    ),
)]
pub struct ApiDoc;
