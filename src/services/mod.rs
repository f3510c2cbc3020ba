/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Sign-in and sign-out of play sessions.
pub mod identity_service;
/// Week listing and leaderboard reads.
pub mod leaderboard_service;
/// Play sessions and the trivia round they host.
pub mod round_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// Backend connection supervisor driving degraded mode.
pub mod storage_supervisor;
