// src/api/http/chat.rs
// POST/GET /chat, DELETE /chat/{id} (spec.md §6). Wires ADMIT (C1), GUARD
// (C9), the loop driver (C11), and the SSE transport (C12) together.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::agent::guardrail::{self, Classification};
use crate::agent::{run_loop, stream_refusal, LoopDeps, MessageRole, SystemContext};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::stream::StreamEvent;

#[derive(Debug, Deserialize)]
pub struct InputMessage {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatTurnRequest {
    pub messages: Vec<InputMessage>,
    pub chat_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ResumeQuery {
    #[serde(rename = "chatId")]
    pub chat_id: Uuid,
}

type SseStream = std::pin::Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

fn authenticate(headers: &HeaderMap, jwt_secret: &str) -> AppResult<String> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    let token = header.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;
    let claims = crate::auth::verify_token(token, jwt_secret).map_err(|_| AppError::Unauthorized)?;
    Ok(claims.sub)
}

fn sse_from_broadcast(rx: tokio::sync::broadcast::Receiver<StreamEvent>) -> Sse<SseStream> {
    let stream = BroadcastStream::new(rx).map(|item| {
        let event = match item {
            Ok(ev) => ev.to_sse_event(),
            Err(_lagged) => Event::default().event("error").data("stream lagged, some events were dropped"),
        };
        Ok(event)
    });
    Sse::new(Box::pin(stream) as SseStream).keep_alive(KeepAlive::default())
}

pub async fn post_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ChatTurnRequest>,
) -> AppResult<impl IntoResponse> {
    let user_id = authenticate(&headers, &state.config.providers.jwt_secret)?;

    if req.messages.is_empty() {
        return Err(AppError::EmptyMessages);
    }

    state.rate_limiter.admit(&user_id).await?;

    let (chat, is_new) = match req.chat_id {
        Some(id) => {
            let chat = state
                .chats
                .get_chat(id, &user_id)
                .await
                .map_err(AppError::Storage)?
                .ok_or(AppError::NotFound)?;
            (chat, false)
        }
        None => {
            let title = req
                .messages
                .first()
                .map(|m| m.content.chars().take(60).collect::<String>())
                .unwrap_or_else(|| "New chat".to_string());
            let chat = state.chats.create_chat(&user_id, &title).await.map_err(AppError::Storage)?;
            (chat, true)
        }
    };

    for m in &req.messages {
        state
            .chats
            .append_message(chat.id, m.role, &m.content)
            .await
            .map_err(AppError::Storage)?;
    }

    let history = state.chats.list_messages(chat.id).await.map_err(AppError::Storage)?;
    let user_question = req
        .messages
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default();
    let location_context = headers
        .get("x-location-context")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let ctx = SystemContext::new(location_context, history);

    let (broadcast_tx, broadcast_rx) = state.streams.start(chat.id).await;
    let (events_tx, mut events_rx) = mpsc::channel::<StreamEvent>(128);

    tokio::spawn(async move {
        while let Some(ev) = events_rx.recv().await {
            let _ = broadcast_tx.send(ev);
        }
    });

    if is_new {
        let _ = events_tx.send(StreamEvent::NewChatCreated { chat_id: chat.id }).await;
    }

    let state_for_task = state.clone();
    let chat_id = chat.id;
    tokio::spawn(async move {
        run_conversation(state_for_task, chat_id, ctx, user_question, events_tx).await;
    });

    Ok(sse_from_broadcast(broadcast_rx))
}

/// GUARD → LOOP/REFUSE → onFinish, driven off the HTTP request task so the
/// SSE response can be returned immediately.
async fn run_conversation(
    state: Arc<AppState>,
    chat_id: Uuid,
    mut ctx: SystemContext,
    user_question: String,
    events: mpsc::Sender<StreamEvent>,
) {
    let cancel = CancellationToken::new();
    let deps = LoopDeps {
        llm: state.llm.as_ref(),
        search: state.search.as_ref(),
        scrape: state.scrape.as_ref(),
        cache: &state.cache,
        config: &state.config.agent,
    };

    let verdict = guardrail::classify(state.llm.as_ref(), &ctx).await;
    let final_text = if verdict.classification == Classification::Refuse {
        stream_refusal(&deps, verdict.reason.as_deref(), Uuid::new_v4(), &cancel, &events).await
    } else {
        let (_outcome, text) = run_loop(&deps, &mut ctx, &user_question, Uuid::new_v4(), &cancel, &events).await;
        text
    };

    if !final_text.is_empty() {
        let _ = state.chats.append_message(chat_id, MessageRole::Assistant, &final_text).await;
    }
    state.streams.finish(chat_id);
}

pub async fn get_chat(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ResumeQuery>,
) -> AppResult<impl IntoResponse> {
    match state.streams.subscribe(q.chat_id) {
        Some(rx) => Ok(sse_from_broadcast(rx)),
        None => Err(AppError::NotFound),
    }
}

pub async fn delete_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let user_id = authenticate(&headers, &state.config.providers.jwt_secret)?;
    let deleted = state.chats.delete_chat(id, &user_id).await.map_err(AppError::Storage)?;
    if deleted {
        Ok(axum::http::StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
