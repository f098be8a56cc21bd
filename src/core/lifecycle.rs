//! 请求生命周期管理：一次用户提交从头到尾的完整流程
//!
//! 校验并加锁 → 乐观追加用户消息 → 发送请求 → 分类响应 → 恰好一次终态更新 → 解锁。
//! 解锁由 InFlightGuard 的 Drop 完成，不在每个返回点重复清理。

use tracing::{debug, error, info, warn};

use crate::api::{classify_response, ChatApi, ChatRequest};
use crate::core::{ChatError, ChatSession, SkipReason};
use crate::memory::{now_timestamp, Role};

/// 一轮提交的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// 未发请求、不通知用户
    Skipped(SkipReason),
    /// 已追加助手回复
    Succeeded,
    /// 已报告失败；对话记录中只保留用户消息
    Failed(ChatError),
}

impl TurnOutcome {
    /// 需要提示给用户的文本（仅失败时有）
    pub fn notice_text(&self) -> Option<String> {
        match self {
            TurnOutcome::Failed(e) => Some(e.user_message()),
            _ => None,
        }
    }
}

/// 提交一轮对话。空输入或已有请求在途时直接返回，不修改任何状态。
pub async fn submit_turn(
    session: &mut ChatSession,
    api: &dyn ChatApi,
    raw_input: &str,
) -> TurnOutcome {
    let message = raw_input.trim();
    if message.is_empty() {
        debug!("Empty input, submission skipped");
        return TurnOutcome::Skipped(SkipReason::EmptyInput);
    }
    let Some(guard) = session.try_begin_turn() else {
        debug!("Turn already in flight, submission skipped");
        return TurnOutcome::Skipped(SkipReason::TurnInFlight);
    };

    let result = run_turn(session, api, message).await;

    drop(guard);
    session.publish();

    match result {
        Ok(()) => TurnOutcome::Succeeded,
        Err(e) => TurnOutcome::Failed(e),
    }
}

async fn run_turn(
    session: &mut ChatSession,
    api: &dyn ChatApi,
    message: &str,
) -> Result<(), ChatError> {
    // 乐观更新：在网络返回之前就让用户看到自己的消息
    session.append_message(Role::User, message, now_timestamp())?;

    let request = ChatRequest::new(message, session.conversation_id());
    info!(
        conversation_id = request.conversation_id.as_deref().unwrap_or("-"),
        "Submitting chat turn"
    );

    let raw = api.post_chat(&request).await.map_err(|e| {
        error!(error = %e, "Chat request failed in transport");
        e
    })?;

    let response = classify_response(raw.is_success(), &raw.body).map_err(|e| {
        match &e {
            ChatError::MalformedSuccess(detail) => {
                warn!(status = raw.status, detail = %detail, "Malformed success body")
            }
            other => warn!(status = raw.status, error = %other, "Chat endpoint returned an error"),
        }
        e
    })?;

    session.record_usage(response.token_usage.total_tokens);
    session.set_conversation_id(response.conversation_id);
    session.append_message(Role::Assistant, response.response, response.created_at)?;

    info!(
        conversation_id = session.conversation_id().unwrap_or("-"),
        total_tokens = session.total_tokens(),
        "Chat turn completed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockChatApi, RawResponse};
    use crate::core::error::{GENERIC_TRANSPORT_ERROR, MALFORMED_SUCCESS_ERROR};
    use crate::core::UiState;
    use async_trait::async_trait;
    use tokio::sync::watch;

    #[tokio::test]
    async fn test_scenario_first_turn_sets_conversation_id() {
        let api = MockChatApi::new();
        api.push_success("Hi there", "c1", "2024-01-01T00:00:00Z", 5);
        let mut session = ChatSession::new();

        let outcome = submit_turn(&mut session, &api, "Hello").await;

        assert_eq!(outcome, TurnOutcome::Succeeded);
        let sent = api.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], ChatRequest::new("Hello", None));

        let msgs = session.messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!((msgs[0].role, msgs[0].content.as_str()), (Role::User, "Hello"));
        assert_eq!(
            (msgs[1].role, msgs[1].content.as_str()),
            (Role::Assistant, "Hi there")
        );
        assert_eq!(msgs[1].timestamp, "2024-01-01T00:00:00Z");
        assert_eq!(session.conversation_id(), Some("c1"));
        assert_eq!(session.total_tokens(), 5);
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn test_scenario_second_turn_carries_conversation_id() {
        let api = MockChatApi::new();
        api.push_success("Hi there", "c1", "2024-01-01T00:00:00Z", 5)
            .push_success("Fine", "c1", "2024-01-01T00:00:05Z", 7);
        let mut session = ChatSession::new();

        submit_turn(&mut session, &api, "Hello").await;
        submit_turn(&mut session, &api, "How are you").await;

        let sent = api.requests();
        assert_eq!(sent[1], ChatRequest::new("How are you", Some("c1")));
        let json = serde_json::to_value(&sent[1]).unwrap();
        assert_eq!(json["conversation_id"], "c1");
    }

    #[tokio::test]
    async fn test_input_is_trimmed() {
        let api = MockChatApi::new();
        let mut session = ChatSession::new();

        submit_turn(&mut session, &api, "  multi\nline  \n").await;

        assert_eq!(api.requests()[0].message, "multi\nline");
        assert_eq!(session.messages()[0].content, "multi\nline");
    }

    #[tokio::test]
    async fn test_whitespace_input_is_noop() {
        let api = MockChatApi::new();
        let mut session = ChatSession::new();

        let outcome = submit_turn(&mut session, &api, " \t\n ").await;

        assert_eq!(outcome, TurnOutcome::Skipped(SkipReason::EmptyInput));
        assert_eq!(api.request_count(), 0);
        assert!(session.messages().is_empty());
        assert_eq!(outcome.notice_text(), None);
    }

    #[tokio::test]
    async fn test_submission_refused_while_in_flight() {
        let api = MockChatApi::new();
        let mut session = ChatSession::new();
        let guard = session.try_begin_turn().unwrap();

        let outcome = submit_turn(&mut session, &api, "Hello").await;

        assert_eq!(outcome, TurnOutcome::Skipped(SkipReason::TurnInFlight));
        assert_eq!(api.request_count(), 0);
        assert!(session.messages().is_empty());
        drop(guard);
    }

    #[tokio::test]
    async fn test_rate_limited_reports_detail() {
        let api = MockChatApi::new();
        api.push_response(429, r#"{"detail":"rate limited"}"#);
        let mut session = ChatSession::new();

        let outcome = submit_turn(&mut session, &api, "Hello").await;

        assert_eq!(outcome.notice_text().as_deref(), Some("rate limited"));
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::User);
        assert_eq!(session.conversation_id(), None);
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn test_malformed_success_is_reported() {
        let api = MockChatApi::new();
        api.push_response(200, "not json");
        let mut session = ChatSession::new();

        let outcome = submit_turn(&mut session, &api, "Hello").await;

        assert!(matches!(outcome, TurnOutcome::Failed(ChatError::MalformedSuccess(_))));
        assert_eq!(outcome.notice_text().as_deref(), Some(MALFORMED_SUCCESS_ERROR));
        assert!(session
            .messages()
            .iter()
            .all(|m| m.role != Role::Assistant));
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_user_message() {
        let api = MockChatApi::new();
        api.push_transport_error("Connection failed: connection refused")
            .push_transport_error("");
        let mut session = ChatSession::new();

        let first = submit_turn(&mut session, &api, "Hello").await;
        assert_eq!(
            first.notice_text().as_deref(),
            Some("Connection failed: connection refused")
        );

        let second = submit_turn(&mut session, &api, "Again").await;
        assert_eq!(second.notice_text().as_deref(), Some(GENERIC_TRANSPORT_ERROR));

        let contents: Vec<&str> = session.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["Hello", "Again"]);
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn test_failure_does_not_clear_existing_conversation_id() {
        let api = MockChatApi::new();
        api.push_success("Hi", "c1", "2024-01-01T00:00:00Z", 1)
            .push_response(500, "")
            .push_success("Back", "c1", "2024-01-01T00:01:00Z", 1);
        let mut session = ChatSession::new();

        submit_turn(&mut session, &api, "one").await;
        submit_turn(&mut session, &api, "two").await;
        assert_eq!(session.conversation_id(), Some("c1"));
        submit_turn(&mut session, &api, "three").await;

        let sent = api.requests();
        assert_eq!(sent[1].conversation_id.as_deref(), Some("c1"));
        assert_eq!(sent[2].conversation_id.as_deref(), Some("c1"));
        assert_eq!(session.messages().len(), 5);
    }

    #[tokio::test]
    async fn test_conversation_id_replaced_by_latest_response() {
        let api = MockChatApi::new();
        api.push_success("a", "c1", "2024-01-01T00:00:00Z", 1)
            .push_success("b", "c2", "2024-01-01T00:00:01Z", 1)
            .push_success("c", "c2", "2024-01-01T00:00:02Z", 1);
        let mut session = ChatSession::new();

        for input in ["one", "two", "three"] {
            submit_turn(&mut session, &api, input).await;
        }

        let ids: Vec<Option<String>> = api
            .requests()
            .into_iter()
            .map(|r| r.conversation_id)
            .collect();
        assert_eq!(ids, vec![None, Some("c1".into()), Some("c2".into())]);
    }

    #[tokio::test]
    async fn test_successful_turns_alternate_roles() {
        let api = MockChatApi::new();
        let mut session = ChatSession::new();
        let n = 4;

        for i in 0..n {
            let outcome = submit_turn(&mut session, &api, &format!("message {}", i)).await;
            assert_eq!(outcome, TurnOutcome::Succeeded);
        }

        let msgs = session.messages();
        assert_eq!(msgs.len(), 2 * n);
        for (i, m) in msgs.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(m.role, expected);
        }
        assert_eq!(msgs[4].content, "message 2");
    }

    /// 在请求发出时检查 UI 已经看到乐观追加的用户消息且处于锁定状态
    struct ObservingApi {
        rx: watch::Receiver<UiState>,
    }

    #[async_trait]
    impl ChatApi for ObservingApi {
        async fn post_chat(&self, request: &ChatRequest) -> Result<RawResponse, ChatError> {
            let state = self.rx.borrow().clone();
            assert!(state.input_locked);
            assert_eq!(state.history.len(), 1);
            assert_eq!(state.history[0].content, request.message);
            Ok(RawResponse::new(503, ""))
        }
    }

    #[tokio::test]
    async fn test_optimistic_update_visible_before_response() {
        let (tx, rx) = watch::channel(UiState::default());
        let api = ObservingApi { rx: rx.clone() };
        let mut session = ChatSession::new().with_observer(tx);

        let outcome = submit_turn(&mut session, &api, "Hello").await;

        assert!(matches!(outcome, TurnOutcome::Failed(ChatError::Server { .. })));
        let state = rx.borrow().clone();
        assert!(!state.input_locked);
        assert_eq!(state.history.len(), 1);
    }

    /// 发出请求时直接 panic，模拟轮次中途的意外异常
    struct PanickingApi;

    #[async_trait]
    impl ChatApi for PanickingApi {
        async fn post_chat(&self, _request: &ChatRequest) -> Result<RawResponse, ChatError> {
            panic!("transport blew up mid-turn");
        }
    }

    #[tokio::test]
    async fn test_in_flight_cleared_when_turn_panics() {
        use futures_util::FutureExt;
        use std::panic::AssertUnwindSafe;

        let mut session = ChatSession::new();
        let result = AssertUnwindSafe(submit_turn(&mut session, &PanickingApi, "Hello"))
            .catch_unwind()
            .await;

        assert!(result.is_err());
        assert!(!session.is_in_flight());
        let msgs = session.messages();
        assert_eq!(msgs.len(), 1);
        assert_eq!((msgs[0].role, msgs[0].content.as_str()), (Role::User, "Hello"));
        assert_eq!(session.conversation_id(), None);

        // 锁已释放，下一轮可以正常提交
        let api = MockChatApi::new();
        api.push_success("Hi there", "c1", "2024-01-01T00:00:00Z", 3);
        assert_eq!(
            submit_turn(&mut session, &api, "Again").await,
            TurnOutcome::Succeeded
        );
        assert_eq!(session.messages().len(), 3);
    }
}
