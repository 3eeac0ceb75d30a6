//! # 세션 저장소 클라이언트
//!
//! 캡처 클라이언트가 세션 저장소를 호출하는 경계입니다.
//! `SessionStore` 트레이트로 추상화하여 런타임은 HTTP 구현(`HttpSessionStore`)과
//! 테스트용 가짜 저장소를 구분하지 않습니다.
//!
//! 세션은 미디어 키(`SessionTarget::Media`, 로그인 필요) 또는
//! 방 ID(`SessionTarget::Room`, 익명 허용)로 주소를 지정합니다.

use crate::models::{
    AppendLinesRequest, LinkRoomRequest, NewLine, RemoveLinesRequest, SessionView,
    UpdateTimerRequest,
};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::future::Future;
use thiserror::Error;

/// 세션 주소: 서버의 `SessionKey`에서 사용자 ID를 뺀 형태 (사용자는 토큰으로 식별)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionTarget {
    Media(String),
    Room(String),
}

impl SessionTarget {
    pub fn is_media(&self) -> bool {
        matches!(self, SessionTarget::Media(_))
    }

    /// 로컬 저장소에서 경과 시간을 보관하는 키
    pub fn local_key(&self) -> String {
        match self {
            SessionTarget::Media(id) => format!("media:{}", id),
            SessionTarget::Room(id) => format!("room:{}", id),
        }
    }

    fn path(&self) -> String {
        match self {
            SessionTarget::Media(id) => format!("texthooker/media/{}", id),
            SessionTarget::Room(id) => format!("texthooker/rooms/{}", id),
        }
    }
}

/// 영속화 작업 하나: 런타임의 저장 작업자가 순서대로 실행합니다
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    AppendLines(Vec<NewLine>),
    RemoveLines(Vec<String>),
    ClearLines,
    UpdateTimer(u64),
    /// 미디어 세션에 방 ID를 연결 (호스트가 방을 만든 직후)
    LinkRoom(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    Decode(String),
}

/// 세션 저장소 연산
///
/// 런타임이 저장 작업자 태스크 안에서 호출하므로 반환 Future는 `Send`여야 합니다.
pub trait SessionStore: Send + Sync + 'static {
    /// 없는 세션은 에러가 아니라 `exists: false`인 빈 세션입니다.
    fn get_session(
        &self,
        target: &SessionTarget,
    ) -> impl Future<Output = Result<SessionView, StoreError>> + Send;

    /// 같은 ID의 문장은 중복 저장되지 않습니다. 새로 저장된 개수를 반환합니다.
    fn append_lines(
        &self,
        target: &SessionTarget,
        lines: &[NewLine],
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    fn remove_lines(
        &self,
        target: &SessionTarget,
        line_ids: &[String],
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    fn clear_lines(
        &self,
        target: &SessionTarget,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    fn update_timer(
        &self,
        target: &SessionTarget,
        seconds: u64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete_session(
        &self,
        target: &SessionTarget,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn room_exists(&self, room_id: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn link_room(
        &self,
        media_id: &str,
        room_id: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// `StoreCall` 하나를 실행합니다.
pub async fn execute<S: SessionStore>(
    store: &S,
    target: &SessionTarget,
    call: &StoreCall,
) -> Result<(), StoreError> {
    match call {
        StoreCall::AppendLines(lines) => {
            store.append_lines(target, lines).await?;
        }
        StoreCall::RemoveLines(ids) => {
            store.remove_lines(target, ids).await?;
        }
        StoreCall::ClearLines => {
            store.clear_lines(target).await?;
        }
        StoreCall::UpdateTimer(seconds) => store.update_timer(target, *seconds).await?,
        StoreCall::LinkRoom(room_id) => match target {
            SessionTarget::Media(media_id) => store.link_room(media_id, room_id).await?,
            // 방 세션은 이미 방 ID로 주소가 지정됨
            SessionTarget::Room(_) => {}
        },
    }
    Ok(())
}

#[derive(Deserialize)]
struct Inserted {
    inserted: u64,
}

#[derive(Deserialize)]
struct Removed {
    removed: u64,
}

#[derive(Deserialize)]
struct Exists {
    exists: bool,
}

/// REST API(`/api/v1/texthooker/...`)를 호출하는 저장소 구현
#[derive(Debug, Clone)]
pub struct HttpSessionStore {
    http: reqwest::Client,
    /// 예: `http://127.0.0.1:3000/api/v1`
    base_url: String,
    access_token: Option<String>,
}

impl HttpSessionStore {
    pub fn new(base_url: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
        }
    }

    fn request(
        &self,
        method: Method,
        target: &SessionTarget,
        suffix: &str,
    ) -> Result<RequestBuilder, StoreError> {
        // 미디어 세션은 사용자 컨텍스트가 필수
        if target.is_media() && self.access_token.is_none() {
            return Err(StoreError::NotAuthenticated);
        }
        let url = format!("{}/{}{}", self.base_url, target.path(), suffix);
        Ok(self.authorize(self.http.request(method, url)))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Response, StoreError> {
        let response = builder.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(StoreError::NotAuthenticated);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn send_json<T: serde::de::DeserializeOwned>(builder: RequestBuilder) -> Result<T, StoreError> {
        Self::send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

impl SessionStore for HttpSessionStore {
    async fn get_session(&self, target: &SessionTarget) -> Result<SessionView, StoreError> {
        Self::send_json(self.request(Method::GET, target, "")?).await
    }

    async fn append_lines(&self, target: &SessionTarget, lines: &[NewLine]) -> Result<u64, StoreError> {
        let body = AppendLinesRequest {
            lines: lines.to_vec(),
        };
        let builder = self.request(Method::POST, target, "/lines")?.json(&body);
        Ok(Self::send_json::<Inserted>(builder).await?.inserted)
    }

    async fn remove_lines(&self, target: &SessionTarget, line_ids: &[String]) -> Result<u64, StoreError> {
        let body = RemoveLinesRequest {
            line_ids: line_ids.to_vec(),
        };
        let builder = self.request(Method::DELETE, target, "/lines")?.json(&body);
        Ok(Self::send_json::<Removed>(builder).await?.removed)
    }

    async fn clear_lines(&self, target: &SessionTarget) -> Result<u64, StoreError> {
        let builder = self.request(Method::POST, target, "/clear")?;
        Ok(Self::send_json::<Removed>(builder).await?.removed)
    }

    async fn update_timer(&self, target: &SessionTarget, seconds: u64) -> Result<(), StoreError> {
        let body = UpdateTimerRequest {
            seconds: i64::try_from(seconds).unwrap_or(i64::MAX),
        };
        Self::send(self.request(Method::PUT, target, "/timer")?.json(&body)).await?;
        Ok(())
    }

    async fn delete_session(&self, target: &SessionTarget) -> Result<(), StoreError> {
        Self::send(self.request(Method::DELETE, target, "")?).await?;
        Ok(())
    }

    async fn room_exists(&self, room_id: &str) -> Result<bool, StoreError> {
        let target = SessionTarget::Room(room_id.to_string());
        let builder = self.request(Method::GET, &target, "/exists")?;
        Ok(Self::send_json::<Exists>(builder).await?.exists)
    }

    async fn link_room(&self, media_id: &str, room_id: &str) -> Result<(), StoreError> {
        let target = SessionTarget::Media(media_id.to_string());
        let body = LinkRoomRequest {
            room_id: room_id.to_string(),
        };
        Self::send(self.request(Method::PUT, &target, "/room")?.json(&body)).await?;
        Ok(())
    }
}
