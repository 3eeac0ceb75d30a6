//! # 캡처 클라이언트 런타임
//!
//! `CaptureState`가 돌려준 `Effect`를 실제로 수행합니다:
//! - 저장소 호출 → 저장 작업자 태스크의 FIFO 큐 (문장 추가 순서 = 수집 순서)
//! - 릴레이 이벤트 → 릴레이 연결 태스크의 송신 큐
//! - 경과 시간 → 로컬 저장소 파일
//!
//! 저장소 호출은 수집 경로를 막지 않습니다. 로컬 상태는 즉시 바뀌고,
//! 영속화는 뒤에서 순서대로 진행되며 실패해도 로그만 남깁니다.
//!
//! `run()`은 하나의 `select!` 루프에서 타이머 틱, 체크포인트, 브리지/릴레이/붙여넣기 입력,
//! 종료 신호를 처리합니다. 종료 시 `teardown()`이 마지막 체크포인트를 보내고
//! 저장 큐가 빌 때까지 기다립니다.

use super::{
    bridge::{BridgeConnector, BridgeEvent, Reconnector},
    config::{CaptureConfig, RoomConfig},
    ingest::{parse_bridge_payload, Scratch},
    local::LocalStore,
    relay::{relay_loop, RelayEvent},
    state::{CaptureOptions, CaptureSource, CaptureState, ConnectionStatus, Effect},
    store::{execute, SessionStore, SessionTarget, StoreCall},
    timer::{reconcile, ActivityTimer},
};
use crate::{
    models::SessionView,
    relay::{ClientEvent, Role},
};
use std::{
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::MissedTickBehavior,
};

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const EVENT_BUFFER: usize = 256;

/// 클라이언트 인스턴스 설정 (`CaptureConfig`에서 세션 관련 부분만)
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub target: SessionTarget,
    pub auto_pause: Option<Duration>,
    pub options: CaptureOptions,
    pub checkpoint_interval: Duration,
}

impl From<&CaptureConfig> for ClientSettings {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            target: config.target.clone(),
            auto_pause: config.auto_pause,
            options: config.options,
            checkpoint_interval: config.checkpoint_interval,
        }
    }
}

/// 붙여넣기 영역에 `:`로 시작하는 문단을 넣으면 명령으로 처리합니다
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Toggle,
    Reset,
    Edit(u64),
    Clear,
    Delete(String),
    /// 마지막 문장 삭제
    Undo,
    Reconnect,
    Status,
}

impl Command {
    /// 명령이 아니면 `None`, 알 수 없는 명령이면 `Some(Err)`.
    pub fn parse(paragraph: &str) -> Option<Result<Command, String>> {
        let rest = paragraph.trim().strip_prefix(':')?;
        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();

        let command = match (name, arg) {
            ("toggle", None) => Ok(Command::Toggle),
            ("reset", None) => Ok(Command::Reset),
            ("edit", Some(secs)) => secs
                .parse()
                .map(Command::Edit)
                .map_err(|_| format!("invalid seconds: {}", secs)),
            ("clear", None) => Ok(Command::Clear),
            ("delete", Some(id)) => Ok(Command::Delete(id.to_string())),
            ("undo", None) => Ok(Command::Undo),
            ("reconnect", None) => Ok(Command::Reconnect),
            ("status", None) => Ok(Command::Status),
            _ => Err(format!("unknown command: {}", paragraph.trim())),
        };
        Some(command)
    }
}

/// `run()`이 기다리는 입력 채널들
pub struct Inputs {
    pub bridge: mpsc::Receiver<BridgeEvent>,
    pub relay: mpsc::Receiver<RelayEvent>,
    pub paste: mpsc::Receiver<Vec<u8>>,
}

pub struct CaptureClient<S: SessionStore> {
    state: CaptureState,
    store: Arc<S>,
    target: SessionTarget,
    local: LocalStore,
    scratch: Scratch,
    checkpoint_interval: Duration,
    persist_tx: mpsc::UnboundedSender<StoreCall>,
    persist_worker: JoinHandle<()>,
    relay_tx: Option<mpsc::UnboundedSender<ClientEvent>>,
    relay_task: Reconnector,
    bridge: Option<BridgeConnector>,
}

impl<S: SessionStore> CaptureClient<S> {
    /// 세션을 불러와 클라이언트를 만듭니다.
    ///
    /// 시작 경과 시간은 `max(로컬 저장값, 서버 값)`입니다.
    /// 세션 조회에 실패해도 빈 세션으로 계속합니다.
    pub async fn open(store: S, local: LocalStore, settings: ClientSettings, now: Instant) -> Self {
        let store = Arc::new(store);
        let view = match store.get_session(&settings.target).await {
            Ok(view) => view,
            Err(e) => {
                tracing::warn!("Failed to load session, starting empty: {}", e);
                SessionView::default()
            }
        };

        let server_timer = u64::try_from(view.timer_seconds).unwrap_or(0);
        let local_timer = local.elapsed(&settings.target.local_key());
        let elapsed = reconcile(local_timer, server_timer);
        tracing::info!(
            lines = view.lines.len(),
            server_timer,
            ?local_timer,
            elapsed,
            "Opened {:?}",
            settings.target
        );

        let timer = ActivityTimer::new(elapsed, settings.auto_pause, now);
        let state = CaptureState::new(timer, settings.options, view.lines, server_timer);

        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        let persist_worker = tokio::spawn(persist_worker(
            store.clone(),
            settings.target.clone(),
            persist_rx,
        ));

        Self {
            state,
            store,
            target: settings.target,
            local,
            scratch: Scratch::new(),
            checkpoint_interval: settings.checkpoint_interval,
            persist_tx,
            persist_worker,
            relay_tx: None,
            relay_task: Reconnector::new(),
            bridge: None,
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn status(&self) -> &ConnectionStatus {
        self.state.bridge_status()
    }

    /// 브리지 접속을 시작하고 이벤트 수신 채널을 돌려줍니다.
    pub fn connect_bridge(&mut self, url: &str, retry: Option<Duration>) -> mpsc::Receiver<BridgeEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let mut connector = BridgeConnector::new(url, retry, tx);
        connector.connect();
        self.bridge = Some(connector);
        rx
    }

    /// 릴레이 접속을 시작하고 이벤트 수신 채널을 돌려줍니다.
    pub fn connect_relay(&mut self, url: &str, retry: Option<Duration>) -> mpsc::Receiver<RelayEvent> {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        self.relay_task
            .start(relay_loop(url.to_string(), retry, out_rx, tx));
        self.relay_tx = Some(out_tx);
        rx
    }

    /// 방 입장을 요청합니다.
    ///
    /// 게스트는 먼저 저장소에 방이 있는지 확인하고, 없으면 혼자 모드로 남습니다.
    pub async fn join_room(&mut self, room: &RoomConfig, username: Option<String>) {
        if room.role == Role::Guest {
            match self.store.room_exists(&room.room_id).await {
                Ok(false) => {
                    tracing::warn!(room_id = %room.room_id, "Room not found; continuing solo");
                    return;
                }
                Ok(true) => {}
                // 확인 실패는 릴레이의 판단에 맡김
                Err(e) => tracing::warn!("Room check failed: {}", e),
            }
        }
        let effects = self.state.begin_join(
            room.room_id.clone(),
            room.role,
            room.host_token.clone(),
            username,
        );
        self.apply(effects).await;
    }

    async fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Store(StoreCall::LinkRoom(room_id)) if !self.target.is_media() => {
                    // 방 세션은 타이머 갱신으로 레코드를 만들어 두면 게스트의 방 확인이 통과됨
                    tracing::debug!(room_id = %room_id, "Materializing room session");
                    self.persist(StoreCall::UpdateTimer(self.state.elapsed_secs()));
                }
                Effect::Store(call) => self.persist(call),
                Effect::Relay(event) => match &self.relay_tx {
                    Some(tx) => {
                        if tx.send(event).is_err() {
                            tracing::warn!("Relay task stopped; event dropped");
                        }
                    }
                    None => tracing::debug!("No relay connection; event dropped"),
                },
                Effect::SaveElapsed(seconds) => {
                    if let Err(e) = self.local.set_elapsed(&self.target.local_key(), seconds).await {
                        tracing::warn!("Failed to save elapsed time locally: {}", e);
                    }
                }
            }
        }
    }

    fn persist(&self, call: StoreCall) {
        if self.persist_tx.send(call).is_err() {
            tracing::error!("Persist worker stopped; store call dropped");
        }
    }

    pub async fn capture(&mut self, source: CaptureSource, text: &str, now: Instant) {
        let effects = self.state.ingest(source, text, now);
        self.apply(effects).await;
    }

    pub async fn handle_bridge(&mut self, event: BridgeEvent, now: Instant) {
        match event {
            BridgeEvent::Status(status) => {
                if self.state.set_bridge_status(status) {
                    tracing::info!("Bridge {}", self.state.bridge_status());
                }
            }
            BridgeEvent::Payload(raw) => match parse_bridge_payload(&raw) {
                Some(text) => self.capture(CaptureSource::Bridge, &text, now).await,
                None => tracing::debug!("Discarded blank bridge payload"),
            },
        }
    }

    pub async fn handle_relay(&mut self, event: RelayEvent, now: Instant) {
        let effects = match event {
            RelayEvent::Connected => self.state.relay_connected(),
            RelayEvent::Disconnected => {
                tracing::warn!("Relay disconnected");
                self.state.relay_disconnected();
                Vec::new()
            }
            RelayEvent::Server(event) => self.state.apply_relay_event(event, now),
        };
        self.apply(effects).await;
    }

    /// 붙여넣기 조각을 처리합니다. 완성된 문단마다 명령 또는 문장으로 처리합니다.
    pub async fn paste(&mut self, chunk: &[u8], now: Instant) {
        for paragraph in self.scratch.push(chunk) {
            self.paragraph(&paragraph, now).await;
        }
    }

    /// 붙여넣기 입력이 끝났을 때 남은 텍스트를 처리합니다.
    pub async fn finish_paste(&mut self, now: Instant) {
        if let Some(paragraph) = self.scratch.flush() {
            self.paragraph(&paragraph, now).await;
        }
    }

    async fn paragraph(&mut self, paragraph: &str, now: Instant) {
        match Command::parse(paragraph) {
            Some(Ok(command)) => self.command(command, now).await,
            Some(Err(e)) => tracing::warn!("{}", e),
            None => self.capture(CaptureSource::Paste, paragraph, now).await,
        }
    }

    pub async fn command(&mut self, command: Command, now: Instant) {
        let effects = match command {
            Command::Toggle => self.state.toggle(now),
            Command::Reset => self.state.reset(now),
            Command::Edit(seconds) => self.state.edit(seconds, now),
            Command::Clear => self.state.clear(),
            Command::Delete(id) => self.state.remove_line(&id),
            Command::Undo => match self.state.lines().last() {
                Some(line) => {
                    let id = line.id.clone();
                    self.state.remove_line(&id)
                }
                None => Vec::new(),
            },
            Command::Reconnect => {
                match &mut self.bridge {
                    Some(bridge) => bridge.connect(),
                    None => tracing::warn!("No bridge configured"),
                }
                Vec::new()
            }
            Command::Status => {
                tracing::info!(
                    timer = ?self.state.timer_state(),
                    elapsed = self.state.elapsed_secs(),
                    lines = self.state.lines().len(),
                    bridge = %self.state.bridge_status(),
                    collaboration = ?self.state.collaboration(),
                    members = self.state.members().len(),
                    "Status"
                );
                Vec::new()
            }
        };
        self.apply(effects).await;
    }

    pub async fn tick(&mut self, now: Instant) {
        let effects = self.state.tick(now);
        self.apply(effects).await;
    }

    pub fn checkpoint(&mut self) {
        if let Some(Effect::Store(call)) = self.state.checkpoint() {
            self.persist(call);
        }
    }

    /// 입력을 처리하다가 `shutdown`이 완료되면 정리하고 끝납니다.
    pub async fn run<F>(mut self, mut inputs: Inputs, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut checkpoints = tokio::time::interval(self.checkpoint_interval);
        checkpoints.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval의 첫 tick은 즉시 완료됨
        checkpoints.tick().await;

        let mut paste_open = true;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => self.tick(Instant::now()).await,
                _ = checkpoints.tick() => self.checkpoint(),
                Some(event) = inputs.bridge.recv() => self.handle_bridge(event, Instant::now()).await,
                Some(event) = inputs.relay.recv() => self.handle_relay(event, Instant::now()).await,
                chunk = inputs.paste.recv(), if paste_open => match chunk {
                    Some(chunk) => self.paste(&chunk, Instant::now()).await,
                    None => {
                        paste_open = false;
                        self.finish_paste(Instant::now()).await;
                    }
                },
            }
        }

        self.teardown().await;
    }

    /// 마지막 체크포인트를 보내고 저장 큐가 빌 때까지 기다립니다.
    ///
    /// 브리지/릴레이 태스크는 여기서 취소되어 정리 이후에 상태를 건드리지 않습니다.
    pub async fn teardown(mut self) {
        self.tick(Instant::now()).await;
        self.checkpoint();

        let Self {
            state,
            persist_tx,
            persist_worker,
            mut relay_task,
            bridge,
            ..
        } = self;
        relay_task.stop();
        drop(bridge);
        drop(persist_tx);

        if let Err(e) = persist_worker.await {
            tracing::error!("Persist worker failed: {}", e);
        }
        tracing::info!(
            elapsed = state.elapsed_secs(),
            lines = state.lines().len(),
            "Capture session closed"
        );
    }
}

/// 저장 작업자: 큐의 호출을 하나씩 순서대로 실행합니다
async fn persist_worker<S: SessionStore>(
    store: Arc<S>,
    target: SessionTarget,
    mut rx: mpsc::UnboundedReceiver<StoreCall>,
) {
    while let Some(call) = rx.recv().await {
        if let Err(e) = execute(store.as_ref(), &target, &call).await {
            tracing::warn!("Store call {} failed: {}", call_name(&call), e);
        }
    }
}

fn call_name(call: &StoreCall) -> &'static str {
    match call {
        StoreCall::AppendLines(_) => "append_lines",
        StoreCall::RemoveLines(_) => "remove_lines",
        StoreCall::ClearLines => "clear_lines",
        StoreCall::UpdateTimer(_) => "update_timer",
        StoreCall::LinkRoom(_) => "link_room",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::store::StoreError,
        models::{Line, NewLine},
        relay::{RoomCreated, ServerEvent},
    };
    use std::sync::Mutex;

    /// 호출 기록을 남기는 가짜 저장소
    #[derive(Clone, Default)]
    struct FakeStore {
        view: SessionView,
        fail: bool,
        room_exists: bool,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeStore {
        fn record(&self, call: String) -> Result<(), StoreError> {
            self.calls.lock().unwrap().push(call);
            if self.fail {
                return Err(StoreError::Status {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(())
        }
    }

    impl SessionStore for FakeStore {
        async fn get_session(&self, _target: &SessionTarget) -> Result<SessionView, StoreError> {
            self.record("get".to_string())?;
            Ok(self.view.clone())
        }

        async fn append_lines(&self, _target: &SessionTarget, lines: &[NewLine]) -> Result<u64, StoreError> {
            let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
            self.record(format!("append {}", texts.join(",")))?;
            Ok(lines.len() as u64)
        }

        async fn remove_lines(&self, _target: &SessionTarget, line_ids: &[String]) -> Result<u64, StoreError> {
            self.record(format!("remove {}", line_ids.len()))?;
            Ok(line_ids.len() as u64)
        }

        async fn clear_lines(&self, _target: &SessionTarget) -> Result<u64, StoreError> {
            self.record("clear".to_string())?;
            Ok(0)
        }

        async fn update_timer(&self, _target: &SessionTarget, seconds: u64) -> Result<(), StoreError> {
            self.record(format!("timer {}", seconds))
        }

        async fn delete_session(&self, _target: &SessionTarget) -> Result<(), StoreError> {
            self.record("delete".to_string())
        }

        async fn room_exists(&self, room_id: &str) -> Result<bool, StoreError> {
            self.record(format!("exists {}", room_id))?;
            Ok(self.room_exists)
        }

        async fn link_room(&self, media_id: &str, room_id: &str) -> Result<(), StoreError> {
            self.record(format!("link {} {}", media_id, room_id))
        }
    }

    fn settings(target: SessionTarget) -> ClientSettings {
        ClientSettings {
            target,
            auto_pause: Some(Duration::from_secs(60)),
            options: CaptureOptions::default(),
            checkpoint_interval: Duration::from_secs(30),
        }
    }

    fn media() -> SessionTarget {
        SessionTarget::Media("m1".to_string())
    }

    fn server_view(timer_seconds: i64, lines: Vec<Line>) -> SessionView {
        SessionView {
            exists: true,
            timer_seconds,
            lines,
            ..SessionView::default()
        }
    }

    async fn local_with(dir: &tempfile::TempDir, key: &str, secs: Option<u64>) -> LocalStore {
        let mut local = LocalStore::open_in(dir.path()).await.unwrap();
        if let Some(secs) = secs {
            local.set_elapsed(key, secs).await.unwrap();
        }
        local
    }

    #[tokio::test]
    async fn open_restores_the_larger_elapsed_value() {
        let dir = tempfile::tempdir().unwrap();
        let now = Instant::now();

        let store = FakeStore {
            view: server_view(120, Vec::new()),
            ..FakeStore::default()
        };
        let local = local_with(&dir, "media:m1", Some(300)).await;
        let client = CaptureClient::open(store, local, settings(media()), now).await;
        assert_eq!(client.state().elapsed_secs(), 300);
        client.teardown().await;

        let store = FakeStore {
            view: server_view(400, Vec::new()),
            ..FakeStore::default()
        };
        let local = local_with(&dir, "media:m1", Some(50)).await;
        let client = CaptureClient::open(store, local, settings(media()), now).await;
        assert_eq!(client.state().elapsed_secs(), 400);
        client.teardown().await;
    }

    #[tokio::test]
    async fn lines_persist_in_capture_order_and_teardown_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let store = FakeStore::default();
        let calls = store.calls.clone();
        let local = local_with(&dir, "media:m1", None).await;
        let now = Instant::now();

        let mut client = CaptureClient::open(store, local, settings(media()), now).await;
        client.capture(CaptureSource::Bridge, "一", now).await;
        client.capture(CaptureSource::Bridge, "二", now).await;
        client.capture(CaptureSource::Bridge, "三", now).await;
        client.command(Command::Edit(90), now).await;
        client.teardown().await;

        let calls = calls.lock().unwrap().clone();
        assert_eq!(calls[0], "get");
        assert_eq!(&calls[1..4], &["append 一", "append 二", "append 三"]);
        // teardown 직전 tick에서 몇 초가 더해질 수 있음
        assert!(calls[4].starts_with("timer 9"), "{:?}", calls);
        assert_eq!(calls.len(), 5);

        let reopened = LocalStore::open_in(dir.path()).await.unwrap();
        assert!(reopened.elapsed("media:m1").unwrap() >= 90);
    }

    #[tokio::test]
    async fn store_failures_do_not_block_local_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = FakeStore {
            fail: true,
            ..FakeStore::default()
        };
        let local = local_with(&dir, "media:m1", Some(10)).await;
        let now = Instant::now();

        let mut client = CaptureClient::open(store, local, settings(media()), now).await;
        assert_eq!(client.state().elapsed_secs(), 10);
        client.capture(CaptureSource::Paste, "本", now).await;
        assert_eq!(client.state().lines().len(), 1);
        client.teardown().await;
    }

    #[tokio::test]
    async fn paste_paragraphs_are_commands_or_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = FakeStore {
            view: server_view(0, Vec::new()),
            ..FakeStore::default()
        };
        let calls = store.calls.clone();
        let local = local_with(&dir, "media:m1", None).await;
        let now = Instant::now();

        let mut client = CaptureClient::open(store, local, settings(media()), now).await;
        client.paste(":edit 45\n吾輩は猫で".as_bytes(), now).await;
        assert_eq!(client.state().elapsed_secs(), 45);
        assert!(client.state().lines().is_empty());

        client.paste("ある\n:bogus\n".as_bytes(), now).await;
        assert_eq!(client.state().lines().len(), 1);
        assert_eq!(client.state().lines()[0].text, "吾輩は猫である");

        client.paste(":undo\n".as_bytes(), now).await;
        assert!(client.state().lines().is_empty());
        client.teardown().await;

        let calls = calls.lock().unwrap().clone();
        assert!(calls.contains(&"remove 1".to_string()));
    }

    #[tokio::test]
    async fn guest_join_is_skipped_when_room_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let store = FakeStore::default();
        let local = local_with(&dir, "room:r1", None).await;
        let now = Instant::now();
        let room = RoomConfig {
            room_id: "r1".to_string(),
            role: Role::Guest,
            host_token: None,
            relay_url: "ws://127.0.0.1:9/ws".to_string(),
        };

        let mut client =
            CaptureClient::open(store, local, settings(SessionTarget::Room("r1".to_string())), now).await;
        client.join_room(&room, None).await;
        assert_eq!(client.state().collaboration(), &crate::client::Collaboration::Solo);
        client.teardown().await;
    }

    #[tokio::test]
    async fn room_host_materializes_session_on_room_created() {
        let dir = tempfile::tempdir().unwrap();
        let store = FakeStore::default();
        let calls = store.calls.clone();
        let local = local_with(&dir, "room:r1", None).await;
        let now = Instant::now();
        let room = RoomConfig {
            room_id: "r1".to_string(),
            role: Role::Host,
            host_token: None,
            relay_url: "ws://127.0.0.1:9/ws".to_string(),
        };

        let mut client =
            CaptureClient::open(store, local, settings(SessionTarget::Room("r1".to_string())), now).await;
        client.join_room(&room, None).await;
        client.handle_relay(RelayEvent::Connected, now).await;
        client
            .handle_relay(
                RelayEvent::Server(ServerEvent::RoomCreated(RoomCreated {
                    room_id: "r1".to_string(),
                    host_token: "tok".to_string(),
                })),
                now,
            )
            .await;
        client.teardown().await;

        let calls = calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["get".to_string(), "timer 0".to_string()]);
    }

    #[tokio::test]
    async fn run_flushes_paste_on_eof_and_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let store = FakeStore::default();
        let calls = store.calls.clone();
        let local = local_with(&dir, "media:m1", None).await;

        let client = CaptureClient::open(store, local, settings(media()), Instant::now()).await;
        let (_bridge_tx, bridge_rx) = mpsc::channel(1);
        let (_relay_tx, relay_rx) = mpsc::channel(1);
        let (paste_tx, paste_rx) = mpsc::channel(4);
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let running = tokio::spawn(client.run(
            Inputs {
                bridge: bridge_rx,
                relay: relay_rx,
                paste: paste_rx,
            },
            async move {
                let _ = stop_rx.await;
            },
        ));

        paste_tx.send("最後の行".as_bytes().to_vec()).await.unwrap();
        drop(paste_tx);
        tokio::time::sleep(Duration::from_millis(100)).await;
        stop_tx.send(()).unwrap();
        running.await.unwrap();

        let calls = calls.lock().unwrap().clone();
        assert!(calls.contains(&"append 最後の行".to_string()), "{:?}", calls);
    }
}
