//! # 캡처 클라이언트 상태
//!
//! 클라이언트 인스턴스 하나의 상태 전체를 하나의 구조체로 모읍니다:
//! 타이머, 문장 목록, 방 협업 상태, 브리지 연결 상태.
//!
//! 상태는 이름 붙은 전이 메서드(`ingest`, `apply_relay_event`, `tick`, `toggle`...)로만 바뀝니다.
//! 각 메서드는 바깥 세계에 해야 할 일을 `Effect` 목록으로 돌려주고,
//! 실제 I/O(저장소 호출, 릴레이 송신, 로컬 저장)는 런타임이 수행합니다.
//! 덕분에 상태 머신을 소켓이나 HTTP 없이 테스트할 수 있습니다.
//!
//! ## 협업 상태
//! ```text
//! Solo ──begin_join──▶ Joining ──room_created / room_users_update / load_history──▶ Host | Guest
//!   ▲                     │                                                          │
//!   └──── error_message ──┘              relay 연결 끊김 → Joining (재연결 시 다시 join) ◀┘
//! ```

use super::{
    ingest,
    store::StoreCall,
    timer::{ActivityTimer, TimerState},
};
use crate::{
    db::now_timestamp,
    models::{Line, NewLine},
    relay::{ClientEvent, JoinRoom, LineData, MemberInfo, Role, SendLine, ServerEvent},
    services::text::normalize_line,
};
use std::{collections::HashSet, fmt, time::Instant};

/// 방 협업 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collaboration {
    /// 방 없이 혼자 수집
    Solo,
    /// join_room을 보냈거나 보낼 예정. 응답을 기다리는 중
    Joining(JoinRoom),
    Host {
        room_id: String,
        host_token: Option<String>,
    },
    Guest {
        room_id: String,
    },
}

/// 브리지 소켓 연결 상태 표시
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Error(e) => write!(f, "error: {}", e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    Bridge,
    Paste,
}

/// 수집 동작 옵션
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    /// 일시정지 중 새 문장이 오면 타이머 자동 시작
    pub autostart: bool,
    /// 일시정지 중에도 브리지 문장을 받을지
    pub bridge_while_paused: bool,
    /// 일시정지 중에도 붙여넣기 문장을 받을지
    pub paste_while_paused: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            autostart: true,
            bridge_while_paused: false,
            paste_while_paused: false,
        }
    }
}

impl CaptureOptions {
    fn allows_while_paused(&self, source: CaptureSource) -> bool {
        match source {
            CaptureSource::Bridge => self.bridge_while_paused,
            CaptureSource::Paste => self.paste_while_paused,
        }
    }
}

/// 런타임이 수행할 부수 효과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// 세션 저장소 호출 (저장 작업자 큐로)
    Store(StoreCall),
    /// 릴레이로 보낼 이벤트
    Relay(ClientEvent),
    /// 로컬 저장소에 경과 시간 기록
    SaveElapsed(u64),
}

#[derive(Debug)]
pub struct CaptureState {
    timer: ActivityTimer,
    options: CaptureOptions,
    lines: Vec<Line>,
    line_ids: HashSet<String>,
    collaboration: Collaboration,
    members: Vec<MemberInfo>,
    username: Option<String>,
    bridge: ConnectionStatus,
    relay_connected: bool,
    /// 마지막으로 저장소에 보낸 경과 시간
    last_checkpoint: u64,
}

impl CaptureState {
    /// `server_timer`는 저장소가 가진 값. 타이머 시작값과 같으면 첫 체크포인트를 건너뜁니다.
    pub fn new(timer: ActivityTimer, options: CaptureOptions, lines: Vec<Line>, server_timer: u64) -> Self {
        let mut state = Self {
            timer,
            options,
            lines: Vec::with_capacity(lines.len()),
            line_ids: HashSet::new(),
            collaboration: Collaboration::Solo,
            members: Vec::new(),
            username: None,
            bridge: ConnectionStatus::Disconnected,
            relay_connected: false,
            last_checkpoint: server_timer,
        };
        for line in lines {
            state.push_line(line);
        }
        state
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.timer.elapsed_secs()
    }

    pub fn timer_state(&self) -> TimerState {
        self.timer.state()
    }

    pub fn collaboration(&self) -> &Collaboration {
        &self.collaboration
    }

    pub fn members(&self) -> &[MemberInfo] {
        &self.members
    }

    pub fn bridge_status(&self) -> &ConnectionStatus {
        &self.bridge
    }

    /// 상태가 바뀌었으면 `true`
    pub fn set_bridge_status(&mut self, status: ConnectionStatus) -> bool {
        if self.bridge == status {
            return false;
        }
        self.bridge = status;
        true
    }

    /// 게스트(또는 게스트로 입장 중)는 저장소의 권한 있는 작성자가 아닙니다
    fn is_guest(&self) -> bool {
        match &self.collaboration {
            Collaboration::Guest { .. } => true,
            Collaboration::Joining(join) => join.role == Role::Guest,
            _ => false,
        }
    }

    fn push_line(&mut self, line: Line) -> bool {
        if !self.line_ids.insert(line.id.clone()) {
            return false;
        }
        self.lines.push(line);
        true
    }

    fn replace_lines(&mut self, lines: Vec<Line>) {
        self.lines.clear();
        self.line_ids.clear();
        for line in lines {
            self.push_line(line);
        }
    }

    fn elapsed_changed(&self, before: u64) -> Vec<Effect> {
        let now = self.timer.elapsed_secs();
        if now == before {
            Vec::new()
        } else {
            vec![Effect::SaveElapsed(now)]
        }
    }

    // ── 문장 수집 ──

    /// 로컬에서 수집한 텍스트 하나를 처리합니다.
    ///
    /// 받아들인 문장은 로컬 목록에 추가되고, 저장소에 추가 요청되며,
    /// 이 클라이언트가 방의 호스트면 릴레이로도 보내집니다.
    pub fn ingest(&mut self, source: CaptureSource, text: &str, now: Instant) -> Vec<Effect> {
        let Some(text) = normalize_line(text) else {
            return Vec::new();
        };
        if self.is_guest() {
            tracing::debug!("Ignoring local {:?} capture while guest", source);
            return Vec::new();
        }

        let before = self.timer.elapsed_secs();
        if self.timer.record_activity(now, self.options.autostart) {
            tracing::info!("Timer started by new line");
        }
        let mut effects = self.elapsed_changed(before);

        if !self.timer.is_running() && !self.options.allows_while_paused(source) {
            tracing::debug!("Dropped {:?} line while paused", source);
            return effects;
        }

        let line = ingest::new_line(text);
        effects.push(Effect::Store(StoreCall::AppendLines(vec![NewLine::from(&line)])));
        if let Collaboration::Host { room_id, .. } = &self.collaboration {
            effects.push(Effect::Relay(ClientEvent::SendLine(SendLine {
                room_id: room_id.clone(),
                line_data: LineData::from(&line),
            })));
        }
        self.push_line(line);
        effects
    }

    // ── 방 협업 ──

    /// 방 입장을 시작합니다. 릴레이가 연결되어 있으면 바로 join_room을 보냅니다.
    pub fn begin_join(
        &mut self,
        room_id: String,
        role: Role,
        host_token: Option<String>,
        username: Option<String>,
    ) -> Vec<Effect> {
        self.username = username;
        let join = JoinRoom {
            room_id,
            role,
            host_token,
            username: self.username.clone(),
            user_id: None,
        };
        self.collaboration = Collaboration::Joining(join.clone());
        if self.relay_connected {
            vec![Effect::Relay(ClientEvent::JoinRoom(join))]
        } else {
            Vec::new()
        }
    }

    /// 릴레이 연결이 (다시) 맺어졌을 때. 진행 중이던 입장을 다시 보냅니다.
    pub fn relay_connected(&mut self) -> Vec<Effect> {
        self.relay_connected = true;
        match &self.collaboration {
            Collaboration::Joining(join) => vec![Effect::Relay(ClientEvent::JoinRoom(join.clone()))],
            _ => Vec::new(),
        }
    }

    /// 릴레이 연결이 끊겼을 때. 호스트/게스트는 재연결 시 같은 역할로 다시 입장합니다.
    pub fn relay_disconnected(&mut self) {
        self.relay_connected = false;
        self.members.clear();
        let rejoin = match &self.collaboration {
            Collaboration::Host { room_id, host_token } => Some(JoinRoom {
                room_id: room_id.clone(),
                role: Role::Host,
                host_token: host_token.clone(),
                username: self.username.clone(),
                user_id: None,
            }),
            Collaboration::Guest { room_id } => Some(JoinRoom {
                room_id: room_id.clone(),
                role: Role::Guest,
                host_token: None,
                username: self.username.clone(),
                user_id: None,
            }),
            _ => None,
        };
        if let Some(join) = rejoin {
            self.collaboration = Collaboration::Joining(join);
        }
    }

    /// 입장 대기 중이면 요청한 역할로 확정합니다.
    fn confirm_admission(&mut self) {
        if let Collaboration::Joining(join) = &self.collaboration {
            tracing::info!(room_id = %join.room_id, role = ?join.role, "Joined room");
            self.collaboration = match join.role {
                Role::Host => Collaboration::Host {
                    room_id: join.room_id.clone(),
                    host_token: join.host_token.clone(),
                },
                Role::Guest => Collaboration::Guest {
                    room_id: join.room_id.clone(),
                },
            };
        }
    }

    /// 릴레이에서 받은 이벤트를 반영합니다.
    pub fn apply_relay_event(&mut self, event: ServerEvent, now: Instant) -> Vec<Effect> {
        match event {
            ServerEvent::RoomCreated(created) => {
                let ours = matches!(
                    &self.collaboration,
                    Collaboration::Joining(join) if join.role == Role::Host && join.room_id == created.room_id
                );
                if !ours {
                    return Vec::new();
                }
                tracing::info!(room_id = %created.room_id, "Room created");
                self.collaboration = Collaboration::Host {
                    room_id: created.room_id.clone(),
                    host_token: Some(created.host_token),
                };
                // 미디어 세션에 방을 연결해야 늦게 온 게스트가 기록을 받음
                vec![Effect::Store(StoreCall::LinkRoom(created.room_id))]
            }
            ServerEvent::ErrorMessage(message) => {
                if let Collaboration::Joining(join) = &self.collaboration {
                    // 같은 입장을 조용히 다시 시도하지 않음
                    tracing::warn!(room_id = %join.room_id, "Join rejected: {}; continuing solo", message);
                    self.collaboration = Collaboration::Solo;
                    self.members.clear();
                } else {
                    tracing::warn!("Relay error: {}", message);
                }
                Vec::new()
            }
            ServerEvent::RoomUsersUpdate(members) => {
                if matches!(self.collaboration, Collaboration::Solo) {
                    return Vec::new();
                }
                self.confirm_admission();
                self.members = members;
                Vec::new()
            }
            ServerEvent::LoadHistory(history) => {
                if !self.is_guest() {
                    return Vec::new();
                }
                self.confirm_admission();
                let stamp = now_timestamp();
                let lines = history
                    .into_iter()
                    .map(|data| line_from_relay(data, &stamp))
                    .collect();
                self.replace_lines(lines);
                Vec::new()
            }
            ServerEvent::ReceiveLine(data) => {
                if !matches!(self.collaboration, Collaboration::Guest { .. }) {
                    return Vec::new();
                }
                if self.line_ids.contains(&data.id) {
                    tracing::debug!(line_id = %data.id, "Skipping duplicate relayed line");
                    return Vec::new();
                }
                let before = self.timer.elapsed_secs();
                self.timer.record_activity(now, self.options.autostart);
                self.push_line(line_from_relay(data, &now_timestamp()));
                self.elapsed_changed(before)
            }
        }
    }

    // ── 타이머 ──

    pub fn tick(&mut self, now: Instant) -> Vec<Effect> {
        let outcome = self.timer.tick(now);
        if outcome.auto_paused {
            tracing::info!(elapsed = self.timer.elapsed_secs(), "Timer auto-paused after inactivity");
        }
        if outcome.changed {
            vec![Effect::SaveElapsed(self.timer.elapsed_secs())]
        } else {
            Vec::new()
        }
    }

    pub fn toggle(&mut self, now: Instant) -> Vec<Effect> {
        let state = self.timer.toggle(now);
        tracing::info!(?state, elapsed = self.timer.elapsed_secs(), "Timer toggled");
        vec![Effect::SaveElapsed(self.timer.elapsed_secs())]
    }

    pub fn reset(&mut self, now: Instant) -> Vec<Effect> {
        self.timer.reset(now);
        vec![Effect::SaveElapsed(0)]
    }

    pub fn edit(&mut self, elapsed_secs: u64, now: Instant) -> Vec<Effect> {
        self.timer.edit(elapsed_secs, now);
        vec![Effect::SaveElapsed(elapsed_secs)]
    }

    /// 마지막 체크포인트 이후 값이 바뀌었을 때만 저장소 갱신을 돌려줍니다.
    ///
    /// 게스트는 방 세션의 타이머를 덮어쓰지 않습니다.
    pub fn checkpoint(&mut self) -> Option<Effect> {
        if self.is_guest() {
            return None;
        }
        let elapsed = self.timer.elapsed_secs();
        if elapsed == self.last_checkpoint {
            return None;
        }
        self.last_checkpoint = elapsed;
        Some(Effect::Store(StoreCall::UpdateTimer(elapsed)))
    }

    // ── 삭제 ──

    /// 로컬 목록에서 바로 지우고, 게스트가 아니면 저장소에도 삭제를 요청합니다.
    pub fn remove_line(&mut self, line_id: &str) -> Vec<Effect> {
        if !self.line_ids.remove(line_id) {
            return Vec::new();
        }
        self.lines.retain(|line| line.id != line_id);
        if self.is_guest() {
            return Vec::new();
        }
        vec![Effect::Store(StoreCall::RemoveLines(vec![line_id.to_string()]))]
    }

    pub fn clear(&mut self) -> Vec<Effect> {
        self.lines.clear();
        self.line_ids.clear();
        if self.is_guest() {
            return Vec::new();
        }
        vec![Effect::Store(StoreCall::ClearLines)]
    }
}

fn line_from_relay(data: LineData, captured_at: &str) -> Line {
    Line {
        id: data.id,
        text: data.text,
        japanese_count: data.japanese_count,
        captured_at: captured_at.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::RoomCreated;
    use std::time::Duration;

    fn state(options: CaptureOptions) -> (CaptureState, Instant) {
        let t0 = Instant::now();
        let timer = ActivityTimer::new(0, Some(Duration::from_secs(60)), t0);
        (CaptureState::new(timer, options, Vec::new(), 0), t0)
    }

    fn line_data(id: &str, text: &str) -> LineData {
        LineData {
            id: id.to_string(),
            text: text.to_string(),
            japanese_count: crate::services::text::count_japanese(text) as i64,
        }
    }

    fn appended(effects: &[Effect]) -> Vec<String> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Store(StoreCall::AppendLines(lines)) => Some(lines[0].text.clone()),
                _ => None,
            })
            .collect()
    }

    fn host_in(room: &str) -> (CaptureState, Instant) {
        let (mut s, t0) = state(CaptureOptions::default());
        s.relay_connected();
        s.begin_join(room.to_string(), Role::Host, None, None);
        s.apply_relay_event(
            ServerEvent::RoomCreated(RoomCreated {
                room_id: room.to_string(),
                host_token: "tok".to_string(),
            }),
            t0,
        );
        (s, t0)
    }

    fn guest_in(room: &str, history: Vec<LineData>) -> (CaptureState, Instant) {
        let (mut s, t0) = state(CaptureOptions::default());
        s.relay_connected();
        s.begin_join(room.to_string(), Role::Guest, None, None);
        s.apply_relay_event(ServerEvent::LoadHistory(history), t0);
        (s, t0)
    }

    #[test]
    fn solo_capture_autostarts_and_persists() {
        let (mut s, t0) = state(CaptureOptions::default());
        let effects = s.ingest(CaptureSource::Bridge, " 猫だ ", t0);
        assert_eq!(appended(&effects), vec!["猫だ"]);
        assert!(!effects.iter().any(|e| matches!(e, Effect::Relay(_))));
        assert_eq!(s.timer_state(), TimerState::Running);
        assert_eq!(s.lines().len(), 1);
        assert_eq!(s.lines()[0].japanese_count, 2);
    }

    #[test]
    fn paused_capture_respects_per_source_toggle() {
        let options = CaptureOptions {
            autostart: false,
            bridge_while_paused: false,
            paste_while_paused: true,
        };
        let (mut s, t0) = state(options);

        assert!(appended(&s.ingest(CaptureSource::Bridge, "橋", t0)).is_empty());
        assert_eq!(appended(&s.ingest(CaptureSource::Paste, "貼", t0)), vec!["貼"]);
        assert_eq!(s.timer_state(), TimerState::Paused);
        assert_eq!(s.lines().len(), 1);
    }

    #[test]
    fn blank_capture_is_discarded() {
        let (mut s, t0) = state(CaptureOptions::default());
        assert!(s.ingest(CaptureSource::Paste, "  \n ", t0).is_empty());
        assert!(s.lines().is_empty());
    }

    #[test]
    fn host_relays_captured_lines_and_links_room() {
        let (mut s, t0) = state(CaptureOptions::default());
        s.relay_connected();
        let join = s.begin_join("r1".to_string(), Role::Host, None, Some("me".to_string()));
        assert!(matches!(&join[..], [Effect::Relay(ClientEvent::JoinRoom(j))] if j.room_id == "r1"));

        let created = s.apply_relay_event(
            ServerEvent::RoomCreated(RoomCreated {
                room_id: "r1".to_string(),
                host_token: "tok".to_string(),
            }),
            t0,
        );
        assert_eq!(created, vec![Effect::Store(StoreCall::LinkRoom("r1".to_string()))]);
        assert_eq!(
            s.collaboration(),
            &Collaboration::Host {
                room_id: "r1".to_string(),
                host_token: Some("tok".to_string())
            }
        );

        let effects = s.ingest(CaptureSource::Bridge, "本", t0);
        let relayed: Vec<_> = effects
            .iter()
            .filter_map(|e| match e {
                Effect::Relay(ClientEvent::SendLine(send)) => Some(send),
                _ => None,
            })
            .collect();
        assert_eq!(relayed.len(), 1);
        assert_eq!(relayed[0].room_id, "r1");
        assert_eq!(relayed[0].line_data.text, "本");
    }

    #[test]
    fn join_waits_for_relay_connection() {
        let (mut s, _) = state(CaptureOptions::default());
        assert!(s.begin_join("r1".to_string(), Role::Guest, None, None).is_empty());
        let effects = s.relay_connected();
        assert!(matches!(&effects[..], [Effect::Relay(ClientEvent::JoinRoom(j))] if j.role == Role::Guest));
    }

    #[test]
    fn admission_error_falls_back_to_solo_without_retry() {
        let (mut s, t0) = state(CaptureOptions::default());
        s.relay_connected();
        s.begin_join("r1".to_string(), Role::Guest, None, None);
        s.apply_relay_event(ServerEvent::ErrorMessage("room not found".to_string()), t0);
        assert_eq!(s.collaboration(), &Collaboration::Solo);

        // 재연결해도 다시 입장하지 않음
        s.relay_disconnected();
        assert!(s.relay_connected().is_empty());

        // 이후 수집은 혼자 모드로 계속
        assert_eq!(appended(&s.ingest(CaptureSource::Bridge, "続く", t0)), vec!["続く"]);
    }

    #[test]
    fn guest_replaces_view_with_history_and_skips_duplicates() {
        let (mut s, t0) = state(CaptureOptions::default());
        s.ingest(CaptureSource::Bridge, "ローカル", t0);
        s.relay_connected();
        s.begin_join("r1".to_string(), Role::Guest, None, None);
        s.apply_relay_event(
            ServerEvent::LoadHistory(vec![line_data("a", "一"), line_data("b", "二")]),
            t0,
        );
        assert_eq!(s.collaboration(), &Collaboration::Guest { room_id: "r1".to_string() });
        let texts: Vec<_> = s.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["一", "二"]);

        let effects = s.apply_relay_event(ServerEvent::ReceiveLine(line_data("c", "三")), t0);
        assert!(!effects.iter().any(|e| matches!(e, Effect::Store(_))));
        s.apply_relay_event(ServerEvent::ReceiveLine(line_data("c", "三")), t0);
        assert_eq!(s.lines().len(), 3);
    }

    #[test]
    fn guest_never_writes_to_the_store() {
        let (mut s, t0) = guest_in("r1", vec![line_data("a", "一")]);
        assert!(s.ingest(CaptureSource::Paste, "自分の", t0).is_empty());
        assert!(s.remove_line("a").is_empty());
        assert!(s.lines().is_empty());

        s.toggle(t0);
        s.tick(t0 + Duration::from_secs(5));
        assert_eq!(s.checkpoint(), None);
    }

    #[test]
    fn relayed_line_can_autostart_guest_timer() {
        let (mut s, t0) = guest_in("r1", Vec::new());
        s.apply_relay_event(ServerEvent::ReceiveLine(line_data("a", "一")), t0);
        assert_eq!(s.timer_state(), TimerState::Running);
    }

    #[test]
    fn host_rejoins_with_token_after_relay_drop() {
        let (mut s, t0) = host_in("r1");
        s.relay_disconnected();
        // 끊긴 동안에는 릴레이하지 않음
        let effects = s.ingest(CaptureSource::Bridge, "本", t0);
        assert!(!effects.iter().any(|e| matches!(e, Effect::Relay(_))));

        let rejoin = s.relay_connected();
        let [Effect::Relay(ClientEvent::JoinRoom(join))] = &rejoin[..] else {
            panic!("expected rejoin, got {:?}", rejoin);
        };
        assert_eq!(join.role, Role::Host);
        assert_eq!(join.host_token.as_deref(), Some("tok"));

        // 토큰 재입장은 room_created 없이 room_users_update로 확정
        s.apply_relay_event(ServerEvent::RoomUsersUpdate(Vec::new()), t0);
        assert!(matches!(s.collaboration(), Collaboration::Host { .. }));
    }

    #[test]
    fn checkpoint_is_coalesced() {
        let (mut s, t0) = state(CaptureOptions::default());
        assert_eq!(s.checkpoint(), None);

        s.toggle(t0);
        s.tick(t0 + Duration::from_secs(3));
        assert_eq!(s.checkpoint(), Some(Effect::Store(StoreCall::UpdateTimer(3))));
        assert_eq!(s.checkpoint(), None);
    }

    #[test]
    fn timer_transitions_emit_local_saves() {
        let (mut s, t0) = state(CaptureOptions::default());
        assert_eq!(s.edit(120, t0), vec![Effect::SaveElapsed(120)]);
        s.toggle(t0);
        assert_eq!(s.tick(t0 + Duration::from_secs(1)), vec![Effect::SaveElapsed(121)]);
        assert!(s.tick(t0 + Duration::from_millis(1500)).is_empty());
        assert_eq!(s.reset(t0 + Duration::from_secs(2)), vec![Effect::SaveElapsed(0)]);
    }

    #[test]
    fn remove_and_clear_update_view_first() {
        let (mut s, t0) = state(CaptureOptions::default());
        s.ingest(CaptureSource::Bridge, "一", t0);
        s.ingest(CaptureSource::Bridge, "二", t0);
        let id = s.lines()[0].id.clone();

        assert_eq!(s.remove_line(&id), vec![Effect::Store(StoreCall::RemoveLines(vec![id.clone()]))]);
        assert!(s.remove_line(&id).is_empty());
        assert_eq!(s.lines().len(), 1);

        assert_eq!(s.clear(), vec![Effect::Store(StoreCall::ClearLines)]);
        assert!(s.lines().is_empty());
    }
}
