//! # 활동 타이머 (Activity Timer)
//!
//! 문장 수집 세션의 누적 경과 시간을 관리하는 상태 머신입니다.
//!
//! 상태: `Running` / `Paused`
//! - Running → Paused: 마지막 활동 이후 자동 일시정지 임계값을 넘기면 자동, 또는 수동 토글
//! - Paused → Running: 수동 토글, 또는 자동 시작 옵션이 켜져 있을 때 새 문장 도착
//! - `reset`: 경과 시간을 0으로, 마지막 활동 시각을 현재로
//! - `edit`: 경과 시간을 임의의 값으로, 마지막 활동 시각을 현재로
//!
//! 모든 메서드는 현재 시각(`Instant`)을 인자로 받습니다.
//! 실제 시계에 의존하지 않으므로 테스트에서 시간을 마음대로 진행시킬 수 있습니다.
//!
//! 경과 시간은 틱 횟수가 아니라 실제 벽시계 차이로 누적합니다.
//! 틱이 늦게 오거나 건너뛰어도 누적값이 어긋나지 않고, 1초 미만의 나머지는 다음 틱으로 이월됩니다.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Running,
    Paused,
}

/// `tick()`의 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    /// 초 단위 경과 시간이 바뀌었는지 (로컬 저장 필요 여부)
    pub changed: bool,
    /// 이번 틱에서 자동 일시정지되었는지
    pub auto_paused: bool,
}

#[derive(Debug, Clone)]
pub struct ActivityTimer {
    elapsed: Duration,
    state: TimerState,
    /// 마지막으로 경과 시간을 누적한 시각
    last_tick: Instant,
    /// 마지막 활동(문장 수집, 수동 조작) 시각
    last_activity: Instant,
    /// None이면 자동 일시정지 비활성화
    auto_pause: Option<Duration>,
}

impl ActivityTimer {
    /// 일시정지 상태로 시작합니다.
    pub fn new(elapsed_secs: u64, auto_pause: Option<Duration>, now: Instant) -> Self {
        Self {
            elapsed: Duration::from_secs(elapsed_secs),
            state: TimerState::Paused,
            last_tick: now,
            last_activity: now,
            auto_pause,
        }
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed.as_secs()
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// 주기적으로 호출합니다. 실행 중이면 경과 시간을 누적하고 자동 일시정지를 검사합니다.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let before = self.elapsed_secs();
        let auto_paused = self.accrue(now);
        TickOutcome {
            changed: self.elapsed_secs() != before,
            auto_paused,
        }
    }

    /// 수동 토글. 토글 후의 상태를 반환합니다.
    pub fn toggle(&mut self, now: Instant) -> TimerState {
        match self.state {
            TimerState::Running => {
                self.accrue(now);
                self.state = TimerState::Paused;
            }
            TimerState::Paused => self.start(now),
        }
        self.state
    }

    /// 활동(새 문장)을 기록합니다. `autostart`가 켜져 있고 일시정지 상태면 타이머를 시작합니다.
    ///
    /// 타이머가 새로 시작되었으면 `true`를 반환합니다.
    pub fn record_activity(&mut self, now: Instant, autostart: bool) -> bool {
        // 마지막 틱 이후 임계값을 이미 넘겼다면 먼저 일시정지 처리
        self.accrue(now);
        self.last_activity = now;
        if self.state == TimerState::Paused && autostart {
            self.start(now);
            return true;
        }
        false
    }

    pub fn reset(&mut self, now: Instant) {
        self.edit(0, now);
    }

    /// 경과 시간을 사용자가 입력한 값으로 덮어씁니다.
    pub fn edit(&mut self, elapsed_secs: u64, now: Instant) {
        self.elapsed = Duration::from_secs(elapsed_secs);
        self.last_tick = now;
        self.last_activity = now;
    }

    fn start(&mut self, now: Instant) {
        // 마지막 활동 시각을 갱신해야 곧바로 다시 자동 일시정지되지 않음
        self.state = TimerState::Running;
        self.last_tick = now;
        self.last_activity = now;
    }

    /// `last_tick`부터 `now`까지를 누적합니다. 자동 일시정지되면 `true`.
    ///
    /// 자동 일시정지 기준 시각(`last_activity + auto_pause`) 이후의 시간은 누적하지 않습니다.
    fn accrue(&mut self, now: Instant) -> bool {
        if self.state != TimerState::Running {
            return false;
        }

        let deadline = self.auto_pause.map(|limit| self.last_activity + limit);
        let until = match deadline {
            Some(deadline) if deadline < now => deadline,
            _ => now,
        };
        self.elapsed += until.saturating_duration_since(self.last_tick);
        self.last_tick = now;

        match deadline {
            Some(deadline) if now >= deadline => {
                self.state = TimerState::Paused;
                true
            }
            _ => false,
        }
    }
}

/// 로컬 캐시와 서버 값 중 큰 쪽을 시작값으로 사용합니다.
///
/// 마지막 체크포인트가 서버에 닿기 전에 종료된 경우를 복구하면서도
/// 서버가 이미 가진 값보다 뒤로 가지 않습니다.
pub fn reconcile(local: Option<u64>, server: u64) -> u64 {
    local.map_or(server, |local| local.max(server))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    fn timer(auto_pause_secs: Option<u64>) -> (ActivityTimer, Instant) {
        let t0 = Instant::now();
        (
            ActivityTimer::new(0, auto_pause_secs.map(Duration::from_secs), t0),
            t0,
        )
    }

    #[test]
    fn starts_paused_and_does_not_accrue() {
        let (mut timer, t0) = timer(None);
        assert_eq!(timer.state(), TimerState::Paused);
        let outcome = timer.tick(t0 + 10 * SEC);
        assert!(!outcome.changed);
        assert_eq!(timer.elapsed_secs(), 0);
    }

    #[test]
    fn accrues_wall_clock_delta_with_carry() {
        let (mut timer, t0) = timer(None);
        timer.toggle(t0);

        // 0.6초 간격 틱 두 번 → 1.2초
        timer.tick(t0 + Duration::from_millis(600));
        assert_eq!(timer.elapsed_secs(), 0);
        let outcome = timer.tick(t0 + Duration::from_millis(1200));
        assert!(outcome.changed);
        assert_eq!(timer.elapsed_secs(), 1);

        // 틱이 늦게 와도 실제 경과만큼 누적
        timer.tick(t0 + Duration::from_millis(5800));
        assert_eq!(timer.elapsed_secs(), 5);
    }

    #[test]
    fn auto_pause_credits_only_up_to_threshold() {
        let (mut timer, t0) = timer(Some(60));
        timer.toggle(t0);

        let outcome = timer.tick(t0 + 90 * SEC);
        assert!(outcome.auto_paused);
        assert_eq!(timer.state(), TimerState::Paused);
        assert_eq!(timer.elapsed_secs(), 60);

        timer.tick(t0 + 200 * SEC);
        assert_eq!(timer.elapsed_secs(), 60);
    }

    #[test]
    fn activity_postpones_auto_pause() {
        let (mut timer, t0) = timer(Some(60));
        timer.toggle(t0);
        timer.record_activity(t0 + 50 * SEC, false);

        let outcome = timer.tick(t0 + 100 * SEC);
        assert!(!outcome.auto_paused);
        assert!(timer.is_running());
        assert_eq!(timer.elapsed_secs(), 100);
    }

    #[test]
    fn activity_autostarts_only_when_enabled() {
        let (mut timer, t0) = timer(Some(60));
        assert!(!timer.record_activity(t0 + SEC, false));
        assert!(!timer.is_running());

        assert!(timer.record_activity(t0 + 2 * SEC, true));
        assert!(timer.is_running());
        timer.tick(t0 + 12 * SEC);
        assert_eq!(timer.elapsed_secs(), 10);
    }

    #[test]
    fn late_activity_after_threshold_pauses_before_autostart() {
        let (mut timer, t0) = timer(Some(60));
        timer.toggle(t0);

        // 틱 없이 임계값을 넘긴 뒤 문장이 도착
        let restarted = timer.record_activity(t0 + 100 * SEC, true);
        assert!(restarted);
        assert_eq!(timer.elapsed_secs(), 60);
        timer.tick(t0 + 110 * SEC);
        assert_eq!(timer.elapsed_secs(), 70);
    }

    #[test]
    fn resume_re_anchors_activity() {
        let (mut timer, t0) = timer(Some(60));
        timer.toggle(t0);
        timer.tick(t0 + 70 * SEC);
        assert!(!timer.is_running());

        timer.toggle(t0 + 300 * SEC);
        let outcome = timer.tick(t0 + 301 * SEC);
        assert!(!outcome.auto_paused);
        assert_eq!(timer.elapsed_secs(), 61);
    }

    #[test]
    fn reset_and_edit_overwrite_elapsed() {
        let (mut timer, t0) = timer(None);
        timer.toggle(t0);
        timer.tick(t0 + 30 * SEC);

        timer.reset(t0 + 30 * SEC);
        assert_eq!(timer.elapsed_secs(), 0);
        assert!(timer.is_running());

        timer.edit(500, t0 + 31 * SEC);
        timer.tick(t0 + 33 * SEC);
        assert_eq!(timer.elapsed_secs(), 502);
    }

    #[test]
    fn reconcile_takes_the_larger_value() {
        assert_eq!(reconcile(Some(300), 120), 300);
        assert_eq!(reconcile(Some(50), 400), 400);
        assert_eq!(reconcile(None, 400), 400);
    }
}
