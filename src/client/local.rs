//! # 로컬 빠른 저장소
//!
//! 재시작 후에도 남아야 하지만 기기 간에 공유할 필요는 없는 값들을
//! 데이터 디렉토리의 JSON 파일(`local_store.json`) 하나에 보관합니다.
//! - 세션별 경과 시간 (충돌 복구용, 경과 시간이 바뀔 때마다 기록)
//! - 수집/표시 환경설정
//!
//! 쓰기는 임시 파일에 쓴 뒤 rename하므로 도중에 죽어도 파일이 반쯤 쓰인 채로 남지 않습니다.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};

pub const LOCAL_STORE_FILE: &str = "local_store.json";

/// 사용자 환경설정: 환경변수가 없을 때의 기본값으로 쓰입니다
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_pause_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_capture_while_paused: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paste_capture_while_paused: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LocalData {
    #[serde(default)]
    elapsed: BTreeMap<String, u64>,
    #[serde(default)]
    preferences: Preferences,
}

#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    data: LocalData,
}

impl LocalStore {
    /// 파일을 읽어 엽니다. 파일이 없으면 빈 저장소로 시작합니다.
    ///
    /// 내용이 깨져 있으면 경고를 남기고 빈 저장소로 시작합니다 (다음 쓰기에서 덮어씀).
    pub async fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let data = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable local store {}: {}", path.display(), e);
                LocalData::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => LocalData::default(),
            Err(e) => return Err(e),
        };
        Ok(Self { path, data })
    }

    /// `dir/local_store.json`을 엽니다. 디렉토리가 없으면 만듭니다.
    pub async fn open_in(dir: &Path) -> io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        Self::open(dir.join(LOCAL_STORE_FILE)).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn elapsed(&self, key: &str) -> Option<u64> {
        self.data.elapsed.get(key).copied()
    }

    pub async fn set_elapsed(&mut self, key: &str, seconds: u64) -> io::Result<()> {
        if self.elapsed(key) == Some(seconds) {
            return Ok(());
        }
        self.data.elapsed.insert(key.to_string(), seconds);
        self.flush().await
    }

    pub fn preferences(&self) -> &Preferences {
        &self.data.preferences
    }

    pub async fn set_preferences(&mut self, preferences: Preferences) -> io::Result<()> {
        if self.data.preferences == preferences {
            return Ok(());
        }
        self.data.preferences = preferences;
        self.flush().await
    }

    async fn flush(&self) -> io::Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.data)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn elapsed_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalStore::open_in(dir.path()).await.unwrap();
        assert_eq!(store.elapsed("media:m1"), None);

        store.set_elapsed("media:m1", 300).await.unwrap();
        store.set_elapsed("room:r1", 42).await.unwrap();

        let reopened = LocalStore::open_in(dir.path()).await.unwrap();
        assert_eq!(reopened.elapsed("media:m1"), Some(300));
        assert_eq!(reopened.elapsed("room:r1"), Some(42));
        assert!(!dir.path().join("local_store.json.tmp").exists());
    }

    #[tokio::test]
    async fn preferences_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalStore::open_in(dir.path()).await.unwrap();
        let prefs = Preferences {
            font: Some("Noto Serif JP".to_string()),
            auto_pause_secs: Some(90),
            paste_capture_while_paused: Some(true),
            ..Preferences::default()
        };
        store.set_preferences(prefs.clone()).await.unwrap();

        let reopened = LocalStore::open_in(dir.path()).await.unwrap();
        assert_eq!(reopened.preferences(), &prefs);
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCAL_STORE_FILE);
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let mut store = LocalStore::open(&path).await.unwrap();
        assert_eq!(store.elapsed("media:m1"), None);
        store.set_elapsed("media:m1", 5).await.unwrap();
        assert_eq!(LocalStore::open(&path).await.unwrap().elapsed("media:m1"), Some(5));
    }
}
