use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::error::{ClientError, ClientResult};
use crate::db::models::auth::UserInfo;

/// 登录后保存在本地的令牌对
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user: Option<UserInfo>,
}

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Option<Session>;
    fn save(&self, session: &Session) -> ClientResult<()>;
    fn clear(&self) -> ClientResult<()>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<Session> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn save(&self, session: &Session) -> ClientResult<()> {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

/// 以 JSON 文件持久化会话，进程重启后仍可复用
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<Session> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable session file");
                None
            }
        }
    }

    fn save(&self, session: &Session) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ClientError::Storage(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, json).map_err(|e| ClientError::Storage(e.to_string()))
    }

    fn clear(&self) -> ClientResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Storage(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(access: &str) -> Session {
        Session {
            access_token: access.to_string(),
            refresh_token: format!("{}-refresh", access),
            user: None,
        }
    }

    #[test]
    fn memory_store_replaces_previous_session() {
        let store = MemorySessionStore::new();
        assert!(store.load().is_none());

        store.save(&session("a")).unwrap();
        store.save(&session("b")).unwrap();
        assert_eq!(store.load().unwrap().access_token, "b");

        store.clear().unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn file_store_survives_new_instance() {
        let dir = std::env::temp_dir().join(format!("supervision-session-{}", uuid::Uuid::new_v4()));
        let path = dir.join("session.json");

        FileSessionStore::new(&path).save(&session("persisted")).unwrap();
        let reopened = FileSessionStore::new(&path);
        assert_eq!(reopened.load().unwrap().refresh_token, "persisted-refresh");

        reopened.clear().unwrap();
        assert!(reopened.load().is_none());
        // 重复清除不报错
        reopened.clear().unwrap();

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_file_reads_as_no_session() {
        let path = std::env::temp_dir().join(format!("supervision-corrupt-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, "{not json").unwrap();
        assert!(FileSessionStore::new(&path).load().is_none());
        let _ = fs::remove_file(path);
    }
}
