use std::collections::HashMap;
use std::fmt;
use serde::{Serialize, Deserialize};
use uuid::Uuid;

/// 客户端会话标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        SessionId::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 会话 -> 当前使用的数据库
#[derive(Debug, Default)]
pub struct SessionStore {
    databases: HashMap<SessionId, String>,
}

impl SessionStore {
    pub fn new() -> Self {
        SessionStore::default()
    }

    pub fn get(&self, session: SessionId) -> Option<&str> {
        self.databases.get(&session).map(String::as_str)
    }

    pub fn set(&mut self, session: SessionId, database: &str) {
        self.databases.insert(session, database.to_string());
    }

    pub fn remove(&mut self, session: SessionId) -> Option<String> {
        self.databases.remove(&session)
    }

    /// 数据库被删除后，正在使用它的会话回到未选择状态
    pub fn forget_database(&mut self, database: &str) {
        self.databases.retain(|_, in_use| in_use != database);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_are_independent() {
        let mut store = SessionStore::new();
        let first = SessionId::new();
        let second = SessionId::new();
        store.set(first, "shop");
        assert_eq!(store.get(first), Some("shop"));
        assert_eq!(store.get(second), None);

        store.set(second, "hr");
        store.forget_database("shop");
        assert_eq!(store.get(first), None);
        assert_eq!(store.get(second), Some("hr"));
        assert_eq!(store.remove(second), Some("hr".to_string()));
    }
}
