use super::error::{io_error, json_error};
use super::model::{AgentSession, InstallationStatus};
use super::record::AgentSessionRecord;
use super::SessionError;
use crate::shared::fs_atomic::{read_optional, write_atomically};
use crate::shared::ids::AgentAddress;
use crate::shared::logging::EventLog;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Result of a mutation closure. `Commit` persists the session and stamps
/// activity. `Touch` drops the closure's changes but still stamps activity.
/// `Discard` leaves the stored record as it was.
#[derive(Debug)]
pub enum Persist<T> {
    Commit(T),
    Touch(T),
    Discard(T),
}

#[derive(Debug)]
pub struct Transacted<T> {
    pub value: T,
    pub created: bool,
}

/// File-backed session store, one JSON record per agent under `sessions_dir`.
/// Every read-modify-write for an agent runs under that agent's lock and
/// reloads from disk, so no caller ever writes from stale state.
#[derive(Debug)]
pub struct SessionStore {
    sessions_dir: PathBuf,
    total_steps: u32,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    log: EventLog,
}

impl SessionStore {
    pub fn new(sessions_dir: impl Into<PathBuf>, total_steps: u32, log: EventLog) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
            total_steps,
            locks: Mutex::new(HashMap::new()),
            log,
        }
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    pub fn session_path(&self, agent_id: &str) -> PathBuf {
        self.sessions_dir.join(format!("{agent_id}.json"))
    }

    /// Atomic load-mutate-store for one agent. A session is created on first
    /// contact and always persisted; otherwise `Commit` and `Touch` write.
    pub fn transact<T, F>(
        &self,
        address: &AgentAddress,
        now: i64,
        mutate: F,
    ) -> Result<Transacted<T>, SessionError>
    where
        F: FnOnce(&mut AgentSession) -> Persist<T>,
    {
        let lock = self.agent_lock(address.agent_id());
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let result = self.transact_locked(address, now, mutate);
        drop(guard);
        self.release_lock(address.agent_id(), lock);
        result
    }

    fn transact_locked<T, F>(
        &self,
        address: &AgentAddress,
        now: i64,
        mutate: F,
    ) -> Result<Transacted<T>, SessionError>
    where
        F: FnOnce(&mut AgentSession) -> Persist<T>,
    {
        let path = self.session_path(address.agent_id());
        let (stored, created) = match self.read_session(&path)? {
            Some(session) => (session, false),
            None => (AgentSession::new(address.clone(), now)?, true),
        };

        let mut session = stored.clone();
        let (value, write) = match mutate(&mut session) {
            Persist::Commit(value) => {
                session.last_activity_at = now;
                (value, true)
            }
            Persist::Touch(value) => {
                session = stored;
                session.last_activity_at = now;
                (value, true)
            }
            Persist::Discard(value) => {
                session = stored;
                (value, created)
            }
        };
        if write {
            if let Err(err) = self.write_session(&path, &session) {
                self.log.error(
                    "store.write_failed",
                    json!({ "agent": address.as_str(), "error": err.to_string() }),
                );
                return Err(err);
            }
        }
        if created {
            self.log
                .info("session.created", json!({ "agent": address.as_str() }));
        }
        Ok(Transacted { value, created })
    }

    pub fn load(&self, address: &AgentAddress) -> Result<Option<AgentSession>, SessionError> {
        self.read_session(&self.session_path(address.agent_id()))
    }

    /// All stored sessions ordered by agent id.
    pub fn list_sessions(&self) -> Result<Vec<AgentSession>, SessionError> {
        let mut sessions = Vec::new();
        for path in self.session_files()? {
            if let Some(session) = self.read_session(&path)? {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    /// Human-inspectable export keyed by agent address.
    pub fn export_all(&self) -> Result<BTreeMap<String, AgentSessionRecord>, SessionError> {
        Ok(self
            .list_sessions()?
            .iter()
            .map(|session| {
                (
                    session.address.to_string(),
                    AgentSessionRecord::from_session(session, self.total_steps),
                )
            })
            .collect())
    }

    pub fn export_to_file(&self, path: &Path) -> Result<usize, SessionError> {
        let export = self.export_all()?;
        let body = serde_json::to_vec_pretty(&export).map_err(|e| json_error(path, e))?;
        write_atomically(path, &body).map_err(|e| io_error(path, e))?;
        Ok(export.len())
    }

    /// Marks the active installation (and any active snapshots) of sessions
    /// idle for longer than `timeout_secs` as abandoned. Data is never removed
    /// and `last_activity_at` is left as is.
    pub fn abandon_inactive(
        &self,
        now: i64,
        timeout_secs: i64,
        skip: Option<&AgentAddress>,
    ) -> Result<Vec<AgentAddress>, SessionError> {
        let mut abandoned = Vec::new();
        for path in self.session_files()? {
            let Some(agent_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if skip.is_some_and(|address| address.agent_id() == agent_id) {
                continue;
            }
            let lock = self.agent_lock(agent_id);
            let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            let swept = self.abandon_if_idle(&path, now, timeout_secs);
            drop(guard);
            self.release_lock(agent_id, lock);
            if let Some(address) = swept? {
                abandoned.push(address);
            }
        }
        if !abandoned.is_empty() {
            self.log.info(
                "session.abandoned",
                json!({
                    "count": abandoned.len(),
                    "agents": abandoned.iter().map(|a| a.as_str()).collect::<Vec<_>>(),
                }),
            );
        }
        Ok(abandoned)
    }

    fn abandon_if_idle(
        &self,
        path: &Path,
        now: i64,
        timeout_secs: i64,
    ) -> Result<Option<AgentAddress>, SessionError> {
        let Some(mut session) = self.read_session(path)? else {
            return Ok(None);
        };
        if now.saturating_sub(session.last_activity_at) <= timeout_secs {
            return Ok(None);
        }
        let mut changed = false;
        let installations =
            std::iter::once(&mut session.active).chain(session.installations.values_mut());
        for installation in installations {
            if installation.status == InstallationStatus::Active {
                installation.status = InstallationStatus::Abandoned;
                installation.updated_at = now;
                changed = true;
            }
        }
        if !changed {
            return Ok(None);
        }
        self.write_session(path, &session)?;
        Ok(Some(session.address))
    }

    /// Drops the agent's lock entry once no other caller holds or awaits it.
    fn release_lock(&self, agent_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(&lock) == 2
            && locks
                .get(agent_id)
                .is_some_and(|held| Arc::ptr_eq(held, &lock))
        {
            locks.remove(agent_id);
        }
    }

    fn agent_lock(&self, agent_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(agent_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn session_files(&self) -> Result<Vec<PathBuf>, SessionError> {
        let entries = match fs::read_dir(&self.sessions_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error(&self.sessions_dir, err)),
        };
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_error(&self.sessions_dir, e))?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn read_session(&self, path: &Path) -> Result<Option<AgentSession>, SessionError> {
        let Some(raw) = read_optional(path).map_err(|e| io_error(path, e))? else {
            return Ok(None);
        };
        let record: AgentSessionRecord =
            serde_json::from_str(&raw).map_err(|e| json_error(path, e))?;
        record
            .into_session(self.total_steps)
            .map(Some)
            .map_err(|reason| SessionError::Corrupt {
                path: path.display().to_string(),
                reason,
            })
    }

    fn write_session(&self, path: &Path, session: &AgentSession) -> Result<(), SessionError> {
        let record = AgentSessionRecord::from_session(session, self.total_steps);
        let body = serde_json::to_vec_pretty(&record).map_err(|e| json_error(path, e))?;
        write_atomically(path, &body).map_err(|e| io_error(path, e))
    }
}
