//! Session registry — maps session identifiers to live membership.
//!
//! Sessions are created lazily the first time any participant references
//! their identifier and are never reaped; the map lives for the process
//! lifetime.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tandem_protocol::{Role, ServerFrame};
use tracing::{debug, warn};

use crate::timer::TimerState;
use crate::websocket::connection::ClientConnection;

/// One lesson session: a teacher slot, a student list, the student
/// language, and the optional shared timer.
pub struct Session {
    /// Opaque identifier the participants agreed on.
    pub id: String,
    state: Mutex<SessionState>,
}

struct SessionState {
    teacher: Option<Arc<ClientConnection>>,
    students: Vec<Arc<ClientConnection>>,
    student_lang: String,
    timer: Option<TimerState>,
}

impl Session {
    fn new(id: String, default_student_lang: &str) -> Self {
        Self {
            id,
            state: Mutex::new(SessionState {
                teacher: None,
                students: Vec::new(),
                student_lang: default_student_lang.to_owned(),
                timer: None,
            }),
        }
    }

    /// Current student language code.
    pub fn student_lang(&self) -> String {
        self.state.lock().student_lang.clone()
    }

    /// Record the student language (teacher join).
    pub fn set_student_lang(&self, lang: String) {
        self.state.lock().student_lang = lang;
    }

    /// Snapshot of every currently bound connection.
    pub fn members(&self) -> Vec<Arc<ClientConnection>> {
        let state = self.state.lock();
        let mut members = Vec::with_capacity(state.students.len() + 1);
        if let Some(teacher) = &state.teacher {
            members.push(teacher.clone());
        }
        members.extend(state.students.iter().cloned());
        members
    }

    /// Bind a connection under a role.
    ///
    /// The teacher slot is last-writer-wins; the displaced connection is
    /// not closed. A student rebinding with the same connection replaces
    /// its existing entry rather than duplicating it.
    pub fn bind(&self, role: Role, conn: Arc<ClientConnection>) {
        let mut state = self.state.lock();
        match role {
            Role::Teacher => {
                if let Some(prev) = state.teacher.replace(conn) {
                    debug!(session_id = %self.id, prev_conn = %prev.id, "teacher slot replaced");
                }
            }
            Role::Student => {
                state.students.retain(|c| c.id != conn.id);
                state.students.push(conn);
            }
        }
    }

    /// Remove a connection from whichever role it holds. No-op if absent.
    pub fn unbind(&self, conn_id: &str) {
        let mut state = self.state.lock();
        if state.teacher.as_ref().is_some_and(|c| c.id == conn_id) {
            state.teacher = None;
        }
        state.students.retain(|c| c.id != conn_id);
    }

    /// Run `f` with mutable access to the timer slot.
    pub(crate) fn with_timer<R>(&self, f: impl FnOnce(&mut Option<TimerState>) -> R) -> R {
        f(&mut self.state.lock().timer)
    }
}

/// Maps session identifiers to [`Session`] records.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    default_student_lang: String,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new(default_student_lang: impl Into<String>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            default_student_lang: default_student_lang.into(),
        }
    }

    /// Get or lazily create the session for `session_id`.
    pub fn ensure(&self, session_id: &str) -> Arc<Session> {
        if let Some(session) = self.sessions.read().get(session_id) {
            return session.clone();
        }
        self.sessions
            .write()
            .entry(session_id.to_owned())
            .or_insert_with(|| {
                debug!(session_id, "session created");
                Arc::new(Session::new(
                    session_id.to_owned(),
                    &self.default_student_lang,
                ))
            })
            .clone()
    }

    /// Look up an existing session.
    pub fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Bind a connection into a session under a role, creating the
    /// session if needed.
    pub fn bind(&self, session_id: &str, role: Role, conn: Arc<ClientConnection>) {
        self.ensure(session_id).bind(role, conn);
    }

    /// Remove a connection from the session it was last bound to.
    ///
    /// No-op for an unbound connection. Also clears the connection's own
    /// binding record.
    pub fn unbind(&self, conn: &ClientConnection) {
        if let Some(binding) = conn.binding() {
            if let Some(session) = self.get(&binding.session_id) {
                session.unbind(&conn.id);
            }
            conn.clear_binding();
        }
    }

    /// Deliver a frame to every bound connection in the session.
    ///
    /// Unknown sessions and closed connections are skipped silently; a
    /// session may legitimately have zero connected parties.
    pub fn broadcast(&self, session_id: &str, frame: &ServerFrame) {
        self.broadcast_filtered(session_id, frame, |_| true);
    }

    /// Deliver a frame to every bound connection except `exclude_id`.
    pub fn broadcast_except(&self, session_id: &str, frame: &ServerFrame, exclude_id: &str) {
        self.broadcast_filtered(session_id, frame, |c| c.id != exclude_id);
    }

    fn broadcast_filtered(
        &self,
        session_id: &str,
        frame: &ServerFrame,
        filter: impl Fn(&ClientConnection) -> bool,
    ) {
        let Some(session) = self.get(session_id) else {
            return;
        };
        let json = match serde_json::to_string(frame) {
            Ok(j) => Arc::new(j),
            Err(e) => {
                warn!(session_id, error = %e, "failed to serialize frame");
                return;
            }
        };
        for conn in session.members() {
            if filter(&conn) && !conn.send(Arc::clone(&json)) {
                debug!(session_id, conn_id = %conn.id, "skipping unreachable connection");
            }
        }
    }

    /// Number of sessions ever referenced (sessions are never reaped).
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_connection(id: &str) -> (Arc<ClientConnection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(32);
        (Arc::new(ClientConnection::new(id.into(), tx)), rx)
    }

    fn recv_json(rx: &mut mpsc::Receiver<Arc<String>>) -> serde_json::Value {
        let msg = rx.try_recv().expect("expected a frame");
        serde_json::from_str(&msg).unwrap()
    }

    #[test]
    fn ensure_is_idempotent() {
        let reg = SessionRegistry::new("en");
        let a = reg.ensure("s1");
        let b = reg.ensure("s1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reg.session_count(), 1);
    }

    #[test]
    fn default_student_lang_applied() {
        let reg = SessionRegistry::new("en");
        let session = reg.ensure("s1");
        assert_eq!(session.student_lang(), "en");
        session.set_student_lang("de".into());
        assert_eq!(session.student_lang(), "de");
    }

    #[test]
    fn bind_teacher_last_writer_wins() {
        let reg = SessionRegistry::new("en");
        let (t1, _rx1) = make_connection("t1");
        let (t2, _rx2) = make_connection("t2");
        reg.bind("s1", Role::Teacher, t1);
        reg.bind("s1", Role::Teacher, t2);

        let members = reg.get("s1").unwrap().members();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, "t2");
    }

    #[test]
    fn bind_multiple_students() {
        let reg = SessionRegistry::new("en");
        let (s1, _rx1) = make_connection("st1");
        let (s2, _rx2) = make_connection("st2");
        reg.bind("s1", Role::Student, s1);
        reg.bind("s1", Role::Student, s2);
        assert_eq!(reg.get("s1").unwrap().members().len(), 2);
    }

    #[test]
    fn student_rebind_does_not_duplicate() {
        let reg = SessionRegistry::new("en");
        let (s1, _rx) = make_connection("st1");
        reg.bind("s1", Role::Student, s1.clone());
        reg.bind("s1", Role::Student, s1);
        assert_eq!(reg.get("s1").unwrap().members().len(), 1);
    }

    #[test]
    fn unbind_clears_role_and_binding() {
        let reg = SessionRegistry::new("en");
        let (t, _rx) = make_connection("t1");
        t.bind("s1".into(), Role::Teacher);
        reg.bind("s1", Role::Teacher, t.clone());

        reg.unbind(&t);
        assert!(reg.get("s1").unwrap().members().is_empty());
        assert!(t.binding().is_none());
    }

    #[test]
    fn unbind_unbound_connection_is_noop() {
        let reg = SessionRegistry::new("en");
        let (c, _rx) = make_connection("c1");
        reg.unbind(&c);
        assert_eq!(reg.session_count(), 0);
    }

    #[test]
    fn broadcast_reaches_all_members() {
        let reg = SessionRegistry::new("en");
        let (t, mut trx) = make_connection("t1");
        let (s, mut srx) = make_connection("st1");
        reg.bind("s1", Role::Teacher, t);
        reg.bind("s1", Role::Student, s);

        reg.broadcast("s1", &ServerFrame::timer_update(3));

        assert_eq!(recv_json(&mut trx)["seconds"], 3);
        assert_eq!(recv_json(&mut srx)["seconds"], 3);
    }

    #[test]
    fn broadcast_except_skips_sender() {
        let reg = SessionRegistry::new("en");
        let (t, mut trx) = make_connection("t1");
        let (s, mut srx) = make_connection("st1");
        reg.bind("s1", Role::Teacher, t);
        reg.bind("s1", Role::Student, s);

        reg.broadcast_except("s1", &ServerFrame::timer_update(1), "t1");

        assert!(trx.try_recv().is_err());
        assert_eq!(recv_json(&mut srx)["seconds"], 1);
    }

    #[test]
    fn broadcast_unknown_session_is_noop() {
        let reg = SessionRegistry::new("en");
        // Must not panic or create the session
        reg.broadcast("nope", &ServerFrame::timer_update(0));
        assert_eq!(reg.session_count(), 0);
    }

    #[test]
    fn broadcast_skips_closed_connections() {
        let reg = SessionRegistry::new("en");
        let (t, mut trx) = make_connection("t1");
        let (s, srx) = make_connection("st1");
        drop(srx); // student channel closed
        reg.bind("s1", Role::Teacher, t);
        reg.bind("s1", Role::Student, s);

        reg.broadcast("s1", &ServerFrame::timer_update(9));

        // Teacher still receives despite the dead student channel
        assert_eq!(recv_json(&mut trx)["seconds"], 9);
    }

    #[test]
    fn sessions_are_isolated() {
        let reg = SessionRegistry::new("en");
        let (a, mut arx) = make_connection("a");
        let (b, mut brx) = make_connection("b");
        reg.bind("rt-aaa111", Role::Teacher, a);
        reg.bind("rt-bbb222", Role::Teacher, b);

        reg.broadcast("rt-aaa111", &ServerFrame::timer_update(5));

        assert_eq!(recv_json(&mut arx)["seconds"], 5);
        assert!(brx.try_recv().is_err());
    }
}
