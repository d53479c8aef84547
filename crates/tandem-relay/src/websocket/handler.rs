//! Inbound frame dispatch.
//!
//! Every text frame a client sends lands here. Malformed or unauthorized
//! frames produce an `error` reply to the sender only; the connection
//! stays open.

use std::sync::Arc;

use tandem_protocol::{ClientFrame, RelayError, Role, ServerFrame, TimerAction};
use tandem_translate::translate_or_fallback;
use tracing::{debug, warn};

use crate::state::RelayState;
use crate::websocket::connection::ClientConnection;

/// Parse and dispatch one inbound text frame.
pub async fn handle_frame(text: &str, conn: &Arc<ClientConnection>, state: &Arc<RelayState>) {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(conn_id = %conn.id, error = %e, "unparseable frame");
            let _ = conn.send_frame(&RelayError::InvalidFrame { message: e.to_string() }.to_frame());
            return;
        }
    };

    match frame {
        ClientFrame::Join { session_id, role, lang } => {
            handle_join(&session_id, role, lang, conn, state);
        }
        ClientFrame::Message { text } => handle_chat(&text, conn, state).await,
        ClientFrame::TimerCommand { action } => handle_timer(action, conn, state),
        ClientFrame::WebrtcSignal { signal } => handle_signal(signal, conn, state),
    }
}

fn handle_join(
    session_id: &str,
    role: Role,
    lang: Option<String>,
    conn: &Arc<ClientConnection>,
    state: &Arc<RelayState>,
) {
    if session_id.is_empty() {
        let _ = conn.send_frame(&RelayError::SessionRequired.to_frame());
        return;
    }

    // A rejoin moves the connection: release the old role first.
    state.registry.unbind(conn);

    state.registry.bind(session_id, role, Arc::clone(conn));
    conn.bind(session_id.to_owned(), role);

    // The teacher's join declares what language the students read.
    if role == Role::Teacher {
        if let Some(lang) = lang {
            state.registry.ensure(session_id).set_student_lang(lang);
        }
    }

    debug!(conn_id = %conn.id, session_id, %role, "joined session");
    let _ = conn.send_frame(&ServerFrame::Joined {
        session_id: session_id.to_owned(),
        role,
    });
    // Late joiners see the current timer reading right away.
    let _ = conn.send_frame(&ServerFrame::timer_update(
        state.timer.current_seconds(session_id),
    ));
}

async fn handle_chat(text: &str, conn: &Arc<ClientConnection>, state: &Arc<RelayState>) {
    let Some(binding) = conn.binding() else {
        let _ = conn.send_frame(&RelayError::NotJoined.to_frame());
        return;
    };
    let Some(session) = state.registry.get(&binding.session_id) else {
        let _ = conn.send_frame(&RelayError::NotJoined.to_frame());
        return;
    };

    let student_lang = session.student_lang();
    let (source, target) = match binding.role {
        Role::Teacher => (state.source_lang.as_str(), student_lang.as_str()),
        Role::Student => (student_lang.as_str(), state.source_lang.as_str()),
    };

    // No session lock is held across this await.
    let translated = translate_or_fallback(state.translator.as_ref(), text, source, target).await;

    let frame = ServerFrame::message(binding.role, text.to_owned(), translated);
    // Sender included: clients render their own message from the echo.
    state.registry.broadcast(&binding.session_id, &frame);
}

fn handle_timer(action: TimerAction, conn: &Arc<ClientConnection>, state: &Arc<RelayState>) {
    let Some(binding) = conn.binding() else {
        let _ = conn.send_frame(&RelayError::NotJoined.to_frame());
        return;
    };
    if binding.role != Role::Teacher {
        warn!(conn_id = %conn.id, "student attempted timer command");
        let _ = conn.send_frame(&RelayError::NotAuthorized.to_frame());
        return;
    }

    match action {
        TimerAction::Start => state.timer.start(&binding.session_id),
        TimerAction::Pause => state.timer.pause(&binding.session_id),
        TimerAction::Stop => state.timer.stop(&binding.session_id),
    }
}

fn handle_signal(
    signal: serde_json::Value,
    conn: &Arc<ClientConnection>,
    state: &Arc<RelayState>,
) {
    let Some(binding) = conn.binding() else {
        let _ = conn.send_frame(&RelayError::NotJoined.to_frame());
        return;
    };

    // Payload is opaque; forward verbatim to everyone but the sender.
    let frame = ServerFrame::WebrtcSignal {
        signal,
        from: Some(binding.role),
    };
    state
        .registry
        .broadcast_except(&binding.session_id, &frame, &conn.id);
}
