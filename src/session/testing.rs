//! Scripted backend double shared by the session tests.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::traits::AuthBackend;
use super::types::RegisterRequest;
use crate::error::BackendError;
use crate::types::{Identity, SessionToken, UserId};

pub(crate) enum LoginReply {
    Token(&'static str),
    Status(u16),
}

pub(crate) enum ProfileReply {
    Ok(Identity),
    Status(u16),
    Unreachable,
    /// Wait for the notify before producing the inner reply.
    Gated(Arc<Notify>, Box<ProfileReply>),
}

impl ProfileReply {
    pub(crate) fn user(username: &str) -> Self {
        Self::Ok(Identity::new(UserId(username.len() as u64), username))
    }
}

fn status_error(operation: &'static str, status: u16) -> BackendError {
    BackendError::Status {
        operation,
        status,
        detail: format!("scripted {status}"),
    }
}

#[derive(Default)]
pub(crate) struct ScriptedBackend {
    logins: Mutex<VecDeque<LoginReply>>,
    registers: Mutex<VecDeque<u16>>,
    profiles: Mutex<VecDeque<ProfileReply>>,
    logout_fails: Mutex<bool>,
    pub(crate) login_calls: Mutex<Vec<(String, String)>>,
    pub(crate) register_calls: Mutex<Vec<RegisterRequest>>,
    pub(crate) profile_calls: Mutex<Vec<SessionToken>>,
    pub(crate) logout_calls: Mutex<Vec<SessionToken>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_login(&self, reply: LoginReply) {
        self.logins.lock().push_back(reply);
    }

    /// `201` succeeds, anything else is returned as a status error.
    pub(crate) fn push_register(&self, status: u16) {
        self.registers.lock().push_back(status);
    }

    pub(crate) fn push_profile(&self, reply: ProfileReply) {
        self.profiles.lock().push_back(reply);
    }

    pub(crate) fn fail_logout(&self) {
        *self.logout_fails.lock() = true;
    }

    pub(crate) fn profile_call_count(&self) -> usize {
        self.profile_calls.lock().len()
    }
}

impl AuthBackend for ScriptedBackend {
    async fn login(&self, username: &str, password: &str) -> Result<SessionToken, BackendError> {
        self.login_calls
            .lock()
            .push((username.to_owned(), password.to_owned()));
        match self.logins.lock().pop_front() {
            Some(LoginReply::Token(t)) => Ok(t.into()),
            Some(LoginReply::Status(s)) => Err(status_error("login", s)),
            None => Err(BackendError::Unreachable("no scripted login".into())),
        }
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), BackendError> {
        self.register_calls.lock().push(request.clone());
        match self.registers.lock().pop_front() {
            Some(201) => Ok(()),
            Some(s) => Err(status_error("register", s)),
            None => Err(BackendError::Unreachable("no scripted register".into())),
        }
    }

    async fn profile(&self, token: &SessionToken) -> Result<Identity, BackendError> {
        self.profile_calls.lock().push(token.clone());
        let mut reply = self.profiles.lock().pop_front();
        loop {
            match reply {
                Some(ProfileReply::Gated(gate, inner)) => {
                    gate.notified().await;
                    reply = Some(*inner);
                }
                Some(ProfileReply::Ok(identity)) => return Ok(identity),
                Some(ProfileReply::Status(s)) => return Err(status_error("profile request", s)),
                Some(ProfileReply::Unreachable) | None => {
                    return Err(BackendError::Unreachable("connection refused".into()));
                }
            }
        }
    }

    async fn logout(&self, token: &SessionToken) -> Result<(), BackendError> {
        self.logout_calls.lock().push(token.clone());
        if *self.logout_fails.lock() {
            Err(BackendError::Unreachable("connection refused".into()))
        } else {
            Ok(())
        }
    }
}
