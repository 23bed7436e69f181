//! In-memory backend shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use clubdesk::clients::{Backend, BackendError, BackendMode, FunctionReply};
use clubdesk::config::Config;
use clubdesk::models::{
    AccountStatus, ApprovalStatus, Identity, NewProfile, Profile, ProfileChanges, Role, Session,
    SignUpResult,
};
use clubdesk::state::SharedState;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SignIn(String),
    SignUp(String),
    SignOut,
    CurrentSession,
    UpdatePassword,
    ResendConfirmation(String),
    RequestPasswordReset { email: String, redirect_to: String },
    FetchProfile(Uuid),
    InsertProfile(Uuid),
    UpdateProfile(Uuid, ProfileChanges),
    UpsertProfile(Uuid),
    InvokeFunction(String, Value),
}

struct Account {
    id: Uuid,
    password: String,
    confirmed: bool,
}

#[derive(Default)]
struct FakeState {
    accounts: HashMap<String, Account>,
    profiles: HashMap<Uuid, Profile>,
    session: Option<Uuid>,
    replies: VecDeque<FunctionReply>,
    failures: HashMap<&'static str, BackendError>,
    function_delay: Option<Duration>,
}

/// Records every call; nothing leaves the process.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
    calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_account(&self, email: &str, password: &str, confirmed: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().accounts.insert(
            email.to_string(),
            Account {
                id,
                password: password.to_string(),
                confirmed,
            },
        );
        id
    }

    /// Confirmed account with an approved, active member profile.
    pub fn add_member(&self, email: &str, password: &str) -> Profile {
        let id = self.add_account(email, password, true);
        let profile = member(id, email);
        self.put_profile(profile.clone());
        profile
    }

    pub fn put_profile(&self, profile: Profile) {
        self.state
            .lock()
            .unwrap()
            .profiles
            .insert(profile.id, profile);
    }

    pub fn profile(&self, id: Uuid) -> Option<Profile> {
        self.state.lock().unwrap().profiles.get(&id).cloned()
    }

    pub fn password_of(&self, email: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .accounts
            .get(email)
            .map(|a| a.password.clone())
    }

    pub fn has_session(&self) -> bool {
        self.state.lock().unwrap().session.is_some()
    }

    /// Every later call of `operation` fails with `error`.
    pub fn fail(&self, operation: &'static str, error: BackendError) {
        self.state.lock().unwrap().failures.insert(operation, error);
    }

    /// Queues a reply for the next function invocation.
    pub fn reply(&self, status: u16, body: Value) {
        self.state
            .lock()
            .unwrap()
            .replies
            .push_back(FunctionReply { status, body });
    }

    pub fn delay_functions(&self, delay: Duration) {
        self.state.lock().unwrap().function_delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    pub fn function_bodies(&self) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::InvokeFunction(_, body) => Some(body),
                _ => None,
            })
            .collect()
    }

    fn record(&self, operation: &'static str, call: Call) -> Result<(), BackendError> {
        self.calls.lock().unwrap().push(call);
        match self.state.lock().unwrap().failures.get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn session_for(id: Uuid, email: &str) -> Session {
        Session::new(
            format!("token-{id}"),
            Identity {
                id,
                email: Some(email.to_string()),
                email_confirmed_at: None,
            },
        )
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Session, BackendError> {
        self.record("sign_in", Call::SignIn(email.to_string()))?;

        let mut state = self.state.lock().unwrap();
        let account = state
            .accounts
            .get(email)
            .ok_or(BackendError::InvalidCredentials)?;
        if account.password != password.expose_secret() {
            return Err(BackendError::InvalidCredentials);
        }
        if !account.confirmed {
            return Err(BackendError::EmailNotConfirmed);
        }

        let id = account.id;
        state.session = Some(id);
        Ok(Self::session_for(id, email))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SignUpResult, BackendError> {
        self.record("sign_up", Call::SignUp(email.to_string()))?;

        let mut state = self.state.lock().unwrap();
        if state.accounts.contains_key(email) {
            return Err(BackendError::UserAlreadyExists);
        }

        let id = Uuid::new_v4();
        state.accounts.insert(
            email.to_string(),
            Account {
                id,
                password: password.expose_secret().to_string(),
                confirmed: false,
            },
        );
        Ok(SignUpResult {
            user: Identity {
                id,
                email: Some(email.to_string()),
                email_confirmed_at: None,
            },
            session: None,
        })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.state.lock().unwrap().session = None;
        self.record("sign_out", Call::SignOut)
    }

    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        self.record("current_session", Call::CurrentSession)?;

        let state = self.state.lock().unwrap();
        Ok(state.session.and_then(|id| {
            state
                .accounts
                .iter()
                .find(|(_, a)| a.id == id)
                .map(|(email, _)| Self::session_for(id, email))
        }))
    }

    async fn update_password(&self, new_password: &SecretString) -> Result<(), BackendError> {
        self.record("update_password", Call::UpdatePassword)?;

        let mut state = self.state.lock().unwrap();
        let id = state.session.ok_or(BackendError::NotAuthenticated)?;
        if let Some(account) = state.accounts.values_mut().find(|a| a.id == id) {
            account.password = new_password.expose_secret().to_string();
        }
        Ok(())
    }

    async fn resend_confirmation(&self, email: &str) -> Result<(), BackendError> {
        self.record(
            "resend_confirmation",
            Call::ResendConfirmation(email.to_string()),
        )
    }

    async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), BackendError> {
        self.record(
            "request_password_reset",
            Call::RequestPasswordReset {
                email: email.to_string(),
                redirect_to: redirect_to.to_string(),
            },
        )
    }

    async fn fetch_profile(&self, id: Uuid) -> Result<Option<Profile>, BackendError> {
        self.record("fetch_profile", Call::FetchProfile(id))?;
        Ok(self.profile(id))
    }

    async fn insert_profile(&self, row: &NewProfile) -> Result<(), BackendError> {
        self.record("insert_profile", Call::InsertProfile(row.id))?;

        let mut state = self.state.lock().unwrap();
        if state.profiles.contains_key(&row.id) {
            return Err(BackendError::Conflict("duplicate key".to_string()));
        }
        state.profiles.insert(row.id, from_row(row));
        Ok(())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<(), BackendError> {
        self.record("update_profile", Call::UpdateProfile(id, changes.clone()))?;

        if let Some(profile) = self.state.lock().unwrap().profiles.get_mut(&id) {
            apply(profile, changes);
        }
        Ok(())
    }

    async fn upsert_profile(&self, row: &NewProfile) -> Result<(), BackendError> {
        self.record("upsert_profile", Call::UpsertProfile(row.id))?;

        let mut state = self.state.lock().unwrap();
        match state.profiles.get_mut(&row.id) {
            Some(profile) => apply(profile, &row.as_changes()),
            None => {
                state.profiles.insert(row.id, from_row(row));
            }
        }
        Ok(())
    }

    async fn invoke_function(
        &self,
        name: &str,
        body: Value,
    ) -> Result<FunctionReply, BackendError> {
        self.record("invoke_function", Call::InvokeFunction(name.to_string(), body))?;

        let delay = self.state.lock().unwrap().function_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.state.lock().unwrap().replies.pop_front();
        Ok(reply.unwrap_or(FunctionReply {
            status: 200,
            body: json!({ "valid": true }),
        }))
    }
}

fn from_row(row: &NewProfile) -> Profile {
    Profile {
        id: row.id,
        email: row.email.clone(),
        full_name: Some(row.full_name.clone()),
        phone: Some(row.phone.clone()),
        birth_date: Some(row.birth_date),
        rg: Some(row.rg.clone()),
        region: Some(row.region.clone()),
        gender: row.gender.clone(),
        position: row.position.clone(),
        responsible_name: row.responsible_name.clone(),
        responsible_phone: row.responsible_phone.clone(),
        avatar_url: Some(row.avatar_url.clone()),
        observation: row.observation.clone(),
        role: row.role(),
        status: row.status(),
        account_status: row.account_status(),
        must_change_password: false,
    }
}

fn apply(profile: &mut Profile, changes: &ProfileChanges) {
    fn set<T: Clone>(target: &mut T, value: &Option<T>) {
        if let Some(value) = value {
            *target = value.clone();
        }
    }

    set(&mut profile.full_name, &changes.full_name);
    set(&mut profile.phone, &changes.phone);
    set(&mut profile.birth_date, &changes.birth_date);
    set(&mut profile.rg, &changes.rg);
    set(&mut profile.region, &changes.region);
    set(&mut profile.gender, &changes.gender);
    set(&mut profile.position, &changes.position);
    set(&mut profile.responsible_name, &changes.responsible_name);
    set(&mut profile.responsible_phone, &changes.responsible_phone);
    set(&mut profile.avatar_url, &changes.avatar_url);
    set(&mut profile.observation, &changes.observation);
    set(&mut profile.role, &changes.role);
    set(&mut profile.status, &changes.status);
    set(&mut profile.account_status, &changes.account_status);
    set(&mut profile.must_change_password, &changes.must_change_password);
}

pub fn member(id: Uuid, email: &str) -> Profile {
    Profile {
        id,
        email: email.to_string(),
        full_name: Some("Ana Souza".to_string()),
        phone: Some("11987654321".to_string()),
        birth_date: NaiveDate::from_ymd_opt(2008, 3, 14),
        rg: Some("12.345.678-9".to_string()),
        region: Some("Zona Sul".to_string()),
        gender: None,
        position: Some("Goleira".to_string()),
        responsible_name: None,
        responsible_phone: None,
        avatar_url: None,
        observation: None,
        role: Role::User,
        status: ApprovalStatus::Approved,
        account_status: AccountStatus::Active,
        must_change_password: false,
    }
}

pub fn remote_state(backend: &Arc<FakeBackend>) -> SharedState {
    SharedState::with_mode(Config::default(), BackendMode::Remote(backend.clone()))
}

pub fn local_state() -> SharedState {
    SharedState::new(Config::default()).unwrap()
}

pub fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
}
