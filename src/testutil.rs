//! In-memory collaborators for unit tests: deterministic clock, record
//! stores, SMS recorder, and a fake Twitter provider behind the
//! transport trait.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::models::{
    NewOtpRecord, NewTwitterSession, OtpRecord, OtpState, SessionState, TwitterSession,
};
use crate::otp::{IdentityLookup, OtpStore};
use crate::sms::SmsSender;
use crate::twitter::client::{Transport, UpstreamRequest, UpstreamResponse};
use crate::twitter::SessionStore;

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()),
        }
    }

    pub fn advance_secs(&self, secs: u64) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::seconds(secs as i64);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// OTP store over a Vec.
pub struct MemoryOtpStore {
    records: Mutex<Vec<OtpRecord>>,
}

impl MemoryOtpStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn all_for_phone(&self, phone: &str) -> Vec<OtpRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.phone == phone)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn create(&self, record: NewOtpRecord) -> Result<OtpRecord> {
        let record = OtpRecord {
            id: Uuid::new_v4(),
            phone: record.phone,
            code: record.code,
            state: OtpState::Active,
            issued_at: record.issued_at,
            last_resend_at: record.last_resend_at,
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn recent_for_phone(&self, phone: &str, since: DateTime<Utc>) -> Result<Vec<OtpRecord>> {
        let mut matching: Vec<OtpRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.phone == phone && r.last_resend_at >= since)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.last_resend_at.cmp(&a.last_resend_at));
        Ok(matching)
    }

    async fn supersede_all(&self, phone: &str) -> Result<u64> {
        let mut records = self.records.lock().unwrap();
        let mut swept = 0;
        for record in records.iter_mut() {
            if record.phone == phone && record.state == OtpState::Active {
                record.state = OtpState::Superseded;
                swept += 1;
            }
        }
        Ok(swept)
    }

    async fn consume(&self, phone: &str, code: &str) -> Result<bool> {
        let mut records = self.records.lock().unwrap();
        for record in records.iter_mut() {
            if record.phone == phone && record.code == code && record.state == OtpState::Active {
                record.state = OtpState::Consumed;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Records outgoing messages instead of sending them.
pub struct RecordingSms {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSms {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// The code embedded in the most recent message body.
    pub fn last_code(&self) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .last()
            .and_then(|(_, body)| body.rsplit(": ").next())
            .map(|code| code.to_string())
    }
}

#[async_trait]
impl SmsSender for RecordingSms {
    async fn send(&self, to: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }
}

/// Identity probe over a set of known phones.
pub struct MemoryIdentity {
    known: Mutex<HashSet<String>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self {
            known: Mutex::new(HashSet::new()),
        }
    }

    pub fn insert(&self, phone: &str) {
        self.known.lock().unwrap().insert(phone.to_string());
    }
}

#[async_trait]
impl IdentityLookup for MemoryIdentity {
    async fn phone_known(&self, phone: &str) -> Result<bool> {
        Ok(self.known.lock().unwrap().contains(phone))
    }
}

/// Session store over a Vec, with the same conditional-update semantics
/// as the SQL implementation.
pub struct MemorySessionStore {
    sessions: Mutex<Vec<TwitterSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: NewTwitterSession) -> Result<TwitterSession> {
        let session = TwitterSession {
            id: Uuid::new_v4(),
            owner_id: session.owner_id,
            request_token: session.request_token,
            request_token_secret: session.request_token_secret,
            access_token: String::new(),
            access_token_secret: String::new(),
            state: SessionState::RequestTokenIssued,
            linked_resource_id: None,
            created_at: Utc::now(),
        };
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }

    async fn find_by_request_token(&self, request_token: &str) -> Result<Option<TwitterSession>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.request_token == request_token)
            .cloned())
    }

    async fn grant_access_token(
        &self,
        request_token: &str,
        access_token: &str,
        access_token_secret: &str,
        linked_resource_id: Option<&str>,
    ) -> Result<bool> {
        let mut sessions = self.sessions.lock().unwrap();
        for session in sessions.iter_mut() {
            if session.request_token == request_token
                && session.state == SessionState::RequestTokenIssued
            {
                session.access_token = access_token.to_string();
                session.access_token_secret = access_token_secret.to_string();
                session.state = SessionState::AccessTokenGranted;
                session.linked_resource_id = linked_resource_id.map(|s| s.to_string());
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn attach_resource(
        &self,
        access_token: &str,
        owner_id: &str,
        linked_resource_id: Option<&str>,
    ) -> Result<Option<TwitterSession>> {
        let mut sessions = self.sessions.lock().unwrap();
        for session in sessions.iter_mut() {
            if session.access_token == access_token
                && session.owner_id == owner_id
                && session.state == SessionState::AccessTokenGranted
            {
                session.linked_resource_id = linked_resource_id.map(|s| s.to_string());
                return Ok(Some(session.clone()));
            }
        }
        Ok(None)
    }
}

/// Fake Twitter provider implementing the three OAuth endpoints plus the
/// tweet and credential-check resources.
pub struct FakeTwitter {
    fail_request_token: AtomicBool,
    fail_access_token: AtomicBool,
    fail_tweet: AtomicBool,
    fail_transport: AtomicBool,
    credentials_valid: AtomicBool,
    posted: Mutex<Vec<String>>,
}

impl FakeTwitter {
    pub const REQUEST_TOKEN: &'static str = "req-token-abc";
    pub const REQUEST_SECRET: &'static str = "req-secret-abc";
    pub const ACCESS_TOKEN: &'static str = "acc-token-xyz";
    pub const ACCESS_SECRET: &'static str = "acc-secret-xyz";
    pub const TWEET_ID: &'static str = "1460323737035677698";

    pub fn new() -> Self {
        Self {
            fail_request_token: AtomicBool::new(false),
            fail_access_token: AtomicBool::new(false),
            fail_tweet: AtomicBool::new(false),
            fail_transport: AtomicBool::new(false),
            credentials_valid: AtomicBool::new(true),
            posted: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_request_token(&self) {
        self.fail_request_token.store(true, Ordering::SeqCst);
    }

    pub fn fail_access_token(&self) {
        self.fail_access_token.store(true, Ordering::SeqCst);
    }

    pub fn fail_tweet(&self) {
        self.fail_tweet.store(true, Ordering::SeqCst);
    }

    pub fn fail_transport(&self) {
        self.fail_transport.store(true, Ordering::SeqCst);
    }

    pub fn invalidate_credentials(&self) {
        self.credentials_valid.store(false, Ordering::SeqCst);
    }

    pub fn posted(&self) -> Vec<String> {
        self.posted.lock().unwrap().clone()
    }

    fn ok(body: impl Into<String>) -> UpstreamResponse {
        UpstreamResponse {
            status: 200,
            body: body.into(),
        }
    }

    fn denied(status: u16) -> UpstreamResponse {
        UpstreamResponse {
            status,
            body: r#"{"errors":[{"message":"denied"}]}"#.to_string(),
        }
    }
}

#[async_trait]
impl Transport for FakeTwitter {
    async fn execute(&self, request: UpstreamRequest) -> Result<UpstreamResponse> {
        if self.fail_transport.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow!("connection refused")));
        }

        // Every call must arrive signed
        assert!(
            request.authorization.starts_with("OAuth "),
            "unsigned request to {}",
            request.url
        );

        if request.url.contains("/oauth/request_token") {
            if self.fail_request_token.load(Ordering::SeqCst) {
                return Ok(Self::denied(401));
            }
            return Ok(Self::ok(format!(
                "oauth_token={}&oauth_token_secret={}&oauth_callback_confirmed=true",
                Self::REQUEST_TOKEN,
                Self::REQUEST_SECRET
            )));
        }

        if request.url.contains("/oauth/access_token") {
            if self.fail_access_token.load(Ordering::SeqCst) {
                return Ok(Self::denied(401));
            }
            assert!(
                request.url.contains("oauth_verifier="),
                "access-token call without verifier"
            );
            return Ok(Self::ok(format!(
                "oauth_token={}&oauth_token_secret={}",
                Self::ACCESS_TOKEN,
                Self::ACCESS_SECRET
            )));
        }

        if request.url.contains("/2/tweets") {
            if self.fail_tweet.load(Ordering::SeqCst) {
                return Ok(Self::denied(403));
            }
            let text = request
                .json_body
                .as_ref()
                .and_then(|b| b.get("text"))
                .and_then(|t| t.as_str())
                .unwrap_or_default()
                .to_string();
            self.posted.lock().unwrap().push(text.clone());
            return Ok(Self::ok(
                serde_json::json!({ "data": { "id": Self::TWEET_ID, "text": text } }).to_string(),
            ));
        }

        if request.url.contains("/1.1/account/verify_credentials.json") {
            return Ok(if self.credentials_valid.load(Ordering::SeqCst) {
                Self::ok(r#"{"id":1,"screen_name":"speakup"}"#)
            } else {
                Self::denied(401)
            });
        }

        Ok(Self::denied(404))
    }
}
