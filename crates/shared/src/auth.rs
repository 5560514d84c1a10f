use crate::errors::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::validation::{self, Field, Rule};
use domain::ValidationFailure;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

pub const EMAIL_MAX: usize = 255;
pub const PASSWORD_MIN: usize = 6;
pub const PASSWORD_MAX: usize = 100;

/// 認証済みユーザーのセッション
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// ログイン・登録フォームの入力
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// 送信前の検証（パスワードは空白を含めてそのまま数える）
    pub fn validate(&self) -> Result<(), ValidationFailure> {
        validation::email(&self.email, Field::Email, EMAIL_MAX)?;
        let length = self.password.chars().count();
        if length == 0 {
            return Err(ValidationFailure::new(Field::Password, Rule::Required));
        }
        if length < PASSWORD_MIN {
            return Err(ValidationFailure::new(
                Field::Password,
                Rule::MinLength { min: PASSWORD_MIN },
            ));
        }
        if length > PASSWORD_MAX {
            return Err(ValidationFailure::new(
                Field::Password,
                Rule::MaxLength { max: PASSWORD_MAX },
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("User already registered")]
    AlreadyRegistered,

    #[error("Auth provider error: {0}")]
    Provider(String),
}

impl AuthError {
    /// プロバイダーのエラーメッセージを分類
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("invalid login credentials") {
            AuthError::InvalidCredentials
        } else if lower.contains("already registered") {
            AuthError::AlreadyRegistered
        } else {
            AuthError::Provider(message.to_string())
        }
    }
}

/// 外部の認証プロバイダー
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError>;
    /// 登録後すぐにセッションが発行されない場合は `None`
    async fn sign_up(&self, credentials: &Credentials) -> Result<Option<Session>, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// 表示すべき画面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    SignIn,
    Dashboard,
}

pub fn route_for(session: Option<&Session>) -> Route {
    match session {
        Some(_) => Route::Dashboard,
        None => Route::SignIn,
    }
}

/// 購読可能なセッション状態
#[derive(Debug, Clone)]
pub struct SessionState {
    sender: Arc<watch::Sender<Option<Session>>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn set(&self, session: Option<Session>) {
        self.sender.send_replace(session);
    }

    pub fn current(&self) -> Option<Session> {
        self.sender.borrow().clone()
    }

    pub fn route(&self) -> Route {
        route_for((*self.sender.borrow()).as_ref())
    }

    /// 変更通知の購読を開始する。購読の解除は戻り値を drop する
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

pub struct SessionSubscription {
    receiver: watch::Receiver<Option<Session>>,
}

impl SessionSubscription {
    /// 次のセッション変更を待ち、遷移先を返す。状態が破棄された場合は `None`
    pub async fn changed(&mut self) -> Option<Route> {
        self.receiver.changed().await.ok()?;
        let session = self.receiver.borrow_and_update();
        Some(route_for((*session).as_ref()))
    }
}

/// 認証操作の入口。結果を `SessionState` に反映する
pub struct AuthGate<P: AuthProvider> {
    provider: P,
    state: SessionState,
}

impl<P: AuthProvider> AuthGate<P> {
    pub fn new(provider: P, state: SessionState) -> Self {
        Self { provider, state }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// 起動時に既存のセッションを復元する
    pub async fn restore(&self) -> Result<Route, AppError> {
        let session = self.provider.current_session().await?;
        self.state.set(session);
        Ok(self.state.route())
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Route, AppError> {
        credentials.validate()?;
        match self.provider.sign_in(credentials).await {
            Ok(session) => {
                info!(user_id = %session.user_id, "サインインしました");
                self.state.set(Some(session));
                Ok(Route::Dashboard)
            }
            Err(e) => {
                warn!(error = %e, "サインインに失敗しました");
                Err(e.into())
            }
        }
    }

    pub async fn sign_up(&self, credentials: &Credentials) -> Result<Route, AppError> {
        credentials.validate()?;
        match self.provider.sign_up(credentials).await {
            Ok(session) => {
                info!(email = %credentials.email, "アカウントを登録しました");
                if session.is_some() {
                    self.state.set(session);
                }
                Ok(self.state.route())
            }
            Err(e) => {
                warn!(error = %e, "アカウント登録に失敗しました");
                Err(e.into())
            }
        }
    }

    pub async fn sign_out(&self) -> Result<Route, AppError> {
        self.provider.sign_out().await?;
        self.state.set(None);
        info!("サインアウトしました");
        Ok(Route::SignIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeProvider {
        accounts: Mutex<Vec<Credentials>>,
        existing: Option<Session>,
    }

    fn session_for(email: &str) -> Session {
        Session {
            user_id: format!("user-{email}"),
            email: email.to_string(),
            access_token: "token".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[async_trait]
    impl AuthProvider for FakeProvider {
        async fn current_session(&self) -> Result<Option<Session>, AuthError> {
            Ok(self.existing.clone())
        }

        async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
            let accounts = self.accounts.lock().unwrap();
            if accounts.contains(credentials) {
                Ok(session_for(&credentials.email))
            } else {
                Err(AuthError::classify("Invalid login credentials"))
            }
        }

        async fn sign_up(&self, credentials: &Credentials) -> Result<Option<Session>, AuthError> {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.iter().any(|c| c.email == credentials.email) {
                return Err(AuthError::classify("User already registered"));
            }
            accounts.push(credentials.clone());
            Ok(Some(session_for(&credentials.email)))
        }

        async fn sign_out(&self) -> Result<(), AuthError> {
            Ok(())
        }
    }

    #[test]
    fn test_credentials_validation() {
        assert!(Credentials::new("ana@x.com", "secret").validate().is_ok());
        assert_eq!(
            Credentials::new("ana", "secret").validate().unwrap_err(),
            ValidationFailure::new(Field::Email, Rule::EmailFormat)
        );
        assert_eq!(
            Credentials::new("ana@x.com", "12345").validate().unwrap_err(),
            ValidationFailure::new(Field::Password, Rule::MinLength { min: 6 })
        );
        assert_eq!(
            Credentials::new("ana@x.com", "x".repeat(101))
                .validate()
                .unwrap_err(),
            ValidationFailure::new(Field::Password, Rule::MaxLength { max: 100 })
        );
    }

    #[test]
    fn test_classify_provider_messages() {
        assert_eq!(
            AuthError::classify("Invalid login credentials"),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            AuthError::classify("User already registered"),
            AuthError::AlreadyRegistered
        );
        assert_eq!(
            AuthError::classify("rate limited"),
            AuthError::Provider("rate limited".to_string())
        );
    }

    #[test]
    fn test_session_expiry() {
        let session = session_for("ana@x.com");
        assert!(!session.is_expired(Utc::now()));
        assert!(session.is_expired(Utc::now() + Duration::hours(2)));
    }

    #[tokio::test]
    async fn test_subscription_receives_route_changes() {
        let state = SessionState::new();
        assert_eq!(state.route(), Route::SignIn);

        let mut subscription = state.subscribe();
        assert_eq!(state.subscriber_count(), 1);

        state.set(Some(session_for("ana@x.com")));
        assert_eq!(subscription.changed().await, Some(Route::Dashboard));

        state.set(None);
        assert_eq!(subscription.changed().await, Some(Route::SignIn));

        drop(subscription);
        assert_eq!(state.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_gate_sign_up_then_sign_in() {
        let gate = AuthGate::new(FakeProvider::default(), SessionState::new());
        let credentials = Credentials::new("ana@x.com", "secret");

        assert_eq!(gate.sign_up(&credentials).await.unwrap(), Route::Dashboard);
        assert!(matches!(
            gate.sign_up(&credentials).await,
            Err(AppError::Auth(AuthError::AlreadyRegistered))
        ));

        assert_eq!(gate.sign_out().await.unwrap(), Route::SignIn);
        assert!(gate.state().current().is_none());

        assert_eq!(gate.sign_in(&credentials).await.unwrap(), Route::Dashboard);
        assert_eq!(
            gate.state().current().map(|s| s.email),
            Some("ana@x.com".to_string())
        );
    }

    #[tokio::test]
    async fn test_gate_rejects_bad_credentials() {
        let gate = AuthGate::new(FakeProvider::default(), SessionState::new());

        let err = gate
            .sign_in(&Credentials::new("ana@x.com", "wrong-password"))
            .await
            .unwrap_err();
        assert_eq!(err, AppError::Auth(AuthError::InvalidCredentials));
        assert_eq!(gate.state().route(), Route::SignIn);

        // 形式エラーはプロバイダーを呼ばない
        let err = gate
            .sign_in(&Credentials::new("", "secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Domain(_)));
    }

    #[tokio::test]
    async fn test_restore_existing_session() {
        let provider = FakeProvider {
            existing: Some(session_for("ana@x.com")),
            ..FakeProvider::default()
        };
        let gate = AuthGate::new(provider, SessionState::new());
        assert_eq!(gate.restore().await.unwrap(), Route::Dashboard);
    }
}
