use log::{debug, error, warn};
use std::sync::Arc;

use super::password::{DefaultPasswordPolicy, PasswordPolicy};
use super::requests::{
    find_password_request, find_temporary_password_request, AccountUser, AuthAction,
    AuthenticationRequest, PasswordRequest, TemporaryPasswordRequest,
};
use super::response::{AccountCreationType, AuthenticationResponse, CreationNotice, CreationOutcome};
use super::session::{AuthSession, PasswordResetData, NO_EMAIL_KEY, RESET_PASS_KEY};
use super::status::{Message, StatusValue};
use super::store::UserDirectory;
use crate::error::ProviderError;
use crate::modules::config::ProviderConfig;
use crate::modules::email::templates::{account_created_email, password_reset_email, ResetCaller, ResetEmail};
use crate::modules::email::Mailer;
use crate::modules::hashing::{PasswordHasher, Pbkdf2Hasher};
use crate::modules::utils::io::is_ip_address;
use crate::modules::utils::logging::{log_auth_event, log_data_operation};
use crate::modules::utils::time::{Clock, SystemClock};

/// Primary authentication provider for temporary (mailed or admin-issued)
/// passwords.
///
/// Holds no state between calls apart from its configuration; every check
/// re-reads the directory.
pub struct TemporaryPasswordProvider {
    config: ProviderConfig,
    directory: Arc<dyn UserDirectory>,
    mailer: Arc<dyn Mailer>,
    hasher: Arc<dyn PasswordHasher>,
    policy: Arc<dyn PasswordPolicy>,
    clock: Arc<dyn Clock>,
}

impl TemporaryPasswordProvider {
    pub fn new(
        config: ProviderConfig,
        directory: Arc<dyn UserDirectory>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let policy = Arc::new(DefaultPasswordPolicy::new(config.min_password_length));
        Self {
            config,
            directory,
            mailer,
            hasher: Arc::new(Pbkdf2Hasher::default()),
            policy,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn PasswordPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn account_creation_type(&self) -> AccountCreationType {
        AccountCreationType::Create
    }

    /// Canonical form of `name`, or `None` if it can never be a username
    pub fn normalize_username(&self, name: &str) -> Option<String> {
        let canonical = self.directory.normalize(name);
        self.directory.name_is_valid(&canonical).then_some(canonical)
    }

    pub fn user_exists(&self, name: &str) -> Result<bool, ProviderError> {
        let Some(username) = self.normalize_username(name) else {
            return Ok(false);
        };
        Ok(self.directory.get_credential(&username)?.is_some())
    }

    /// Whether the account currently holds a usable, unexpired temporary password
    pub fn user_can_authenticate(&self, name: &str) -> Result<bool, ProviderError> {
        let Some(username) = self.normalize_username(name) else {
            return Ok(false);
        };
        let Some(credential) = self.directory.get_credential(&username)? else {
            return Ok(false);
        };
        if !self.hasher.is_usable(&credential.hash) {
            return Ok(false);
        }
        Ok(self.is_timestamp_valid(credential.set_at))
    }

    /// Requests this provider wants filled in for `action`
    pub fn get_authentication_requests(
        &self,
        action: AuthAction,
        username: Option<&str>,
    ) -> Vec<AuthenticationRequest> {
        let length = self.config.generated_password_length();
        match action {
            AuthAction::Login => vec![PasswordRequest::new(action).into()],
            AuthAction::Change => vec![TemporaryPasswordRequest::new_random(action, length).into()],
            // Only when a logged-in user creates an account for someone else
            AuthAction::Create if username.is_some() && self.config.email_enabled => {
                vec![TemporaryPasswordRequest::new_random(action, length).into()]
            }
            AuthAction::Remove => vec![TemporaryPasswordRequest::new(action).into()],
            AuthAction::Create | AuthAction::Link => Vec::new(),
        }
    }

    /// Try to log in with a temporary password.
    ///
    /// An unknown user abstains so other providers can claim the name; a
    /// known user with a wrong or expired password fails with the same
    /// `wrongpassword` message either way.
    pub fn begin_primary_authentication(
        &self,
        reqs: &[AuthenticationRequest],
        session: &mut AuthSession,
    ) -> Result<AuthenticationResponse, ProviderError> {
        let Some(req) = find_password_request(reqs) else {
            return Ok(AuthenticationResponse::new_abstain());
        };
        if req.action != AuthAction::Login {
            return Ok(AuthenticationResponse::new_abstain());
        }
        let (Some(name), Some(password)) = (req.username.as_deref(), req.password.as_deref()) else {
            return Ok(AuthenticationResponse::new_abstain());
        };
        let Some(username) = self.normalize_username(name) else {
            return Ok(AuthenticationResponse::new_abstain());
        };
        let Some(credential) = self.directory.get_credential(&username)? else {
            return Ok(AuthenticationResponse::new_abstain());
        };

        let validity = self.policy.check(&username, password);
        if !validity.is_ok() {
            let reason = validity
                .message()
                .cloned()
                .unwrap_or_else(|| Message::new("internalerror"));
            log_auth_event("temp_login", &username, false, Some("password failed validity check"));
            return Ok(AuthenticationResponse::new_fail(
                Message::new("fatalpassworderror").with_param(reason),
            ));
        }

        // Verify before looking at expiry so both paths do the same work
        let matches = self.hasher.verify(&credential.hash, password);
        if !matches || !self.is_timestamp_valid(credential.set_at) {
            log_auth_event("temp_login", &username, false, None);
            return Ok(Self::wrong_password());
        }

        log_auth_event("temp_login", &username, true, Some("logged in with temporary password"));
        session.set_serialized(
            RESET_PASS_KEY,
            &PasswordResetData {
                msg: Message::new("resetpass-temp-emailed"),
                hard: true,
            },
        )?;
        Ok(AuthenticationResponse::new_pass(username))
    }

    /// Decide whether `req` may change this provider's credential.
    ///
    /// With `checking_only == false` the answer is a plain good status and
    /// nothing is read. Users that don't exist are reported as ignorable
    /// rather than as errors.
    pub fn allows_authentication_data_change(
        &self,
        req: &AuthenticationRequest,
        checking_only: bool,
    ) -> Result<StatusValue, ProviderError> {
        let AuthenticationRequest::TemporaryPassword(req) = req else {
            return Ok(StatusValue::new_good_with("ignored"));
        };
        if !checking_only {
            return Ok(StatusValue::new_good());
        }

        let Some(username) = req.username.as_deref().and_then(|n| self.normalize_username(n)) else {
            return Ok(StatusValue::new_good_with("ignored"));
        };
        let Some(credential) = self.directory.get_credential(&username)? else {
            return Ok(StatusValue::new_good_with("ignored"));
        };

        let mut status = StatusValue::new_good();
        let Some(password) = req.password.as_deref() else {
            return Ok(status);
        };
        status.merge(self.policy.check(&username, password));

        if req.mail_password {
            if !self.config.email_enabled {
                return Ok(Self::deny_mail_reset(&username, Message::new("passwordreset-emaildisabled")));
            }

            if self.config.allow_requiring_email_for_resets
                && self.directory.requires_email_for_resets(&username)?
                && self.directory.get_email(&username)?.is_none()
            {
                return Ok(Self::deny_mail_reset(&username, Message::new("passwordreset-noemail")));
            }

            if let Some(remaining) = self.resend_wait(credential.set_at) {
                return Ok(Self::deny_mail_reset(
                    &username,
                    Message::new("throttled-mailpassword").with_param(remaining),
                ));
            }

            let caller = req.caller.as_deref().map(str::trim).filter(|c| !c.is_empty());
            let Some(caller) = caller else {
                return Ok(Self::deny_mail_reset(&username, Message::new("passwordreset-nocaller")));
            };
            if !self.caller_exists(caller)? {
                return Ok(Self::deny_mail_reset(
                    &username,
                    Message::new("passwordreset-nosuchcaller").with_param(caller),
                ));
            }
        }

        Ok(status)
    }

    /// Write the new temporary password, then mail it if asked to.
    ///
    /// Requests of any other kind leave storage untouched. A failed mail is
    /// reported in the returned status; the credential stays written.
    pub fn change_authentication_data(
        &self,
        req: &AuthenticationRequest,
    ) -> Result<StatusValue, ProviderError> {
        let AuthenticationRequest::TemporaryPassword(req) = req else {
            debug!("Ignoring {:?} request for credential change", req.kind());
            return Ok(StatusValue::new_good());
        };
        let Some(username) = req.username.as_deref().and_then(|n| self.normalize_username(n)) else {
            return Ok(StatusValue::new_good());
        };
        if self.directory.get_credential(&username)?.is_none() {
            return Ok(StatusValue::new_good());
        }

        let password = match (req.action, req.password.as_deref()) {
            (AuthAction::Remove, _) | (_, None) => None,
            (_, Some(password)) => Some(password),
        };

        let Some(password) = password else {
            self.directory.set_invalid_credential(&username)?;
            log_data_operation("clear_temp_password", &username, "directory", true, None);
            return Ok(StatusValue::new_good());
        };

        let hash = self.hasher.hash(password);
        if let Err(e) = self
            .directory
            .set_credential(&username, &hash, Some(self.clock.now()))
        {
            log_data_operation("set_temp_password", &username, "directory", false, Some(&e.to_string()));
            return Err(e.into());
        }
        log_data_operation("set_temp_password", &username, "directory", true, None);

        if req.mail_password {
            return self.send_password_reset_email(req, password);
        }
        Ok(StatusValue::new_good())
    }

    /// Pre-flight checks for creating an account with a temporary password
    pub fn test_for_account_creation(
        &self,
        user: &AccountUser,
        _creator: &AccountUser,
        reqs: &[AuthenticationRequest],
    ) -> StatusValue {
        let mut status = StatusValue::new_good();
        let Some(req) = find_temporary_password_request(reqs) else {
            return status;
        };

        if req.mail_password {
            if !self.config.email_enabled {
                status.merge(StatusValue::new_fatal(Message::new("emaildisabled")));
            } else if !user.has_email() {
                status.merge(StatusValue::new_fatal(Message::new("noemailcreate")));
            }
        }
        if let Some(password) = req.password.as_deref() {
            status.merge(self.policy.check(&user.name, password));
        }
        status
    }

    /// Accept the temporary password for a new account.
    ///
    /// The account row doesn't exist yet, so the request is handed back in
    /// the response for [`finish_account_creation`](Self::finish_account_creation).
    pub fn begin_primary_account_creation(
        &self,
        user: &AccountUser,
        _creator: &AccountUser,
        reqs: &[AuthenticationRequest],
        session: &mut AuthSession,
    ) -> AuthenticationResponse {
        let Some(req) = find_temporary_password_request(reqs) else {
            return AuthenticationResponse::new_abstain();
        };
        if req.username.is_none() || req.password.is_none() {
            return AuthenticationResponse::new_abstain();
        }

        let username = self.directory.normalize(&user.name);
        let mut snapshot = req.clone();
        snapshot.username = Some(username.clone());

        if req.mail_password {
            // The password mail doubles as the welcome mail
            session.set(NO_EMAIL_KEY, true);
        }

        AuthenticationResponse::Pass {
            username,
            create_request: Some(snapshot),
        }
    }

    /// Store the password now that the account exists and mail it if asked.
    ///
    /// The notice is `ByEmail` whenever mailing was requested; a failed send
    /// shows up in the outcome's mail status while the password stays stored.
    pub fn finish_account_creation(
        &self,
        user: &AccountUser,
        creator: &AccountUser,
        response: &AuthenticationResponse,
    ) -> Result<CreationOutcome, ProviderError> {
        let Some(req) = response.create_request() else {
            return Ok(CreationOutcome::silent());
        };

        // The reset mail is the wrong text here, the welcome mail goes out below
        let mut write = req.clone();
        write.mail_password = false;
        let password = write.password.clone();
        self.change_authentication_data(&AuthenticationRequest::TemporaryPassword(write))?;

        let (true, Some(password)) = (req.mail_password, password) else {
            return Ok(CreationOutcome::silent());
        };
        let mail = self.send_new_account_email(user, creator, &password)?;
        if !mail.is_ok() {
            warn!("Account created but password mail failed: {}", mail);
        }
        Ok(CreationOutcome {
            notice: Some(CreationNotice::ByEmail),
            mail,
        })
    }

    /// Disable the temporary password of `name`, if it exists
    pub fn revoke_access_for_user(&self, name: &str) -> Result<(), ProviderError> {
        let Some(username) = self.normalize_username(name) else {
            return Ok(());
        };
        if self.directory.get_credential(&username)?.is_some() {
            self.directory.set_invalid_credential(&username)?;
            log_data_operation("revoke_temp_password", &username, "directory", true, None);
        }
        Ok(())
    }

    fn wrong_password() -> AuthenticationResponse {
        AuthenticationResponse::new_fail(Message::new("wrongpassword"))
    }

    fn deny_mail_reset(username: &str, reason: Message) -> StatusValue {
        log_auth_event("mail_reset", username, false, Some(&reason.key));
        StatusValue::new_fatal(reason)
    }

    /// `None` or an unexpired `set_at` is valid; an expiry of 0 never lapses
    fn is_timestamp_valid(&self, set_at: Option<u64>) -> bool {
        let expiry = self.config.new_password_expiry;
        match set_at {
            None => true,
            Some(_) if expiry == 0 => true,
            Some(set_at) => self.clock.now().saturating_sub(set_at) <= expiry,
        }
    }

    /// Seconds left before another reset may be mailed, if any
    fn resend_wait(&self, set_at: Option<u64>) -> Option<u64> {
        let window = self.config.password_reminder_resend_time;
        let set_at = set_at?;
        if window == 0 {
            return None;
        }
        let allowed_at = set_at.saturating_add(window);
        let now = self.clock.now();
        (now < allowed_at).then(|| allowed_at - now)
    }

    fn caller_exists(&self, caller: &str) -> Result<bool, ProviderError> {
        if is_ip_address(caller) {
            return Ok(true);
        }
        self.user_exists(caller)
    }

    fn send_password_reset_email(
        &self,
        req: &TemporaryPasswordRequest,
        password: &str,
    ) -> Result<StatusValue, ProviderError> {
        let Some(username) = req.username.as_deref().and_then(|n| self.normalize_username(n)) else {
            return Ok(StatusValue::new_fatal(Message::new("noname")));
        };
        let Some(address) = self.directory.get_email(&username)? else {
            return Ok(StatusValue::new_fatal(Message::new("noemail")));
        };

        let caller = match req.caller.as_deref().map(str::trim) {
            Some(ip) if is_ip_address(ip) => ResetCaller::Address(ip.to_string()),
            Some(name) if !name.is_empty() => ResetCaller::User(
                self.normalize_username(name).unwrap_or_else(|| name.to_string()),
            ),
            _ => ResetCaller::Unknown,
        };
        let suggest_require_email = self.config.allow_requiring_email_for_resets
            && !self.directory.requires_email_for_resets(&username)?;

        let (subject, body) = password_reset_email(&ResetEmail {
            site_name: &self.config.site_name,
            server_url: &self.config.server_url,
            caller,
            username: &username,
            password,
            expiry: self.config.new_password_expiry,
            suggest_require_email,
        });
        Ok(self.deliver(&username, &address, &subject, &body))
    }

    fn send_new_account_email(
        &self,
        user: &AccountUser,
        creator: &AccountUser,
        password: &str,
    ) -> Result<StatusValue, ProviderError> {
        let username = self.directory.normalize(&user.name);
        let address = match user.email.as_deref().filter(|e| !e.trim().is_empty()) {
            Some(address) => Some(address.to_string()),
            None => self.directory.get_email(&username)?,
        };
        let Some(address) = address else {
            return Ok(StatusValue::new_fatal(Message::new("noemail")));
        };

        let (subject, body) = account_created_email(
            &self.config.site_name,
            &self.config.server_url,
            &creator.name,
            &username,
            password,
            self.config.new_password_expiry,
        );
        Ok(self.deliver(&username, &address, &subject, &body))
    }

    fn deliver(&self, username: &str, address: &str, subject: &str, body: &str) -> StatusValue {
        match self
            .mailer
            .send(address, &self.config.password_sender, subject, body)
        {
            Ok(()) => {
                log_auth_event("password_mail", username, true, None);
                StatusValue::new_good()
            }
            Err(e) => {
                error!("Failed to mail temporary password: {}", e);
                log_auth_event("password_mail", username, false, Some(&e.to_string()));
                StatusValue::new_fatal(Message::new("mailerror").with_param(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DirectoryError;
    use crate::modules::auth::requests::{GenericRequest, RequestKind};
    use crate::modules::auth::store::{TemporaryCredential, UserStore};
    use crate::modules::config::{ProviderParams, SiteConfig};
    use crate::modules::email::RecordingMailer;
    use crate::modules::hashing::INVALID_PASSWORD_HASH;
    use crate::modules::utils::time::FixedClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const NOW: u64 = 1_700_000_000;
    const HOUR: u64 = 3600;

    /// Provider wired to in-memory collaborators with a controllable clock
    /// and a password policy whose verdict the test sets
    struct Harness {
        provider: TemporaryPasswordProvider,
        store: Arc<UserStore>,
        mailer: Arc<RecordingMailer>,
        clock: Arc<FixedClock>,
        hasher: Arc<Pbkdf2Hasher>,
        validity: Arc<Mutex<StatusValue>>,
    }

    impl Harness {
        fn new(params: ProviderParams) -> Self {
            Self::with_mailer(params, RecordingMailer::new())
        }

        fn with_mailer(params: ProviderParams, mailer: RecordingMailer) -> Self {
            let store = Arc::new(UserStore::in_memory());
            store.add_user("Alice", Some("alice@example.com")).unwrap();
            store.add_user("Sysop", Some("sysop@example.com")).unwrap();

            let mut harness = Self {
                provider: TemporaryPasswordProvider::new(
                    ProviderConfig::default(),
                    store.clone(),
                    Arc::new(RecordingMailer::new()),
                ),
                store,
                mailer: Arc::new(mailer),
                clock: Arc::new(FixedClock::new(NOW)),
                hasher: Arc::new(Pbkdf2Hasher::new(1_000)),
                validity: Arc::new(Mutex::new(StatusValue::new_good())),
            };
            harness.provider = harness.provider_with(params);
            harness
        }

        /// Another provider over the same store, mailer and clock
        fn provider_with(&self, params: ProviderParams) -> TemporaryPasswordProvider {
            let validity = Arc::clone(&self.validity);
            let policy = move |_: &str, _: &str| validity.lock().unwrap().clone();
            let config = ProviderConfig::resolve(&params, &SiteConfig::default());
            TemporaryPasswordProvider::new(config, self.store.clone(), self.mailer.clone())
                .with_hasher(self.hasher.clone())
                .with_policy(Arc::new(policy))
                .with_clock(self.clock.clone())
        }

        fn set_validity(&self, status: StatusValue) {
            *self.validity.lock().unwrap() = status;
        }

        fn set_password(&self, name: &str, password: &str, set_at: Option<u64>) {
            let hash = self.hasher.hash(password);
            self.store.set_credential(name, &hash, set_at).unwrap();
        }

        fn credential(&self, name: &str) -> TemporaryCredential {
            self.store.get_credential(name).unwrap().unwrap()
        }

        fn login(&self, name: &str, password: &str) -> (AuthenticationResponse, AuthSession) {
            login_with(&self.provider, name, password)
        }
    }

    fn login_with(
        provider: &TemporaryPasswordProvider,
        name: &str,
        password: &str,
    ) -> (AuthenticationResponse, AuthSession) {
        let mut session = AuthSession::new();
        let req = PasswordRequest {
            action: AuthAction::Login,
            username: Some(name.to_string()),
            password: Some(password.to_string()),
        };
        let response = provider
            .begin_primary_authentication(&[req.into()], &mut session)
            .unwrap();
        (response, session)
    }

    fn params() -> ProviderParams {
        ProviderParams::default()
    }

    fn email_params(resend: u64) -> ProviderParams {
        ProviderParams {
            email_enabled: Some(true),
            password_reminder_resend_time: Some(resend),
            ..ProviderParams::default()
        }
    }

    fn temp_request(name: &str, password: &str) -> TemporaryPasswordRequest {
        TemporaryPasswordRequest {
            action: AuthAction::Change,
            username: Some(name.to_string()),
            password: Some(password.to_string()),
            ..TemporaryPasswordRequest::default()
        }
    }

    fn wrong_password() -> AuthenticationResponse {
        AuthenticationResponse::new_fail(Message::new("wrongpassword"))
    }

    /// Directory that counts reads, to prove a code path never queried it
    struct CountingDirectory {
        inner: UserStore,
        reads: AtomicUsize,
    }

    impl UserDirectory for CountingDirectory {
        fn get_credential(&self, name: &str) -> Result<Option<TemporaryCredential>, DirectoryError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_credential(name)
        }

        fn set_credential(&self, name: &str, hash: &str, set_at: Option<u64>) -> Result<(), DirectoryError> {
            self.inner.set_credential(name, hash, set_at)
        }

        fn get_email(&self, name: &str) -> Result<Option<String>, DirectoryError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_email(name)
        }
    }

    #[test]
    fn test_basics() {
        let h = Harness::new(params());
        assert_eq!(h.provider.account_creation_type(), AccountCreationType::Create);

        assert!(h.provider.user_exists("Alice").unwrap());
        assert!(h.provider.user_exists("alice").unwrap());
        assert!(!h.provider.user_exists("DoesNotExist").unwrap());
        assert!(!h.provider.user_exists("<invalid>").unwrap());

        assert_eq!(h.provider.normalize_username("alice_b"), Some("Alice b".to_string()));
        assert_eq!(h.provider.normalize_username("<invalid>"), None);

        let req = PasswordRequest {
            action: AuthAction::Change,
            username: Some("<invalid>".to_string()),
            password: None,
        };
        assert!(h.provider.change_authentication_data(&req.into()).unwrap().is_good());
    }

    #[test]
    fn test_invalid_names_never_reach_directory() {
        let directory = Arc::new(CountingDirectory {
            inner: UserStore::in_memory(),
            reads: AtomicUsize::new(0),
        });
        let provider = TemporaryPasswordProvider::new(
            ProviderConfig::default(),
            directory.clone(),
            Arc::new(RecordingMailer::new()),
        );

        for name in ["<invalid>", "a>b", "<", ">"] {
            assert!(!provider.user_exists(name).unwrap());
            assert!(!provider.user_can_authenticate(name).unwrap());
        }
        assert_eq!(directory.reads.load(Ordering::SeqCst), 0);

        assert!(!provider.user_exists("Valid").unwrap());
        assert_eq!(directory.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_user_can_authenticate() {
        let h = Harness::new(params());
        assert!(!h.provider.user_can_authenticate("<invalid>").unwrap());
        assert!(!h.provider.user_can_authenticate("DoesNotExist").unwrap());

        // Fresh accounts start with the slot disabled
        assert!(!h.provider.user_can_authenticate("Alice").unwrap());

        h.set_password("Alice", "password", None);
        assert!(h.provider.user_can_authenticate("Alice").unwrap());
        assert!(h.provider.user_can_authenticate("alice").unwrap());

        h.set_password("Alice", "password", Some(NOW - 10));
        let lenient = h.provider_with(ProviderParams {
            new_password_expiry: Some(100),
            ..params()
        });
        let strict = h.provider_with(ProviderParams {
            new_password_expiry: Some(1),
            ..params()
        });
        assert!(lenient.user_can_authenticate("Alice").unwrap());
        assert!(!strict.user_can_authenticate("Alice").unwrap());

        h.store.set_invalid_credential("Alice").unwrap();
        assert!(!lenient.user_can_authenticate("Alice").unwrap());

        // Hashes that can never verify count as no password at all
        for hash in ["", "garbage", ":pbkdf2:sha256:0:00:00"] {
            h.store.set_credential("Alice", hash, None).unwrap();
            assert!(!h.provider.user_can_authenticate("Alice").unwrap(), "{:?}", hash);
            assert_eq!(h.login("Alice", "password").0, wrong_password());
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let h = Harness::new(ProviderParams {
            new_password_expiry: Some(100),
            ..params()
        });
        h.set_password("Alice", "TemporaryPassword", Some(NOW));

        h.clock.set(NOW + 99);
        assert!(h.login("Alice", "TemporaryPassword").0.is_pass());
        h.clock.set(NOW + 100);
        assert!(h.login("Alice", "TemporaryPassword").0.is_pass());
        h.clock.set(NOW + 101);
        assert_eq!(h.login("Alice", "TemporaryPassword").0, wrong_password());
        assert!(!h.provider.user_can_authenticate("Alice").unwrap());
    }

    #[test]
    fn test_zero_expiry_never_lapses() {
        let h = Harness::new(ProviderParams {
            new_password_expiry: Some(0),
            ..params()
        });
        h.set_password("Alice", "TemporaryPassword", Some(NOW));
        h.clock.set(NOW + 10 * 365 * 86400);
        assert!(h.login("Alice", "TemporaryPassword").0.is_pass());
        assert!(h.provider.user_can_authenticate("Alice").unwrap());
    }

    #[test]
    fn test_get_authentication_requests() {
        let h = Harness::new(ProviderParams {
            email_enabled: Some(true),
            ..params()
        });
        let length = h.provider.config().generated_password_length();

        let cases = [
            (AuthAction::Login, None, vec![RequestKind::Password]),
            (AuthAction::Login, Some("Alice"), vec![RequestKind::Password]),
            (AuthAction::Create, None, vec![]),
            (AuthAction::Create, Some("Alice"), vec![RequestKind::TemporaryPassword]),
            (AuthAction::Link, None, vec![]),
            (AuthAction::Link, Some("Alice"), vec![]),
            (AuthAction::Change, None, vec![RequestKind::TemporaryPassword]),
            (AuthAction::Change, Some("Alice"), vec![RequestKind::TemporaryPassword]),
            (AuthAction::Remove, None, vec![RequestKind::TemporaryPassword]),
            (AuthAction::Remove, Some("Alice"), vec![RequestKind::TemporaryPassword]),
        ];

        for (action, username, expected) in cases {
            let reqs = h.provider.get_authentication_requests(action, username);
            let kinds: Vec<RequestKind> = reqs.iter().map(|r| r.kind()).collect();
            assert_eq!(kinds, expected, "{:?} for {:?}", action, username);

            for req in &reqs {
                assert_eq!(req.action(), action);
                if let AuthenticationRequest::TemporaryPassword(t) = req {
                    match action {
                        AuthAction::Remove => assert!(t.password.is_none()),
                        _ => assert_eq!(t.password.as_ref().map(|p| p.len()), Some(length)),
                    }
                }
            }
        }

        // Creating accounts for others needs a way to deliver the password
        let no_email = h.provider_with(ProviderParams {
            email_enabled: Some(false),
            ..params()
        });
        assert!(no_email
            .get_authentication_requests(AuthAction::Create, Some("Alice"))
            .is_empty());
    }

    #[test]
    fn test_generated_passwords_are_not_persisted() {
        let h = Harness::new(params());
        let before = h.credential("Alice");
        h.provider.get_authentication_requests(AuthAction::Change, Some("Alice"));
        assert_eq!(h.credential("Alice"), before);
    }

    #[test]
    fn test_authentication() {
        let h = Harness::new(ProviderParams {
            new_password_expiry: Some(100),
            ..params()
        });
        h.set_password("Alice", "TemporaryPassword", Some(NOW - 10));
        let mut session = AuthSession::new();

        // General failures
        assert_eq!(
            h.provider.begin_primary_authentication(&[], &mut session).unwrap(),
            AuthenticationResponse::Abstain
        );
        let incomplete = [
            (Some("foo"), None),
            (None, Some("bar")),
            (Some("<invalid>"), Some("WhoCares")),
            (Some("DoesNotExist"), Some("DoesNotExist")),
        ];
        for (username, password) in incomplete {
            let req = PasswordRequest {
                action: AuthAction::Login,
                username: username.map(str::to_string),
                password: password.map(str::to_string),
            };
            assert_eq!(
                h.provider
                    .begin_primary_authentication(&[req.into()], &mut session)
                    .unwrap(),
                AuthenticationResponse::Abstain
            );
        }

        // Only login requests are honoured
        let change = PasswordRequest {
            action: AuthAction::Change,
            username: Some("Alice".to_string()),
            password: Some("TemporaryPassword".to_string()),
        };
        assert_eq!(
            h.provider
                .begin_primary_authentication(&[change.into()], &mut session)
                .unwrap(),
            AuthenticationResponse::Abstain
        );
        let temp_only: AuthenticationRequest = temp_request("Alice", "TemporaryPassword").into();
        assert_eq!(
            h.provider
                .begin_primary_authentication(&[temp_only], &mut session)
                .unwrap(),
            AuthenticationResponse::Abstain
        );
        assert!(session.is_empty());

        // Validation failure
        h.set_validity(StatusValue::new_fatal(Message::new("arbitrary-failure")));
        let (response, session) = h.login("Alice", "TemporaryPassword");
        let message = response.message().unwrap();
        assert_eq!(message.key, "fatalpassworderror");
        assert_eq!(message.params, vec![Message::new("arbitrary-failure").into()]);
        assert!(session.get(RESET_PASS_KEY).is_none());

        // Successful auth
        h.set_validity(StatusValue::new_good());
        let (response, session) = h.login("Alice", "TemporaryPassword");
        assert_eq!(response, AuthenticationResponse::new_pass("Alice"));
        let reset: PasswordResetData = session.get_as(RESET_PASS_KEY).unwrap();
        assert!(reset.hard);
        assert_eq!(reset.msg.key, "resetpass-temp-emailed");

        let (response, session) = h.login("alice", "TemporaryPassword");
        assert_eq!(response, AuthenticationResponse::new_pass("Alice"));
        assert!(session.get(RESET_PASS_KEY).is_some());

        // Expired password
        let strict = h.provider_with(ProviderParams {
            new_password_expiry: Some(1),
            ..params()
        });
        let (response, session) = login_with(&strict, "Alice", "TemporaryPassword");
        assert_eq!(response, wrong_password());
        assert!(session.get(RESET_PASS_KEY).is_none());

        // Bad password
        assert_eq!(h.login("Alice", "Wrong").0, wrong_password());

        // Disabled slot
        h.store.set_invalid_credential("Alice").unwrap();
        assert_eq!(h.login("Alice", "TemporaryPassword").0, wrong_password());
    }

    #[test]
    fn test_allows_authentication_data_change() {
        let h = Harness::new(params());
        h.set_password("Sysop", "OldPassword", Some(NOW - 10));

        let mut warned = StatusValue::new_good();
        warned.error(Message::new("arbitrary-warning"));
        let ignored = StatusValue::new_good_with("ignored");
        let good = StatusValue::new_good();

        let generic: AuthenticationRequest = GenericRequest {
            action: AuthAction::Change,
            username: Some("Sysop".to_string()),
        }
        .into();
        let password: AuthenticationRequest = PasswordRequest {
            action: AuthAction::Change,
            username: Some("Sysop".to_string()),
            password: Some("NewPassword".to_string()),
        }
        .into();
        let temp = |name: &str| -> AuthenticationRequest { temp_request(name, "NewPassword").into() };

        let cases = vec![
            (generic, good.clone(), ignored.clone(), ignored.clone()),
            (password, good.clone(), ignored.clone(), ignored.clone()),
            (temp("Sysop"), good.clone(), good.clone(), good.clone()),
            (temp("sysop"), good.clone(), good.clone(), good.clone()),
            (temp("Sysop"), warned.clone(), good.clone(), warned.clone()),
            (
                temp("Sysop"),
                StatusValue::new_fatal(Message::new("arbitrary-error")),
                good.clone(),
                StatusValue::new_fatal(Message::new("arbitrary-error")),
            ),
            (temp("DoesNotExist"), good.clone(), good.clone(), ignored.clone()),
            (temp("<invalid>"), good.clone(), good.clone(), ignored.clone()),
        ];

        for (req, validity, expect_unchecked, expect_checked) in cases {
            h.set_validity(validity);
            assert_eq!(
                h.provider.allows_authentication_data_change(&req, false).unwrap(),
                expect_unchecked,
                "{:?}",
                req
            );
            assert_eq!(
                h.provider.allows_authentication_data_change(&req, true).unwrap(),
                expect_checked,
                "{:?}",
                req
            );
        }
    }

    #[test]
    fn test_allows_change_never_mutates() {
        let h = Harness::new(email_params(0));
        h.set_password("Alice", "OldTempPassword", Some(NOW - 10));
        let before = h.credential("Alice");

        let mut req = temp_request("Alice", "NewTempPassword");
        req.mail_password = true;
        req.caller = Some("127.0.0.1".to_string());
        let req: AuthenticationRequest = req.into();

        for checking_only in [false, true] {
            h.provider
                .allows_authentication_data_change(&req, checking_only)
                .unwrap();
        }
        assert_eq!(h.credential("Alice"), before);
        assert_eq!(h.mailer.count(), 0);
    }

    #[test]
    fn test_change_authentication_data() {
        let kinds: Vec<(AuthenticationRequest, bool)> = vec![
            (
                GenericRequest {
                    action: AuthAction::Change,
                    username: Some("Sysop".to_string()),
                }
                .into(),
                false,
            ),
            (
                PasswordRequest {
                    action: AuthAction::Change,
                    username: Some("Sysop".to_string()),
                    password: Some("NewTempPassword".to_string()),
                }
                .into(),
                false,
            ),
            (temp_request("Sysop", "NewTempPassword").into(), true),
        ];

        for (req, changed) in kinds {
            let h = Harness::new(params());
            h.set_password("Sysop", "OldTempPassword", Some(NOW + 10));
            assert!(h.login("Sysop", "OldTempPassword").0.is_pass());

            h.clock.advance(60);
            let status = h.provider.change_authentication_data(&req).unwrap();
            assert!(status.is_good());
            assert_eq!(h.mailer.count(), 0);

            if changed {
                assert_eq!(h.login("Sysop", "OldTempPassword").0, wrong_password());
                assert_eq!(
                    h.login("Sysop", "NewTempPassword").0,
                    AuthenticationResponse::new_pass("Sysop")
                );
                assert_eq!(h.credential("Sysop").set_at, Some(NOW + 60));
            } else {
                // Only the temporary slot belongs to this provider
                assert!(h.login("Sysop", "OldTempPassword").0.is_pass());
                assert_eq!(h.login("Sysop", "NewTempPassword").0, wrong_password());
                assert_eq!(h.credential("Sysop").set_at, Some(NOW + 10));
            }
        }
    }

    #[test]
    fn test_remove_clears_slot() {
        let h = Harness::new(params());
        h.set_password("Alice", "TemporaryPassword", Some(NOW));

        let mut req = TemporaryPasswordRequest::new(AuthAction::Remove);
        req.username = Some("alice".to_string());
        h.provider
            .change_authentication_data(&req.into())
            .unwrap();

        let credential = h.credential("Alice");
        assert_eq!(credential.hash, INVALID_PASSWORD_HASH);
        assert_eq!(credential.set_at, None);
        assert_eq!(h.login("Alice", "TemporaryPassword").0, wrong_password());
    }

    #[test]
    fn test_change_for_unknown_user_is_noop() {
        let h = Harness::new(params());
        let status = h
            .provider
            .change_authentication_data(&temp_request("DoesNotExist", "pw").into())
            .unwrap();
        assert!(status.is_good());
        assert_eq!(h.store.len(), 2);
    }

    #[test]
    fn test_mail_reset_checks() {
        let h = Harness::new(params());
        h.store.set_credential("Alice", INVALID_PASSWORD_HASH, Some(NOW - 5 * HOUR)).unwrap();

        let mut temp = TemporaryPasswordRequest::new_random(AuthAction::Change, 10);
        temp.username = Some("Alice".to_string());
        temp.mail_password = true;
        temp.caller = Some("127.0.0.1".to_string());
        let check = |provider: &TemporaryPasswordProvider, req: &TemporaryPasswordRequest| {
            provider
                .allows_authentication_data_change(&req.clone().into(), true)
                .unwrap()
        };

        let disabled = h.provider_with(ProviderParams {
            email_enabled: Some(false),
            ..params()
        });
        assert_eq!(
            check(&disabled, &temp),
            StatusValue::new_fatal(Message::new("passwordreset-emaildisabled"))
        );

        let throttling = h.provider_with(email_params(10 * HOUR));
        assert_eq!(
            check(&throttling, &temp),
            StatusValue::new_fatal(Message::new("throttled-mailpassword").with_param(5 * HOUR))
        );

        let short_window = h.provider_with(email_params(3 * HOUR));
        assert!(!check(&short_window, &temp).has_message("throttled-mailpassword"));

        // A timestamp in the future with throttling off
        h.store.set_credential("Alice", INVALID_PASSWORD_HASH, Some(NOW + 5 * HOUR)).unwrap();
        let provider = h.provider_with(email_params(0));
        assert!(!check(&provider, &temp).has_message("throttled-mailpassword"));

        let mut req = temp.clone();
        req.caller = None;
        assert_eq!(
            check(&provider, &req),
            StatusValue::new_fatal(Message::new("passwordreset-nocaller"))
        );

        for caller in ["127.0.0.256", "<Invalid>", "NoSuchUser"] {
            req.caller = Some(caller.to_string());
            assert_eq!(
                check(&provider, &req),
                StatusValue::new_fatal(Message::new("passwordreset-nosuchcaller").with_param(caller))
            );
        }

        for caller in ["127.0.0.1", "::1", "Alice", "sysop"] {
            req.caller = Some(caller.to_string());
            assert_eq!(check(&provider, &req), StatusValue::new_good(), "{}", caller);
        }

        req.caller = Some("Sysop".to_string());
        let status = provider.change_authentication_data(&req.clone().into()).unwrap();
        assert!(status.is_good());

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "alice@example.com");
        assert_eq!(sent[0].from, provider.config().password_sender);
        assert!(sent[0].body.contains(req.password.as_deref().unwrap()));
        assert!(sent[0].body.contains("User \"Sysop\""));
    }

    #[test]
    fn test_throttle_reports_remaining_seconds() {
        let h = Harness::new(email_params(600));
        h.set_password("Alice", "pw", Some(NOW));
        let mut req = temp_request("Alice", "NewPassword");
        req.mail_password = true;
        req.caller = Some("127.0.0.1".to_string());
        let req: AuthenticationRequest = req.into();

        for (offset, remaining) in [(0, 600), (100, 500), (599, 1)] {
            h.clock.set(NOW + offset);
            assert_eq!(
                h.provider.allows_authentication_data_change(&req, true).unwrap(),
                StatusValue::new_fatal(Message::new("throttled-mailpassword").with_param(remaining as u64))
            );
        }
        for offset in [600, 601, 10_000] {
            h.clock.set(NOW + offset);
            assert!(h
                .provider
                .allows_authentication_data_change(&req, true)
                .unwrap()
                .is_good());
        }
    }

    #[test]
    fn test_require_email_rule() {
        let h = Harness::new(ProviderParams {
            allow_requiring_email_for_resets: Some(true),
            ..email_params(0)
        });
        h.store.set_email("Alice", None).unwrap();
        h.store.set_require_email_for_resets("Alice", true).unwrap();

        let mut req = temp_request("Alice", "NewPassword");
        req.mail_password = true;
        req.caller = Some("127.0.0.1".to_string());
        let req: AuthenticationRequest = req.into();

        assert_eq!(
            h.provider.allows_authentication_data_change(&req, true).unwrap(),
            StatusValue::new_fatal(Message::new("passwordreset-noemail"))
        );

        // Rule off: the check passes, delivery is the mailer's problem
        let lax = h.provider_with(email_params(0));
        assert!(lax.allows_authentication_data_change(&req, true).unwrap().is_good());

        h.store.set_email("Alice", Some("alice@example.com")).unwrap();
        assert!(h.provider.allows_authentication_data_change(&req, true).unwrap().is_good());

        // Opted in: no advisory paragraph
        h.provider.change_authentication_data(&req).unwrap();
        assert!(!h.mailer.sent()[0].body.contains("knows your email address"));

        // Not opted in: the mail points at the option
        h.store.set_require_email_for_resets("Alice", false).unwrap();
        h.provider.change_authentication_data(&req).unwrap();
        assert!(h.mailer.sent()[1].body.contains("knows your email address"));
    }

    #[test]
    fn test_send_reset_email_failures() {
        let h = Harness::new(email_params(0));
        let req = temp_request("<invalid>", "pw");
        assert_eq!(
            h.provider.send_password_reset_email(&req, "pw").unwrap(),
            StatusValue::new_fatal(Message::new("noname"))
        );

        h.store.set_email("Alice", None).unwrap();
        let req = temp_request("Alice", "pw");
        assert_eq!(
            h.provider.send_password_reset_email(&req, "pw").unwrap(),
            StatusValue::new_fatal(Message::new("noemail"))
        );
        assert_eq!(h.mailer.count(), 0);
    }

    #[test]
    fn test_mail_failure_keeps_new_credential() {
        let h = Harness::with_mailer(email_params(0), RecordingMailer::failing("connection refused"));
        h.set_password("Alice", "OldTempPassword", Some(NOW - 10));

        let mut req = temp_request("Alice", "NewTempPassword");
        req.mail_password = true;
        req.caller = Some("127.0.0.1".to_string());
        let status = h.provider.change_authentication_data(&req.into()).unwrap();

        assert!(!status.is_ok());
        assert!(status.has_message("mailerror"));
        assert_eq!(h.mailer.count(), 1);
        assert!(h.login("Alice", "NewTempPassword").0.is_pass());
        assert_eq!(h.login("Alice", "OldTempPassword").0, wrong_password());
    }

    #[test]
    fn test_for_account_creation() {
        let h = Harness::new(params());
        let user = AccountUser::new("foo");
        let mut req = TemporaryPasswordRequest::new(AuthAction::Create);
        req.username = Some("Foo".to_string());
        req.password = Some("Bar".to_string());
        let reqs: Vec<AuthenticationRequest> = vec![req.into()];

        assert_eq!(
            h.provider.test_for_account_creation(&user, &user, &[]),
            StatusValue::new_good(),
            "No password request"
        );
        assert_eq!(
            h.provider.test_for_account_creation(&user, &user, &reqs),
            StatusValue::new_good(),
            "Password request, validated"
        );

        let mut weak = StatusValue::new_good();
        weak.error(Message::new("arbitrary warning"));
        h.set_validity(weak.clone());
        assert_eq!(
            h.provider.test_for_account_creation(&user, &user, &reqs),
            weak,
            "Password request, not validated"
        );
    }

    #[test]
    fn test_account_creation() {
        let h = Harness::new(params());
        let user = AccountUser::new("Foo");
        let mut session = AuthSession::new();

        assert_eq!(
            h.provider.begin_primary_account_creation(&user, &user, &[], &mut session),
            AuthenticationResponse::Abstain
        );

        let mut req = TemporaryPasswordRequest::new(AuthAction::Create);
        for (username, password) in [(Some("foo"), None), (None, Some("bar"))] {
            req.username = username.map(str::to_string);
            req.password = password.map(str::to_string);
            assert_eq!(
                h.provider.begin_primary_account_creation(
                    &user,
                    &user,
                    &[req.clone().into()],
                    &mut session
                ),
                AuthenticationResponse::Abstain
            );
        }

        req.username = Some("foo".to_string());
        req.password = Some("bar".to_string());
        let mut expected_snapshot = req.clone();
        expected_snapshot.username = Some("Foo".to_string());
        assert_eq!(
            h.provider
                .begin_primary_account_creation(&user, &user, &[req.clone().into()], &mut session),
            AuthenticationResponse::Pass {
                username: "Foo".to_string(),
                create_request: Some(expected_snapshot),
            }
        );
        assert!(session.get(NO_EMAIL_KEY).is_none());

        // The account row exists once the orchestrator has created it
        let name = h.store.add_user("NewUser", Some("new@example.com")).unwrap();
        let user = AccountUser::new(name.clone());
        req.username = Some(name.clone());
        req.password = Some("NewPassword".to_string());
        let response =
            h.provider
                .begin_primary_account_creation(&user, &user, &[req.clone().into()], &mut session);
        assert_eq!(response.create_request(), Some(&req));

        // Nothing is stored until the account creation finishes
        assert_eq!(h.login(&name, "NewPassword").0, wrong_password());
        assert_eq!(
            h.provider.finish_account_creation(&user, &user, &response).unwrap(),
            CreationOutcome::silent()
        );
        assert!(h.login(&name, "NewPassword").0.is_pass(), "new password is set");
        assert_eq!(h.mailer.count(), 0);
    }

    #[test]
    fn test_account_creation_email() {
        let h = Harness::new(params());
        let creator = AccountUser::new("Sysop");
        let name = h.store.add_user("Newcomer", None).unwrap();
        let mut user = AccountUser::new(name.clone()).with_email("");

        let mut req = TemporaryPasswordRequest::new_random(AuthAction::Create, 10);
        req.username = Some(name.clone());
        req.mail_password = true;
        let reqs: Vec<AuthenticationRequest> = vec![req.clone().into()];

        let disabled = h.provider_with(ProviderParams {
            email_enabled: Some(false),
            ..params()
        });
        assert_eq!(
            disabled.test_for_account_creation(&user, &creator, &reqs),
            StatusValue::new_fatal(Message::new("emaildisabled"))
        );

        let enabled = h.provider_with(ProviderParams {
            email_enabled: Some(true),
            ..params()
        });
        assert_eq!(
            enabled.test_for_account_creation(&user, &creator, &reqs),
            StatusValue::new_fatal(Message::new("noemailcreate"))
        );

        user = user.with_email("test@localhost.localdomain");
        assert_eq!(
            enabled.test_for_account_creation(&user, &creator, &reqs),
            StatusValue::new_good()
        );

        let mut session = AuthSession::new();
        let response = enabled.begin_primary_account_creation(&user, &creator, &reqs, &mut session);
        assert_eq!(response.username(), Some(name.as_str()));
        assert_eq!(session.get(NO_EMAIL_KEY), Some(&serde_json::Value::Bool(true)));
        assert_eq!(h.mailer.count(), 0);

        let outcome = enabled.finish_account_creation(&user, &creator, &response).unwrap();
        assert_eq!(outcome.notice, Some(CreationNotice::ByEmail));
        assert!(outcome.mail.is_good());
        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "test@localhost.localdomain");
        assert!(sent[0].body.contains(req.password.as_deref().unwrap()));
        assert!(sent[0].body.contains("by \"Sysop\""));

        assert!(login_with(&enabled, &name, req.password.as_deref().unwrap()).0.is_pass());
    }

    #[test]
    fn test_account_creation_mail_failure() {
        let h = Harness::with_mailer(email_params(0), RecordingMailer::failing("connection refused"));
        let creator = AccountUser::new("Sysop");
        let name = h.store.add_user("Newcomer", Some("new@example.com")).unwrap();
        let user = AccountUser::new(name.clone()).with_email("new@example.com");

        let mut req = TemporaryPasswordRequest::new_random(AuthAction::Create, 10);
        req.username = Some(name.clone());
        req.mail_password = true;
        let password = req.password.clone().unwrap();
        let reqs: Vec<AuthenticationRequest> = vec![req.into()];

        let mut session = AuthSession::new();
        let response = h.provider.begin_primary_account_creation(&user, &creator, &reqs, &mut session);
        let outcome = h.provider.finish_account_creation(&user, &creator, &response).unwrap();

        assert_eq!(outcome.notice, Some(CreationNotice::ByEmail));
        assert!(!outcome.mail.is_ok());
        assert!(outcome.mail.has_message("mailerror"));
        assert_eq!(h.mailer.count(), 1);
        assert!(h.login(&name, &password).0.is_pass());
    }

    #[test]
    fn test_revoke_access_for_user() {
        let h = Harness::new(params());
        h.set_password("Alice", "TemporaryPassword", None);
        assert!(h.provider.user_can_authenticate("Alice").unwrap());

        h.provider.revoke_access_for_user("alice").unwrap();
        assert!(!h.provider.user_can_authenticate("Alice").unwrap());
        assert!(h.provider.user_exists("Alice").unwrap());

        // Unknown and invalid names are ignored
        h.provider.revoke_access_for_user("DoesNotExist").unwrap();
        h.provider.revoke_access_for_user("<invalid>").unwrap();
    }

    #[test]
    fn test_end_to_end_reset_flow() {
        let h = Harness::new(params());
        h.set_password("Alice", "password", None);

        let (response, session) = h.login("Alice", "password");
        assert_eq!(response, AuthenticationResponse::new_pass("Alice"));
        assert!(session.get(RESET_PASS_KEY).is_some());
        assert_eq!(h.login("Alice", "not-the-password").0, wrong_password());

        let mut reqs = h.provider.get_authentication_requests(AuthAction::Change, Some("Alice"));
        let AuthenticationRequest::TemporaryPassword(req) = &mut reqs[0] else {
            panic!("expected a temporary password request");
        };
        req.username = Some("Alice".to_string());
        let new_password = req.password.clone().unwrap();

        assert!(h
            .provider
            .allows_authentication_data_change(&reqs[0], true)
            .unwrap()
            .is_ok());
        h.provider.change_authentication_data(&reqs[0]).unwrap();

        assert_eq!(h.login("Alice", "password").0, wrong_password());
        assert!(h.login("Alice", &new_password).0.is_pass());
    }
}
