use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::{error, info};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use tempass::auth::password::read_password;
use tempass::auth::{
    AccountUser, AuthAction, AuthSession, AuthenticationRequest, AuthenticationResponse,
    PasswordRequest, StatusValue, TemporaryPasswordRequest, RESET_PASS_KEY,
};
use tempass::email::{setup_email_credentials, Mailer, RecordingMailer, SmtpMailer};
use tempass::hashing::{PasswordHasher, Pbkdf2Hasher};
use tempass::utils::{initialize_logging, is_valid_email};
use tempass::{
    ProviderConfig, ProviderError, ProviderParams, SiteConfig, TemporaryPasswordProvider,
    UserStore, LOG_FILE, USERS_FILE,
};

fn cli() -> Command {
    let name = || Arg::new("name").help("Account name").required(true);

    Command::new("tempass")
        .about("Issue and check temporary passwords")
        .subcommand_required(true)
        .arg(
            Arg::new("store")
                .long("store")
                .value_name("FILE")
                .default_value(USERS_FILE)
                .help("JSON user store"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Site configuration (JSON)"),
        )
        .arg(
            Arg::new("log")
                .long("log")
                .value_name("FILE")
                .default_value(LOG_FILE)
                .help("Log file"),
        )
        .arg(
            Arg::new("print-mail")
                .long("print-mail")
                .action(ArgAction::SetTrue)
                .help("Print outgoing mail instead of sending it over SMTP"),
        )
        .subcommand(
            Command::new("add-user")
                .about("Create an account")
                .arg(name())
                .arg(Arg::new("email").long("email").help("Account email address"))
                .arg(
                    Arg::new("issue")
                        .long("issue")
                        .action(ArgAction::SetTrue)
                        .help("Give the account a temporary password"),
                )
                .arg(
                    Arg::new("mail")
                        .long("mail")
                        .action(ArgAction::SetTrue)
                        .requires("issue")
                        .help("Mail the temporary password to the new account"),
                )
                .arg(
                    Arg::new("creator")
                        .long("creator")
                        .default_value("Maintenance script")
                        .help("Name shown as the account creator"),
                ),
        )
        .subcommand(
            Command::new("issue")
                .about("Issue a new temporary password")
                .arg(name())
                .arg(
                    Arg::new("mail")
                        .long("mail")
                        .action(ArgAction::SetTrue)
                        .help("Mail the password instead of printing it"),
                )
                .arg(
                    Arg::new("caller")
                        .long("caller")
                        .help("Username or IP address the reset is attributed to"),
                ),
        )
        .subcommand(
            Command::new("revoke")
                .about("Disable an account's temporary password")
                .arg(name()),
        )
        .subcommand(
            Command::new("login")
                .about("Try a temporary password")
                .arg(name()),
        )
        .subcommand(Command::new("hash").about("Hash a password read from the terminal"))
        .subcommand(
            Command::new("smtp-setup")
                .about("Store SMTP credentials in the system keyring")
                .arg(Arg::new("user").help("SMTP login (email address)").required(true))
                .arg(Arg::new("host").help("SMTP server").required(true))
                .arg(
                    Arg::new("port")
                        .help("SMTP port")
                        .value_parser(value_parser!(u16))
                        .default_value("587"),
                ),
        )
}

fn main() -> ExitCode {
    let matches = cli().get_matches();

    if let Some(log_path) = matches.get_one::<String>("log") {
        if let Err(e) = initialize_logging(Path::new(log_path)) {
            eprintln!("Warning: logging disabled: {}", e);
        }
    }

    match run(&matches) {
        Ok(code) => code,
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Value of an argument clap already guarantees to be present
fn arg<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a str, ProviderError> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .ok_or_else(|| ProviderError::Config(format!("missing argument `{}`", id)))
}

fn run(matches: &ArgMatches) -> Result<ExitCode, ProviderError> {
    let site = match matches.get_one::<String>("config") {
        Some(path) => SiteConfig::load(Path::new(path))?,
        None => SiteConfig::default(),
    };
    let config = ProviderConfig::resolve(&ProviderParams::default(), &site);
    let print_mail = matches.get_flag("print-mail");

    let Some((command, sub)) = matches.subcommand() else {
        return Ok(ExitCode::FAILURE);
    };
    info!("Running `{}`", command);

    match command {
        "hash" => {
            println!("Enter password:");
            let password = read_password()?;
            println!("{}", Pbkdf2Hasher::default().hash(&password));
            return Ok(ExitCode::SUCCESS);
        }
        "smtp-setup" => {
            let port = sub.get_one::<u16>("port").copied().unwrap_or(587);
            setup_email_credentials(arg(sub, "user")?, arg(sub, "host")?, port)?;
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let store = Arc::new(UserStore::open(Path::new(arg(matches, "store")?))?);
    let recorder = Arc::new(RecordingMailer::new());
    let sends_mail = sub.try_get_one::<bool>("mail").ok().flatten().copied().unwrap_or(false);
    let mailer: Arc<dyn Mailer> = if sends_mail && !print_mail {
        Arc::new(SmtpMailer::from_keyring()?)
    } else {
        recorder.clone()
    };
    let provider = TemporaryPasswordProvider::new(config, store.clone(), mailer);

    let code = match command {
        "add-user" => add_user(&provider, &store, sub)?,
        "issue" => issue(&provider, sub)?,
        "revoke" => {
            provider.revoke_access_for_user(arg(sub, "name")?)?;
            println!("Temporary password revoked.");
            ExitCode::SUCCESS
        }
        "login" => login(&provider, arg(sub, "name")?)?,
        other => {
            eprintln!("Unknown command `{}`", other);
            ExitCode::FAILURE
        }
    };

    for mail in recorder.sent() {
        println!("\n--- mail to {} ---\nSubject: {}\n\n{}", mail.to, mail.subject, mail.body);
    }
    Ok(code)
}

fn print_problems(status: &StatusValue) {
    for message in status.errors() {
        println!("Error: {}", message);
    }
    for message in status.warnings() {
        println!("Warning: {}", message);
    }
}

/// What to tell the operator about a freshly stored password.
///
/// A failed mail still leaves the password stored, so it is shown instead.
fn delivery_report(password: &str, mailed: bool, mail_status: &StatusValue) -> String {
    match (mailed, mail_status.is_ok()) {
        (true, true) => "the password was sent by email.".to_string(),
        (true, false) => format!(
            "the password could not be mailed ({}). Temporary password: {}",
            mail_status, password
        ),
        (false, _) => format!("temporary password: {}", password),
    }
}

fn add_user(
    provider: &TemporaryPasswordProvider,
    store: &UserStore,
    sub: &ArgMatches,
) -> Result<ExitCode, ProviderError> {
    let name = arg(sub, "name")?;
    let email = sub.get_one::<String>("email").map(String::as_str);
    if let Some(email) = email {
        if !is_valid_email(email) {
            return Err(ProviderError::Config(format!("invalid email address `{}`", email)));
        }
    }

    if !sub.get_flag("issue") {
        let canonical = store.add_user(name, email)?;
        println!("Created account \"{}\".", canonical);
        return Ok(ExitCode::SUCCESS);
    }

    let Some(canonical) = provider.normalize_username(name) else {
        return Err(ProviderError::Config(format!("invalid username `{}`", name)));
    };
    let mut user = AccountUser::new(canonical.clone());
    if let Some(email) = email {
        user = user.with_email(email);
    }
    let creator = AccountUser::new(arg(sub, "creator")?);

    let mut req = TemporaryPasswordRequest::new_random(
        AuthAction::Create,
        provider.config().generated_password_length(),
    );
    req.username = Some(canonical.clone());
    req.mail_password = sub.get_flag("mail");
    let password = req.password.clone().unwrap_or_default();
    let reqs: Vec<AuthenticationRequest> = vec![req.into()];

    let status = provider.test_for_account_creation(&user, &creator, &reqs);
    print_problems(&status);
    if !status.is_ok() {
        return Ok(ExitCode::FAILURE);
    }

    let mut session = AuthSession::new();
    let response = provider.begin_primary_account_creation(&user, &creator, &reqs, &mut session);
    if !response.is_pass() {
        return Ok(ExitCode::FAILURE);
    }

    store.add_user(&canonical, email)?;
    let outcome = provider.finish_account_creation(&user, &creator, &response)?;
    println!(
        "Created account \"{}\"; {}",
        canonical,
        delivery_report(&password, outcome.notice.is_some(), &outcome.mail)
    );
    if outcome.mail.is_ok() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn issue(provider: &TemporaryPasswordProvider, sub: &ArgMatches) -> Result<ExitCode, ProviderError> {
    let name = arg(sub, "name")?;
    let mut req = TemporaryPasswordRequest::new_random(
        AuthAction::Change,
        provider.config().generated_password_length(),
    );
    req.username = Some(name.to_string());
    req.mail_password = sub.get_flag("mail");
    req.caller = sub.get_one::<String>("caller").cloned();
    let password = req.password.clone().unwrap_or_default();
    let mail_password = req.mail_password;
    let req: AuthenticationRequest = req.into();

    let status = provider.allows_authentication_data_change(&req, true)?;
    if status.value() == Some("ignored") {
        println!("No such user \"{}\".", name);
        return Ok(ExitCode::FAILURE);
    }
    print_problems(&status);
    if !status.is_ok() {
        return Ok(ExitCode::FAILURE);
    }

    let status = provider.change_authentication_data(&req)?;
    println!(
        "Temporary password stored; {}",
        delivery_report(&password, mail_password, &status)
    );
    if status.is_ok() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn login(provider: &TemporaryPasswordProvider, name: &str) -> Result<ExitCode, ProviderError> {
    println!("Enter temporary password:");
    let password = read_password()?;
    let req = PasswordRequest {
        action: AuthAction::Login,
        username: Some(name.to_string()),
        password: Some(password),
    };

    let mut session = AuthSession::new();
    match provider.begin_primary_authentication(&[req.into()], &mut session)? {
        AuthenticationResponse::Pass { username, .. } => {
            println!("PASS {}", username);
            if session.get(RESET_PASS_KEY).is_some() {
                println!("A new password must be chosen before continuing.");
            }
            Ok(ExitCode::SUCCESS)
        }
        AuthenticationResponse::Fail(message) => {
            println!("FAIL {}", message);
            Ok(ExitCode::FAILURE)
        }
        AuthenticationResponse::Abstain => {
            println!("ABSTAIN: no such user or nothing to check");
            Ok(ExitCode::FAILURE)
        }
    }
}
