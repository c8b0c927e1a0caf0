use crate::modules::utils::time::format_duration;

/// Who asked for a password reset, as shown to the account owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetCaller {
    Address(String),
    User(String),
    Unknown,
}

/// Everything the reset email needs to say
pub struct ResetEmail<'a> {
    pub site_name: &'a str,
    pub server_url: &'a str,
    pub caller: ResetCaller,
    pub username: &'a str,
    pub password: &'a str,
    /// Seconds the password stays valid; 0 when it never expires
    pub expiry: u64,
    /// Mention the "only allow resets for users who know my email" option
    pub suggest_require_email: bool,
}

fn expiry_line(expiry: u64) -> String {
    if expiry == 0 {
        "This temporary password does not expire, but you should change it right away.".to_string()
    } else {
        format!(
            "This temporary password will expire in {}.",
            format_duration(expiry)
        )
    }
}

/// Subject and body of a password reset email
pub fn password_reset_email(email: &ResetEmail<'_>) -> (String, String) {
    let requester = match &email.caller {
        ResetCaller::Address(ip) => format!("Someone (probably you, from IP address {})", ip),
        ResetCaller::User(name) => format!("User \"{}\"", name),
        ResetCaller::Unknown => "Someone".to_string(),
    };

    let mut body = format!(
        "Hello,\n\n\
        {} requested a password reset for your {} account ({}).\n\n\
        A temporary password has been issued:\n\n\
        Username: {}\n\
        Temporary password: {}\n\n\
        {}\n\
        You will be asked to choose a new password the next time you log in.\n\n\
        If you did not request this reset, or you remember your original password \
        and no longer wish to change it, you may ignore this message and keep using \
        your old password.",
        requester,
        email.site_name,
        email.server_url,
        email.username,
        email.password,
        expiry_line(email.expiry)
    );

    if email.suggest_require_email {
        body.push_str(
            "\n\nTo limit unwanted reset emails, you can set your preferences so that \
            resets are only sent when the requester knows your email address as well \
            as your username.",
        );
    }
    body.push_str(&format!("\n\nBest regards,\n{}", email.site_name));

    (format!("{} password reset", email.site_name), body)
}

/// Subject and body of the mail sent when someone else created the account
pub fn account_created_email(
    site_name: &str,
    server_url: &str,
    creator: &str,
    username: &str,
    password: &str,
    expiry: u64,
) -> (String, String) {
    let body = format!(
        "Hello,\n\n\
        An account has been created for your email address on {} ({}) by \"{}\".\n\n\
        Username: {}\n\
        Temporary password: {}\n\n\
        {}\n\
        Please log in and change your password now.\n\n\
        You may ignore this message if this account was created in error.\n\n\
        Best regards,\n\
        {}",
        site_name,
        server_url,
        creator,
        username,
        password,
        expiry_line(expiry),
        site_name
    );
    (format!("Account details for {}", site_name), body)
}
