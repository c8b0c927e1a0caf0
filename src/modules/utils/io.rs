use std::io;
use std::net::IpAddr;

/// Helper function to read a line from stdin
pub fn read_line() -> io::Result<String> {
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Helper function to validate email format
pub fn is_valid_email(email: &str) -> bool {
    // Basic email validation
    email.contains('@')
        && email.contains('.')
        && !email.contains(' ')
        && email.chars().filter(|&c| c == '@').count() == 1
        && email.len() >= 5
}

/// True for a well-formed IPv4 or IPv6 literal
pub fn is_ip_address(text: &str) -> bool {
    text.trim().parse::<IpAddr>().is_ok()
}
