pub mod io;
pub mod logging;
pub mod time;

pub use io::{is_ip_address, is_valid_email, read_line};
pub use logging::{format_sensitive, initialize_logging, log_auth_event, log_data_operation};
pub use time::{format_duration, get_current_timestamp, Clock, FixedClock, SystemClock};
