mod otp;
mod twitter;

pub use otp::{NewOtpRecord, OtpRecord, OtpState};
pub use twitter::{NewTwitterSession, SessionState, TwitterSession};
