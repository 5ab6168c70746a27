pub mod accounts;
pub mod config;
pub mod recaptcha;
pub mod signup;
