pub mod lifecycle;
pub mod mailer;
