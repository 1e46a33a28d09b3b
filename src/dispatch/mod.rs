pub mod lifecycle;
pub mod locator;
pub mod otp;
