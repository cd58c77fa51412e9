pub mod analyze;
pub mod init;
pub mod run;
pub mod validate;
