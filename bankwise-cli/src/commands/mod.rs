pub mod config;
pub mod grade;
pub mod lessons;
pub mod replay;
