pub mod admin;
pub mod app;
pub mod channels;
pub mod config;
pub mod dialogue;
pub mod evidence;
pub mod rubric;
pub mod runtime;
pub mod session;
pub mod shared;
pub mod workflow;
