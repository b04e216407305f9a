pub mod announcement;
pub mod application;
pub mod cohort;
pub mod common;
pub mod dashboard;
pub mod deadline;
pub mod evaluation;
pub mod forum;
pub mod onboarding;
pub mod project;
pub mod role;
pub mod submission;
pub mod thread;
pub mod user;
pub mod vote_event;
