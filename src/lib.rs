//! GTM Playbook is a questionnaire wizard that turns go-to-market answers into a
//! PDF playbook via an LLM.

pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod playbook;
pub mod session;
pub mod web;
pub mod wizard;
