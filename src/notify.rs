//! Transient user notifications ("toasts").
//!
//! Screens push notices while handling an action; the binary drains and prints them
//! once the action is done. Every notice is logged as it is raised.

use log::{info, warn};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            Level::Success => "ok",
            Level::Info => "--",
            Level::Error => "!!",
        };
        write!(f, "[{}] {}", tag, self.message)
    }
}

#[derive(Debug, Default)]
pub struct Notices {
    queue: Vec<Notice>,
}

impl Notices {
    pub fn new() -> Self {
        Notices::default()
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(Level::Success, message.into());
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Level::Info, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Level::Error, message.into());
    }

    fn push(&mut self, level: Level, message: String) {
        match level {
            Level::Error => warn!("notice: {}", message),
            _ => info!("notice: {}", message),
        }
        self.queue.push(Notice { level, message });
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.queue.iter()
    }

    pub fn has_error(&self) -> bool {
        self.queue.iter().any(|n| n.level == Level::Error)
    }

    pub fn contains(&self, message: &str) -> bool {
        self.queue.iter().any(|n| n.message == message)
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.queue)
    }
}
