//! User-visible outcome notices of the edit flows.

use std::sync::{Mutex, mpsc};
use std::time::Duration;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// One flow outcome, worded for the person editing prices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Receiving end of a notice subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct NoticeFeed {
    receiver: mpsc::Receiver<Notice>,
}

impl NoticeFeed {
    pub fn try_recv(&self) -> Result<Notice, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Notice, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything published so far, without blocking.
    pub fn pending(&self) -> Vec<Notice> {
        self.receiver.try_iter().collect()
    }
}

/// Fan-out of notices to every live feed.
#[derive(Debug, Default)]
pub(crate) struct NoticeBoard {
    subscribers: Mutex<Vec<mpsc::Sender<Notice>>>,
}

impl NoticeBoard {
    pub(crate) fn publish(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => tracing::info!(text = %notice.message, "notice"),
            NoticeLevel::Error => tracing::warn!(text = %notice.message, "notice"),
        }

        // Dead feeds are dropped while publishing.
        match self.subscribers.lock() {
            Ok(mut subs) => subs.retain(|tx| tx.send(notice.clone()).is_ok()),
            Err(_) => tracing::warn!(text = %notice.message, "notice subscribers poisoned; notice not delivered"),
        }
    }

    pub(crate) fn subscribe(&self) -> NoticeFeed {
        let (tx, rx) = mpsc::channel();
        match self.subscribers.lock() {
            Ok(mut subs) => subs.push(tx),
            Err(_) => tracing::warn!("notice subscribers poisoned; feed will stay empty"),
        }
        NoticeFeed { receiver: rx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_fan_out_and_dead_feeds_are_pruned() {
        let board = NoticeBoard::default();
        let a = board.subscribe();
        let b = board.subscribe();

        board.publish(Notice::info("saved"));
        assert_eq!(a.pending(), vec![Notice::info("saved")]);
        assert_eq!(b.try_recv().unwrap().level, NoticeLevel::Info);

        drop(b);
        board.publish(Notice::error("failed"));
        assert_eq!(board.subscribers.lock().unwrap().len(), 1);
        assert_eq!(a.pending(), vec![Notice::error("failed")]);
    }

    #[test]
    fn poisoned_board_keeps_publishing_without_delivery() {
        let board = std::sync::Arc::new(NoticeBoard::default());
        let feed = board.subscribe();

        let poisoner = board.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.subscribers.lock().unwrap();
            panic!("poison the subscriber list");
        })
        .join();
        assert!(board.subscribers.is_poisoned());

        board.publish(Notice::info("saved"));
        assert!(feed.pending().is_empty());
        assert!(board.subscribe().pending().is_empty());
    }
}
