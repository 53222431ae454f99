use tgsearch_types::{ClientCommand, Direction, Message};
use tgsearch_window::{BatchReport, BoundaryPolicy, MessageWindow, WindowError, infer_direction_with};
use tracing::{debug, info};

/// What happened to one incoming batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedBatch {
    pub direction: Direction,
    /// True if an `Initial` classification wiped the previous contents.
    pub reset: bool,
    pub report: BatchReport,
}

/// The chat currently open in the view and its message window.
///
/// Only one chat is active at a time. Switching chats replaces the window
/// rather than reusing it.
pub struct ChatSession {
    chat_id: Option<String>,
    window: Option<MessageWindow>,
    default_capacity: usize,
    policy: BoundaryPolicy,
}

impl ChatSession {
    pub fn new(default_capacity: usize) -> Result<Self, WindowError> {
        if default_capacity == 0 {
            return Err(WindowError::InvalidCapacity(default_capacity));
        }

        Ok(Self {
            chat_id: None,
            window: None,
            default_capacity,
            policy: BoundaryPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: BoundaryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Make `chat_id` the active chat. Opening a different chat discards
    /// the old window; re-opening the same chat keeps it and only grows
    /// capacity if asked to.
    pub fn open(&mut self, chat_id: &str, capacity: Option<usize>) -> Result<(), WindowError> {
        let capacity = capacity.unwrap_or(self.default_capacity);

        if self.chat_id.as_deref() == Some(chat_id) && self.window.is_some() {
            self.ensure_capacity(capacity)?;
            return Ok(());
        }

        let window = MessageWindow::new(capacity)?;
        info!(chat_id, capacity, "Opened chat window");
        self.chat_id = Some(chat_id.to_string());
        self.window = Some(window);
        Ok(())
    }

    /// Replace the window with a larger one when `capacity` exceeds the
    /// current capacity. Returns true if the window was replaced.
    pub fn ensure_capacity(&mut self, capacity: usize) -> Result<bool, WindowError> {
        let Some(window) = self.window.as_ref() else {
            return Ok(false);
        };
        if capacity <= window.capacity() {
            return Ok(false);
        }

        let grown = window.resized(capacity)?;
        debug!(from = window.capacity(), to = capacity, "Grew chat window");
        self.window = Some(grown);
        Ok(true)
    }

    pub fn close(&mut self) {
        if let Some(chat_id) = self.chat_id.take() {
            debug!(chat_id, "Closed chat window");
        }
        self.window = None;
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn window(&self) -> Option<&MessageWindow> {
        self.window.as_ref()
    }

    pub fn sorted_ids(&self) -> Vec<i64> {
        self.window.as_ref().map(MessageWindow::sorted_ids).unwrap_or_default()
    }

    pub fn get(&self, id: i64) -> Option<&Message> {
        self.window.as_ref()?.get(id)
    }

    /// Merge a batch delivered for `chat_id`.
    ///
    /// Batches for any other chat are ignored. The direction is inferred
    /// against the window as left by the previous batch. An `Initial`
    /// classification is a reset signal: the window is cleared before the
    /// merge, unless the batch carries no usable ids at all.
    pub fn apply_batch(&mut self, chat_id: &str, messages: &[Message]) -> Option<AppliedBatch> {
        if self.chat_id.as_deref() != Some(chat_id) {
            debug!(chat_id, active = ?self.chat_id, "Ignoring batch for inactive chat");
            return None;
        }
        let window = self.window.as_mut()?;

        let direction = infer_direction_with(messages, Some(&*window), self.policy);
        let has_ids = messages.iter().any(|m| m.numeric_id().is_some());
        let reset = direction == Direction::Initial && has_ids && !window.is_empty();
        if reset {
            debug!(chat_id, resident = window.len(), "Overlapping batch, rebuilding window");
            window.clear();
        }

        let report = window.add_batch(messages, direction);
        Some(AppliedBatch {
            direction,
            reset,
            report,
        })
    }

    /// Request for the next page in `direction`, anchored on the current
    /// window edge. `Initial` asks for the latest page.
    pub fn next_page(&self, direction: Direction, limit: u32) -> Option<ClientCommand> {
        let chat_id = self.chat_id.clone()?;
        let window = self.window.as_ref()?;
        let anchor_id = match direction {
            Direction::Older => Some(window.min_id()?),
            Direction::Newer => Some(window.max_id()?),
            Direction::Initial => None,
        };

        Some(ClientCommand::FetchMessages {
            chat_id,
            direction,
            anchor_id,
            limit,
        })
    }
}
