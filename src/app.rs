use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::conversation::{Conversation, HISTORY_LIMIT};
use crate::gemini::{Answer, AnswerService, HistoryTurn};
use crate::location::{LocationError, LocationProvider};
use crate::render::render_message;
use crate::state::{Message, UserLocation};

pub const GREETING: &str = "Hello! I'm GeoGuide AI, your expert in maps, geography, and locations. How can I help you navigate the world today?";

/// Shown in place of an answer when the provider call fails
pub const ERROR_REPLY: &str = "I'm sorry, I encountered an error while retrieving that information. Please check your connection and try again.";

pub const LOCATION_NOTICE: &str =
    "Could not determine your location. Check your connection or set a location in the config file.";

/// Example questions behind the 1/2/3 shortcuts: (label, text)
pub const QUICK_FILLS: [(&str, &str); 3] = [
    ("Nearby Dining", "What are some good Italian restaurants nearby?"),
    ("World Geography", "Tell me about the geography of Japan."),
    ("Specific Places", "Show me a map of Central Park, NY."),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationState {
    Absent,
    Loading,
    Present(UserLocation),
}

impl LocationState {
    pub fn coordinates(&self) -> Option<UserLocation> {
        match self {
            LocationState::Present(loc) => Some(*loc),
            _ => None,
        }
    }
}

/// Who asked for a position read; decides how failures surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationRequest {
    Automatic,
    Manual,
}

/// Everything the answer service needs for one question, captured at call time
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub prompt: String,
    pub location: Option<UserLocation>,
    pub history: Vec<HistoryTurn>,
}

type AnswerTask = JoinHandle<anyhow::Result<Answer>>;
type LocationTask = JoinHandle<Result<UserLocation, LocationError>>;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Conversation state
    pub conversation: Conversation,
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars
    pub pending: bool,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub query_task: Option<AnswerTask>,

    // Location state
    pub location: LocationState,
    pub location_task: Option<(LocationRequest, LocationTask)>,
    pub notice: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Services
    pub answers: Arc<dyn AnswerService>,
    pub locator: Arc<dyn LocationProvider>,
    pub model_name: String,
}

impl App {
    pub fn new(
        answers: Arc<dyn AnswerService>,
        locator: Arc<dyn LocationProvider>,
        model_name: &str,
    ) -> Self {
        let mut conversation = Conversation::new();
        conversation.push(Message::model(GREETING, None));

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            conversation,
            input: String::new(),
            cursor: 0,
            pending: false,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            query_task: None,

            location: LocationState::Absent,
            location_task: None,
            notice: None,

            animation_frame: 0,

            answers,
            locator,
            model_name: model_name.to_string(),
        }
    }

    // Submission

    /// Gate and optimistic insert. Returns `None` when the submission is dropped.
    pub fn begin_submission(&mut self, text: &str) -> Option<Submission> {
        let prompt = text.trim();
        if self.pending || prompt.is_empty() {
            return None;
        }

        // History is taken before the new user message lands
        let history = self.conversation.history(HISTORY_LIMIT);

        self.conversation.push(Message::user(prompt));
        self.pending = true;
        self.input.clear();
        self.cursor = 0;
        self.scroll_to_bottom();

        Some(Submission {
            prompt: prompt.to_string(),
            location: self.location.coordinates(),
            history,
        })
    }

    pub fn finish_submission(&mut self, result: anyhow::Result<Answer>) {
        let reply = match result {
            Ok(answer) => Message::model(answer.text, Some(answer.grounding_chunks)),
            Err(e) => {
                error!("answer request failed: {:#}", e);
                Message::model(ERROR_REPLY, None)
            }
        };
        self.conversation.push(reply);
        self.pending = false;
        self.scroll_to_bottom();
    }

    /// Submit and wait for the answer in place
    pub async fn submit(&mut self, text: &str) -> bool {
        let Some(submission) = self.begin_submission(text) else {
            return false;
        };
        let result = self
            .answers
            .answer(&submission.prompt, submission.location, &submission.history)
            .await
            .map_err(anyhow::Error::from);
        self.finish_submission(result);
        true
    }

    /// Submit the input line on a background task; `poll_tasks` applies the result
    pub fn submit_input(&mut self) -> bool {
        let text = self.input.clone();
        let Some(submission) = self.begin_submission(&text) else {
            return false;
        };

        info!(history = submission.history.len(), "submitting question");
        let answers = Arc::clone(&self.answers);
        self.query_task = Some(tokio::spawn(async move {
            answers
                .answer(&submission.prompt, submission.location, &submission.history)
                .await
                .map_err(anyhow::Error::from)
        }));
        true
    }

    // Location

    /// Starts a read only when no position is held or in flight
    pub fn begin_location(&mut self) -> bool {
        if self.location != LocationState::Absent {
            return false;
        }
        self.location = LocationState::Loading;
        true
    }

    pub fn finish_location(
        &mut self,
        origin: LocationRequest,
        result: Result<UserLocation, LocationError>,
    ) {
        match result {
            Ok(loc) => {
                info!(%loc, "location acquired");
                self.location = LocationState::Present(loc);
            }
            Err(e) => {
                self.location = LocationState::Absent;
                match origin {
                    LocationRequest::Automatic => {
                        warn!("Location access denied or unavailable: {}", e);
                    }
                    LocationRequest::Manual => {
                        warn!("manual location retry failed: {}", e);
                        self.notice = Some(LOCATION_NOTICE.to_string());
                    }
                }
            }
        }
    }

    /// Read the position and wait for it in place
    pub async fn locate(&mut self, origin: LocationRequest) {
        if !self.begin_location() {
            return;
        }
        let result = self.locator.current_position().await;
        self.finish_location(origin, result);
    }

    /// Read the position on a background task
    pub fn request_location(&mut self, origin: LocationRequest) {
        if !self.begin_location() {
            return;
        }
        let locator = Arc::clone(&self.locator);
        self.location_task = Some((
            origin,
            tokio::spawn(async move { locator.current_position().await }),
        ));
    }

    /// Apply results from finished background tasks
    pub async fn poll_tasks(&mut self) {
        if self.query_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.query_task.take() {
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => Err(anyhow!("answer task failed: {}", e)),
                };
                self.finish_submission(result);
            }
        }

        if self.location_task.as_ref().is_some_and(|(_, t)| t.is_finished()) {
            if let Some((origin, task)) = self.location_task.take() {
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => Err(LocationError::Unavailable(e.to_string())),
                };
                self.finish_location(origin, result);
            }
        }
    }

    // Input helpers

    pub fn quick_fill(&mut self, index: usize) {
        if let Some((_, text)) = QUICK_FILLS.get(index) {
            self.input = text.to_string();
            self.cursor = self.input.chars().count();
            self.input_mode = InputMode::Editing;
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.pending || self.location == LocationState::Loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    /// Scroll chat to bottom so the newest message is visible
    pub fn scroll_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for msg in self.conversation.messages() {
            for line in render_message(msg) {
                total_lines += (line.width() / wrap_width) + 1;
            }
        }
        if self.pending {
            total_lines += 2; // label + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height as usize
        } else {
            20
        };

        let scroll = total_lines.saturating_sub(visible_height);
        self.chat_scroll = scroll.min(u16::MAX as usize) as u16;
    }
}
