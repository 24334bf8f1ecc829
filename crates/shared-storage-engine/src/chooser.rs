//! Front-end for the system "get content" picker.
//!
//! The picker answers through the host's activity-result channel, so a
//! request and its result are two separate calls. A result is matched by
//! request code and delivered at most once.

use crate::error::StorageError;
use crate::file_ref::{ContentUri, FileRef};
use crate::intent::{Intent, IntentAction};
use crate::platform::ActivityLauncher;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const REQUEST_CODE_SINGLE: i32 = 42434445;
pub const REQUEST_CODE_MULTIPLE: i32 = 42434446;

/// `Activity.RESULT_OK`
pub const RESULT_OK: i32 = -1;

/// The data intent of a picker result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickerResult {
    pub data: Option<ContentUri>,
    pub clip_items: Vec<ContentUri>,
}

impl PickerResult {
    pub fn single(uri: ContentUri) -> Self {
        Self {
            data: Some(uri),
            clip_items: Vec::new(),
        }
    }

    pub fn clip(items: Vec<ContentUri>) -> Self {
        Self {
            data: None,
            clip_items: items,
        }
    }
}

pub type ResultCallback = Box<dyn FnMut(Vec<FileRef>) + Send>;
pub type RefreshHook = Box<dyn FnMut() + Send>;

#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    request_code: i32,
    issued: Instant,
}

pub struct Chooser {
    launcher: Arc<dyn ActivityLauncher>,
    on_result: ResultCallback,
    viewport_refresh: Option<RefreshHook>,
    pending: Option<PendingRequest>,
    refresh_armed: bool,
}

impl Chooser {
    pub fn new(launcher: Arc<dyn ActivityLauncher>, on_result: ResultCallback) -> Self {
        Self {
            launcher,
            on_result,
            viewport_refresh: None,
            pending: None,
            refresh_armed: false,
        }
    }

    /// Hook run on the first resume after a picker round trip. Some
    /// devices render a blank window after the picker closes until the
    /// viewport is redrawn.
    pub fn with_viewport_refresh(mut self, refresh: RefreshHook) -> Self {
        self.viewport_refresh = Some(refresh);
        self
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn choose_content(&mut self, mime_filter: &str, multiple: bool) {
        if let Err(e) = self.try_choose_content(mime_filter, multiple) {
            log::warn!("Chooser.choose_content(): {e}");
        }
    }

    /// Launch the picker. A request still pending is replaced.
    pub fn try_choose_content(
        &mut self,
        mime_filter: &str,
        multiple: bool,
    ) -> Result<(), StorageError> {
        let request_code = if multiple {
            REQUEST_CODE_MULTIPLE
        } else {
            REQUEST_CODE_SINGLE
        };
        let intent = Intent::new(IntentAction::GetContent, mime_filter)
            .allowing_multiple(multiple)
            .addressed_to(None);

        if let Some(previous) = self.pending.take() {
            log::debug!(
                "Replacing pending picker request {}",
                previous.request_code
            );
        }
        self.launcher
            .start_activity_for_result(&intent, request_code)?;
        self.pending = Some(PendingRequest {
            request_code,
            issued: Instant::now(),
        });
        self.refresh_armed = true;
        Ok(())
    }

    /// Forward an activity result. Returns true if it answered the
    /// pending request.
    pub fn on_activity_result(
        &mut self,
        request_code: i32,
        result_code: i32,
        result: PickerResult,
    ) -> bool {
        match self.pending {
            Some(pending) if pending.request_code == request_code => {}
            _ => return false,
        }
        self.pending = None;

        if result_code != RESULT_OK {
            log::debug!("Picker dismissed with result code {result_code}");
            return true;
        }

        let uris = match (request_code, result.data) {
            (REQUEST_CODE_MULTIPLE, None) => result.clip_items,
            (_, Some(uri)) => vec![uri],
            (_, None) => Vec::new(),
        };
        (self.on_result)(uris.into_iter().map(FileRef::Handle).collect());
        true
    }

    pub fn on_resume(&mut self) {
        if !std::mem::take(&mut self.refresh_armed) {
            return;
        }
        if let Some(refresh) = self.viewport_refresh.as_mut() {
            refresh();
        }
    }

    /// Forget a request that has gone unanswered for `timeout`. A
    /// dismissed picker may never report back, so hosts call this to
    /// treat silence as cancellation.
    pub fn cancel_if_stale(&mut self, timeout: Duration) -> bool {
        match self.pending {
            Some(pending) if pending.issued.elapsed() >= timeout => {
                log::info!(
                    "Picker request {} timed out after {timeout:?}",
                    pending.request_code
                );
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}
