use crate::file_ref::ContentUri;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentAction {
    Send,
    SendMultiple,
    GetContent,
}

impl IntentAction {
    pub fn as_android(self) -> &'static str {
        match self {
            IntentAction::Send => "android.intent.action.SEND",
            IntentAction::SendMultiple => "android.intent.action.SEND_MULTIPLE",
            IntentAction::GetContent => "android.intent.action.GET_CONTENT",
        }
    }
}

/// Platform-neutral description of an outbound activity request.
///
/// Platform adapters translate this into a real `android.content.Intent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub action: IntentAction,
    pub mime_type: String,
    pub text: Option<String>,
    pub streams: Vec<ContentUri>,
    /// `FLAG_GRANT_READ_URI_PERMISSION` for the receiving process
    pub grant_read: bool,
    pub allow_multiple: bool,
    /// Target package; when absent the intent goes through the system chooser
    pub package: Option<String>,
    pub via_chooser: bool,
}

impl Intent {
    pub fn new(action: IntentAction, mime_type: impl Into<String>) -> Self {
        Self {
            action,
            mime_type: mime_type.into(),
            text: None,
            streams: Vec::new(),
            grant_read: false,
            allow_multiple: false,
            package: None,
            via_chooser: false,
        }
    }

    pub fn with_text(mut self, text: Option<&str>) -> Self {
        self.text = text.map(str::to_string);
        self
    }

    pub fn with_streams(mut self, streams: Vec<ContentUri>) -> Self {
        self.streams = streams;
        self.grant_read = true;
        self
    }

    pub fn allowing_multiple(mut self, allow_multiple: bool) -> Self {
        self.allow_multiple = allow_multiple;
        self
    }

    /// Address the intent to `package`, or route it through the chooser
    pub fn addressed_to(mut self, package: Option<&str>) -> Self {
        self.package = package.map(str::to_string);
        self.via_chooser = self.package.is_none();
        self
    }
}
