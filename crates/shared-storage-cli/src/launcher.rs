use shared_storage_engine::{ActivityLauncher, Intent, StorageError};

/// Prints intents instead of starting activities.
#[derive(Debug, Default)]
pub struct PrintingLauncher;

impl PrintingLauncher {
    fn print(intent: &Intent, request_code: Option<i32>) {
        println!("{}", intent.action.as_android());
        println!("  type: {}", intent.mime_type);
        if let Some(text) = &intent.text {
            println!("  text: {text}");
        }
        for stream in &intent.streams {
            println!("  stream: {stream}");
        }
        match &intent.package {
            Some(package) => println!("  package: {package}"),
            None if intent.via_chooser => println!("  via chooser"),
            None => {}
        }
        if intent.grant_read {
            println!("  grant: read");
        }
        if let Some(code) = request_code {
            println!("  request code: {code}");
        }
    }
}

impl ActivityLauncher for PrintingLauncher {
    fn start_activity(&self, intent: &Intent) -> Result<(), StorageError> {
        Self::print(intent, None);
        Ok(())
    }

    fn start_activity_for_result(
        &self,
        intent: &Intent,
        request_code: i32,
    ) -> Result<(), StorageError> {
        Self::print(intent, Some(request_code));
        Ok(())
    }
}
