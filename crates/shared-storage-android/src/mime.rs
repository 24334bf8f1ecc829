use crate::context::{AndroidContext, optional_string};
use jni::objects::JValue;
use shared_storage_engine::MimeRegistry;
use std::sync::Arc;

/// The platform's `android.webkit.MimeTypeMap`
pub struct JniMimeTypeMap {
    context: Arc<AndroidContext>,
}

impl JniMimeTypeMap {
    pub fn new(context: Arc<AndroidContext>) -> Self {
        Self { context }
    }
}

impl MimeRegistry for JniMimeTypeMap {
    fn mime_type_from_extension(&self, extension: &str) -> Option<String> {
        self.context
            .with_env(|env, _| {
                let map = env
                    .call_static_method(
                        "android/webkit/MimeTypeMap",
                        "getSingleton",
                        "()Landroid/webkit/MimeTypeMap;",
                        &[],
                    )?
                    .l()?;
                let extension = env.new_string(extension)?;
                let mime_type = env
                    .call_method(
                        &map,
                        "getMimeTypeFromExtension",
                        "(Ljava/lang/String;)Ljava/lang/String;",
                        &[JValue::Object(&extension)],
                    )?
                    .l()?;
                optional_string(env, mime_type)
            })
            .unwrap_or_else(|e| {
                log::debug!("MimeTypeMap lookup of {extension} failed: {e}");
                None
            })
    }
}
