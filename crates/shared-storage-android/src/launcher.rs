use crate::context::{AndroidContext, parse_uri, uri_string};
use jni::JNIEnv;
use jni::objects::{JObject, JValue};
use shared_storage_engine::{
    ActivityLauncher, ContentUri, Intent, IntentAction, PickerResult, StorageError,
};
use std::sync::Arc;

const EXTRA_TEXT: &str = "android.intent.extra.TEXT";
const EXTRA_STREAM: &str = "android.intent.extra.STREAM";
const EXTRA_ALLOW_MULTIPLE: &str = "android.intent.extra.ALLOW_MULTIPLE";
const FLAG_GRANT_READ_URI_PERMISSION: i32 = 0x00000001;
const FLAG_ACTIVITY_NEW_TASK: i32 = 0x10000000;

/// Starts activities from the app's context. Results come back through the
/// host's `onActivityResult`, see [`picker_result_from_intent`].
pub struct AndroidLauncher {
    context: Arc<AndroidContext>,
}

impl AndroidLauncher {
    pub fn new(context: Arc<AndroidContext>) -> Self {
        Self { context }
    }
}

impl ActivityLauncher for AndroidLauncher {
    fn start_activity(&self, intent: &Intent) -> Result<(), StorageError> {
        self.context.with_env(|env, context| {
            let android_intent = build_intent(env, intent)?;
            if !env.is_instance_of(context, "android/app/Activity")? {
                add_flags(env, &android_intent, FLAG_ACTIVITY_NEW_TASK)?;
            }
            env.call_method(
                context,
                "startActivity",
                "(Landroid/content/Intent;)V",
                &[JValue::Object(&android_intent)],
            )?;
            Ok(())
        })
    }

    fn start_activity_for_result(
        &self,
        intent: &Intent,
        request_code: i32,
    ) -> Result<(), StorageError> {
        let started = self.context.with_env(|env, context| {
            if !env.is_instance_of(context, "android/app/Activity")? {
                return Ok(false);
            }
            let android_intent = build_intent(env, intent)?;
            env.call_method(
                context,
                "startActivityForResult",
                "(Landroid/content/Intent;I)V",
                &[JValue::Object(&android_intent), JValue::Int(request_code)],
            )?;
            Ok(true)
        })?;
        if started {
            Ok(())
        } else {
            Err(StorageError::Unavailable(
                "activity results need an Activity context".to_string(),
            ))
        }
    }
}

/// Read the `data` intent handed to `onActivityResult`
pub fn picker_result_from_intent(
    context: &AndroidContext,
    data: &JObject,
) -> Result<PickerResult, StorageError> {
    context.with_env(|env, _| {
        if data.is_null() {
            return Ok(PickerResult::default());
        }
        let uri = env
            .call_method(data, "getData", "()Landroid/net/Uri;", &[])?
            .l()?;
        let single = uri_string(env, &uri)?.map(ContentUri::new);

        let clip = env
            .call_method(data, "getClipData", "()Landroid/content/ClipData;", &[])?
            .l()?;
        let mut clip_items = Vec::new();
        if !clip.is_null() {
            let count = env.call_method(&clip, "getItemCount", "()I", &[])?.i()?;
            for index in 0..count {
                let item = env
                    .call_method(
                        &clip,
                        "getItemAt",
                        "(I)Landroid/content/ClipData$Item;",
                        &[JValue::Int(index)],
                    )?
                    .l()?;
                let uri = env
                    .call_method(&item, "getUri", "()Landroid/net/Uri;", &[])?
                    .l()?;
                if let Some(uri) = uri_string(env, &uri)? {
                    clip_items.push(ContentUri::new(uri));
                }
            }
        }
        Ok(PickerResult {
            data: single,
            clip_items,
        })
    })
}

fn build_intent<'local>(
    env: &mut JNIEnv<'local>,
    intent: &Intent,
) -> jni::errors::Result<JObject<'local>> {
    let action = env.new_string(intent.action.as_android())?;
    let android_intent = env.new_object(
        "android/content/Intent",
        "(Ljava/lang/String;)V",
        &[JValue::Object(&action)],
    )?;
    let mime_type = env.new_string(&intent.mime_type)?;
    env.call_method(
        &android_intent,
        "setType",
        "(Ljava/lang/String;)Landroid/content/Intent;",
        &[JValue::Object(&mime_type)],
    )?;

    if let Some(text) = &intent.text {
        let key = env.new_string(EXTRA_TEXT)?;
        let text = env.new_string(text)?;
        env.call_method(
            &android_intent,
            "putExtra",
            "(Ljava/lang/String;Ljava/lang/String;)Landroid/content/Intent;",
            &[JValue::Object(&key), JValue::Object(&text)],
        )?;
    }

    match intent.streams.as_slice() {
        [] => {}
        [stream] if intent.action == IntentAction::Send => {
            let key = env.new_string(EXTRA_STREAM)?;
            let uri = parse_uri(env, stream.as_str())?;
            env.call_method(
                &android_intent,
                "putExtra",
                "(Ljava/lang/String;Landroid/os/Parcelable;)Landroid/content/Intent;",
                &[JValue::Object(&key), JValue::Object(&uri)],
            )?;
        }
        streams => {
            let list = env.new_object("java/util/ArrayList", "()V", &[])?;
            for stream in streams {
                let uri = parse_uri(env, stream.as_str())?;
                env.call_method(&list, "add", "(Ljava/lang/Object;)Z", &[JValue::Object(&uri)])?;
            }
            let key = env.new_string(EXTRA_STREAM)?;
            env.call_method(
                &android_intent,
                "putParcelableArrayListExtra",
                "(Ljava/lang/String;Ljava/util/ArrayList;)Landroid/content/Intent;",
                &[JValue::Object(&key), JValue::Object(&list)],
            )?;
        }
    }

    if intent.grant_read {
        add_flags(env, &android_intent, FLAG_GRANT_READ_URI_PERMISSION)?;
    }
    if intent.action == IntentAction::GetContent {
        let key = env.new_string(EXTRA_ALLOW_MULTIPLE)?;
        env.call_method(
            &android_intent,
            "putExtra",
            "(Ljava/lang/String;Z)Landroid/content/Intent;",
            &[
                JValue::Object(&key),
                JValue::Bool(u8::from(intent.allow_multiple)),
            ],
        )?;
    }
    if let Some(package) = &intent.package {
        let package = env.new_string(package)?;
        env.call_method(
            &android_intent,
            "setPackage",
            "(Ljava/lang/String;)Landroid/content/Intent;",
            &[JValue::Object(&package)],
        )?;
    }

    if intent.via_chooser {
        env.call_static_method(
            "android/content/Intent",
            "createChooser",
            "(Landroid/content/Intent;Ljava/lang/CharSequence;)Landroid/content/Intent;",
            &[
                JValue::Object(&android_intent),
                JValue::Object(&JObject::null()),
            ],
        )?
        .l()
    } else {
        Ok(android_intent)
    }
}

fn add_flags(env: &mut JNIEnv, intent: &JObject, flags: i32) -> jni::errors::Result<()> {
    env.call_method(
        intent,
        "addFlags",
        "(I)Landroid/content/Intent;",
        &[JValue::Int(flags)],
    )?;
    Ok(())
}
