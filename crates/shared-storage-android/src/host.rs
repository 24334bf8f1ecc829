use crate::context::{AndroidContext, optional_string};
use jni::JNIEnv;
use jni::objects::{JObject, JValue};
use shared_storage_engine::{HostEnvironment, StorageError};
use std::path::PathBuf;

/// Facts about the running app, read once at startup.
#[derive(Debug, Clone)]
pub struct AndroidHost {
    api_level: u32,
    app_title: String,
    cache_dir: Option<PathBuf>,
    storage_root: Option<PathBuf>,
}

impl AndroidHost {
    pub fn new(context: &AndroidContext) -> Result<Self, StorageError> {
        let host = context.with_env(|env, context| {
            let api_level = get_sdk_version(env)?;
            let app_title = application_label(env, context)?;
            let cache_dir = env
                .call_method(context, "getExternalCacheDir", "()Ljava/io/File;", &[])?
                .l()?;
            let cache_dir = absolute_path(env, cache_dir)?;
            let storage_root = env
                .call_static_method(
                    "android/os/Environment",
                    "getExternalStorageDirectory",
                    "()Ljava/io/File;",
                    &[],
                )?
                .l()?;
            let storage_root = absolute_path(env, storage_root)?;
            Ok(Self {
                api_level: u32::try_from(api_level).unwrap_or_default(),
                app_title,
                cache_dir,
                storage_root,
            })
        })?;
        log::info!(
            "Android SDK version: {}, app: {}",
            host.api_level,
            host.app_title
        );
        Ok(host)
    }
}

impl HostEnvironment for AndroidHost {
    fn api_level(&self) -> u32 {
        self.api_level
    }

    fn app_title(&self) -> String {
        self.app_title.clone()
    }

    fn external_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.clone()
    }

    fn external_storage_root(&self) -> Option<PathBuf> {
        self.storage_root.clone()
    }
}

/// Get the Android SDK version (Build.VERSION.SDK_INT)
fn get_sdk_version(env: &mut JNIEnv) -> jni::errors::Result<i32> {
    let build_version = env.find_class("android/os/Build$VERSION")?;
    let sdk_int = env.get_static_field(build_version, "SDK_INT", "I")?;
    sdk_int.i()
}

/// The launcher label, e.g. "My App"
fn application_label(env: &mut JNIEnv, context: &JObject) -> jni::errors::Result<String> {
    let package_manager = env
        .call_method(
            context,
            "getPackageManager",
            "()Landroid/content/pm/PackageManager;",
            &[],
        )?
        .l()?;
    let info = env
        .call_method(
            context,
            "getApplicationInfo",
            "()Landroid/content/pm/ApplicationInfo;",
            &[],
        )?
        .l()?;
    let label = env
        .call_method(
            &info,
            "loadLabel",
            "(Landroid/content/pm/PackageManager;)Ljava/lang/CharSequence;",
            &[JValue::Object(&package_manager)],
        )?
        .l()?;
    let label = env
        .call_method(&label, "toString", "()Ljava/lang/String;", &[])?
        .l()?;
    Ok(optional_string(env, label)?.unwrap_or_default())
}

fn absolute_path(env: &mut JNIEnv, file: JObject) -> jni::errors::Result<Option<PathBuf>> {
    if file.is_null() {
        return Ok(None);
    }
    let path = env
        .call_method(&file, "getAbsolutePath", "()Ljava/lang/String;", &[])?
        .l()?;
    Ok(optional_string(env, path)?.map(PathBuf::from))
}
