//! Android implementations of the shared storage engine's platform traits,
//! reached through JNI.
//!
//! Everything except [`columns`] and [`init_logging`] only exists when
//! building for Android.

pub mod columns;

#[cfg(target_os = "android")]
mod broker;
#[cfg(target_os = "android")]
mod context;
#[cfg(target_os = "android")]
mod host;
#[cfg(target_os = "android")]
mod launcher;
#[cfg(target_os = "android")]
mod mime;
#[cfg(target_os = "android")]
mod services;
#[cfg(target_os = "android")]
mod streams;

#[cfg(target_os = "android")]
pub use broker::JniContentBroker;
#[cfg(target_os = "android")]
pub use context::AndroidContext;
#[cfg(target_os = "android")]
pub use host::AndroidHost;
#[cfg(target_os = "android")]
pub use launcher::{AndroidLauncher, picker_result_from_intent};
#[cfg(target_os = "android")]
pub use mime::JniMimeTypeMap;
#[cfg(target_os = "android")]
pub use services::AndroidServices;

pub const LOG_TAG: &str = "SharedStorage";

/// Route the `log` facade to logcat on Android, stderr elsewhere. Safe to
/// call more than once.
pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag(LOG_TAG),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        let _ = env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .try_init();
    }

    log::debug!("{LOG_TAG} logging initialised");
}
