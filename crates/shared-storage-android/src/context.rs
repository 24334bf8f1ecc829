//! Access to the JVM and the application context from native code.

use crate::columns::classify_exception;
use jni::objects::{GlobalRef, JObject, JString, JThrowable, JValue};
use jni::{JNIEnv, JavaVM};
use shared_storage_engine::StorageError;

const LOCAL_FRAME_CAPACITY: i32 = 32;

/// Exception classes worth telling apart, most specific first
const KNOWN_EXCEPTIONS: [&str; 6] = [
    "android/app/RecoverableSecurityException",
    "java/lang/SecurityException",
    "java/io/FileNotFoundException",
    "java/lang/IllegalArgumentException",
    "java/lang/UnsupportedOperationException",
    "java/io/IOException",
];

pub struct AndroidContext {
    vm: JavaVM,
    context: GlobalRef,
}

impl AndroidContext {
    /// The VM and context the NDK glue registered for this process
    pub fn from_ndk() -> Result<Self, StorageError> {
        let ctx = ndk_context::android_context();
        let vm = unsafe { JavaVM::from_raw(ctx.vm().cast()) }.map_err(jni_error)?;
        let context = {
            let env = vm.attach_current_thread().map_err(jni_error)?;
            let context = unsafe { JObject::from_raw(ctx.context().cast()) };
            env.new_global_ref(context).map_err(jni_error)?
        };
        Ok(Self { vm, context })
    }

    /// Run `f` with an attached env inside its own local reference frame.
    /// A Java exception thrown by `f` is cleared and returned as the
    /// matching [`StorageError`].
    pub fn with_env<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut JNIEnv, &JObject) -> jni::errors::Result<T>,
    {
        let mut env = self.vm.attach_current_thread().map_err(jni_error)?;
        let context = self.context.as_obj();
        match env.with_local_frame(LOCAL_FRAME_CAPACITY, |env| f(env, context)) {
            Ok(value) => Ok(value),
            Err(jni::errors::Error::JavaException) => Err(take_exception(&mut env)),
            Err(e) => Err(jni_error(e)),
        }
    }
}

pub(crate) fn jni_error(e: jni::errors::Error) -> StorageError {
    StorageError::Unavailable(format!("JNI error: {e}"))
}

fn take_exception(env: &mut JNIEnv) -> StorageError {
    let throwable = match env.exception_occurred() {
        Ok(throwable) => throwable,
        Err(e) => return jni_error(e),
    };
    if let Err(e) = env.exception_clear() {
        return jni_error(e);
    }
    describe_exception(env, &throwable).unwrap_or_else(jni_error)
}

fn describe_exception(
    env: &mut JNIEnv,
    throwable: &JThrowable,
) -> jni::errors::Result<StorageError> {
    let mut class_name = None;
    for known in KNOWN_EXCEPTIONS {
        if env.is_instance_of(throwable, known)? {
            class_name = Some(known.replace('/', "."));
            break;
        }
    }
    let class_name = match class_name {
        Some(name) => name,
        None => {
            let class = env
                .call_method(throwable, "getClass", "()Ljava/lang/Class;", &[])?
                .l()?;
            let name = env
                .call_method(&class, "getName", "()Ljava/lang/String;", &[])?
                .l()?;
            optional_string(env, name)?.unwrap_or_default()
        }
    };
    let message = env
        .call_method(throwable, "getMessage", "()Ljava/lang/String;", &[])?
        .l()?;
    let message = optional_string(env, message)?;
    Ok(classify_exception(&class_name, message.as_deref()))
}

/// Read a possibly null `java.lang.String`, releasing the local reference
pub(crate) fn optional_string(
    env: &mut JNIEnv,
    object: JObject,
) -> jni::errors::Result<Option<String>> {
    if object.is_null() {
        return Ok(None);
    }
    let string = JString::from(object);
    let value: String = env.get_string(&string)?.into();
    env.delete_local_ref(string)?;
    Ok(Some(value))
}

pub(crate) fn parse_uri<'local>(
    env: &mut JNIEnv<'local>,
    uri: &str,
) -> jni::errors::Result<JObject<'local>> {
    let uri = env.new_string(uri)?;
    env.call_static_method(
        "android/net/Uri",
        "parse",
        "(Ljava/lang/String;)Landroid/net/Uri;",
        &[JValue::Object(&uri)],
    )?
    .l()
}

/// `uri.toString()`, or `None` for a null `Uri`
pub(crate) fn uri_string(
    env: &mut JNIEnv,
    uri: &JObject,
) -> jni::errors::Result<Option<String>> {
    if uri.is_null() {
        return Ok(None);
    }
    let text = env
        .call_method(uri, "toString", "()Ljava/lang/String;", &[])?
        .l()?;
    optional_string(env, text)
}

pub(crate) fn content_resolver<'local>(
    env: &mut JNIEnv<'local>,
    context: &JObject,
) -> jni::errors::Result<JObject<'local>> {
    env.call_method(
        context,
        "getContentResolver",
        "()Landroid/content/ContentResolver;",
        &[],
    )?
    .l()
}
