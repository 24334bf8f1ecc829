use crate::columns::{self, Row};
use crate::context::{AndroidContext, content_resolver, optional_string, parse_uri, uri_string};
use crate::streams::{JavaInputStream, JavaOutputStream};
use jni::JNIEnv;
use jni::objects::{GlobalRef, JObject, JValue};
use shared_storage_engine::{
    ContentBroker, ContentUri, EntryRecord, MediaRoot, NewEntry, Selection, StorageError,
    WriteMode,
};
use std::io::{Read, Write};
use std::sync::Arc;

const QUERY_SIGNATURE: &str = "(Landroid/net/Uri;[Ljava/lang/String;Ljava/lang/String;[Ljava/lang/String;Ljava/lang/String;)Landroid/database/Cursor;";

/// [`ContentBroker`] backed by the app's `ContentResolver` and MediaStore.
pub struct JniContentBroker {
    context: Arc<AndroidContext>,
}

impl JniContentBroker {
    pub fn new(context: Arc<AndroidContext>) -> Self {
        Self { context }
    }

    fn query_rows<T: Default>(
        &self,
        uri: &ContentUri,
        selection: Option<&Selection>,
        read: fn(&mut JNIEnv, &JObject) -> jni::errors::Result<T>,
    ) -> Result<T, StorageError> {
        let clause = selection.map(columns::selection_clause);
        self.context.with_env(|env, context| {
            let resolver = content_resolver(env, context)?;
            let table = parse_uri(env, uri.as_str())?;
            let (clause, args) = match &clause {
                Some((clause, args)) => (
                    JObject::from(env.new_string(clause)?),
                    string_array(env, args)?,
                ),
                None => (JObject::null(), JObject::null()),
            };
            let cursor = env
                .call_method(
                    &resolver,
                    "query",
                    QUERY_SIGNATURE,
                    &[
                        JValue::Object(&table),
                        JValue::Object(&JObject::null()),
                        JValue::Object(&clause),
                        JValue::Object(&args),
                        JValue::Object(&JObject::null()),
                    ],
                )?
                .l()?;
            with_cursor(env, cursor, read)
        })
    }

    fn open_stream(
        &self,
        uri: &ContentUri,
        method: &str,
        signature: &str,
        mode: Option<&str>,
    ) -> Result<GlobalRef, StorageError> {
        let stream = self.context.with_env(|env, context| {
            let resolver = content_resolver(env, context)?;
            let target = parse_uri(env, uri.as_str())?;
            let stream = match mode {
                Some(mode) => {
                    let mode = env.new_string(mode)?;
                    env.call_method(
                        &resolver,
                        method,
                        signature,
                        &[JValue::Object(&target), JValue::Object(&mode)],
                    )?
                }
                None => {
                    env.call_method(&resolver, method, signature, &[JValue::Object(&target)])?
                }
            }
            .l()?;
            if stream.is_null() {
                return Ok(None);
            }
            env.new_global_ref(stream).map(Some)
        })?;
        stream.ok_or_else(|| {
            StorageError::Unavailable(format!("{method} returned null for {uri}"))
        })
    }
}

impl ContentBroker for JniContentBroker {
    fn insert(&self, root: MediaRoot, entry: &NewEntry) -> Result<ContentUri, StorageError> {
        let table = root.content_uri();
        let inserted = self.context.with_env(|env, context| {
            let resolver = content_resolver(env, context)?;
            let target = parse_uri(env, table.as_str())?;
            let values = env.new_object("android/content/ContentValues", "()V", &[])?;
            for (column, value) in columns::content_values(entry) {
                let column = env.new_string(column)?;
                let value = env.new_string(value)?;
                env.call_method(
                    &values,
                    "put",
                    "(Ljava/lang/String;Ljava/lang/String;)V",
                    &[JValue::Object(&column), JValue::Object(&value)],
                )?;
            }
            let row = env
                .call_method(
                    &resolver,
                    "insert",
                    "(Landroid/net/Uri;Landroid/content/ContentValues;)Landroid/net/Uri;",
                    &[JValue::Object(&target), JValue::Object(&values)],
                )?
                .l()?;
            uri_string(env, &row)
        })?;
        inserted
            .map(ContentUri::new)
            .ok_or_else(|| StorageError::Unavailable(format!("insert into {table} was refused")))
    }

    fn query(
        &self,
        root: MediaRoot,
        selection: &Selection,
    ) -> Result<Vec<EntryRecord>, StorageError> {
        let table = root.content_uri();
        let rows = self.query_rows(&table, Some(selection), read_rows)?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_record(&table, None))
            .collect())
    }

    fn describe(&self, uri: &ContentUri) -> Result<Option<EntryRecord>, StorageError> {
        let row = self.query_rows(uri, None, read_first_row)?;
        Ok(row.map(|row| row.into_record(uri, Some(uri))))
    }

    fn open_read(&self, uri: &ContentUri) -> Result<Box<dyn Read + '_>, StorageError> {
        let stream = self.open_stream(
            uri,
            "openInputStream",
            "(Landroid/net/Uri;)Ljava/io/InputStream;",
            None,
        )?;
        Ok(Box::new(JavaInputStream::new(&self.context, stream)))
    }

    fn open_write(
        &self,
        uri: &ContentUri,
        mode: WriteMode,
    ) -> Result<Box<dyn Write + '_>, StorageError> {
        let stream = self.open_stream(
            uri,
            "openOutputStream",
            "(Landroid/net/Uri;Ljava/lang/String;)Ljava/io/OutputStream;",
            Some(mode.as_android()),
        )?;
        Ok(Box::new(JavaOutputStream::new(&self.context, stream)))
    }

    fn delete(&self, uri: &ContentUri) -> Result<usize, StorageError> {
        let deleted = self.context.with_env(|env, context| {
            let resolver = content_resolver(env, context)?;
            let target = parse_uri(env, uri.as_str())?;
            env.call_method(
                &resolver,
                "delete",
                "(Landroid/net/Uri;Ljava/lang/String;[Ljava/lang/String;)I",
                &[
                    JValue::Object(&target),
                    JValue::Object(&JObject::null()),
                    JValue::Object(&JObject::null()),
                ],
            )?
            .i()
        })?;
        Ok(usize::try_from(deleted).unwrap_or_default())
    }

    fn mime_type(&self, uri: &ContentUri) -> Option<String> {
        self.context
            .with_env(|env, context| {
                let resolver = content_resolver(env, context)?;
                let target = parse_uri(env, uri.as_str())?;
                let mime_type = env
                    .call_method(
                        &resolver,
                        "getType",
                        "(Landroid/net/Uri;)Ljava/lang/String;",
                        &[JValue::Object(&target)],
                    )?
                    .l()?;
                optional_string(env, mime_type)
            })
            .unwrap_or_else(|e| {
                log::debug!("No MIME type for {uri}: {e}");
                None
            })
    }
}

fn string_array<'local>(
    env: &mut JNIEnv<'local>,
    values: &[String],
) -> jni::errors::Result<JObject<'local>> {
    let array = env.new_object_array(values.len() as i32, "java/lang/String", JObject::null())?;
    for (index, value) in values.iter().enumerate() {
        let value = env.new_string(value)?;
        env.set_object_array_element(&array, index as i32, &value)?;
    }
    Ok(JObject::from(array))
}

/// Run `read` over `cursor` and close it on every path, including a Java
/// exception thrown by `read`. A null cursor reads as empty.
fn with_cursor<'local, T: Default>(
    env: &mut JNIEnv<'local>,
    cursor: JObject<'local>,
    read: fn(&mut JNIEnv, &JObject) -> jni::errors::Result<T>,
) -> jni::errors::Result<T> {
    if cursor.is_null() {
        log::warn!("Content resolver returned no cursor");
        return Ok(T::default());
    }
    let result = read(env, &cursor);

    // close() must not run with an exception pending
    let pending = if env.exception_check()? {
        let throwable = env.exception_occurred()?;
        env.exception_clear()?;
        Some(throwable)
    } else {
        None
    };
    if let Err(e) = env.call_method(&cursor, "close", "()V", &[]) {
        log::warn!("Failed to close cursor: {e}");
        env.exception_clear()?;
    }
    if let Some(throwable) = pending {
        env.throw(throwable)?;
    }
    result
}

struct ColumnIndexes {
    id: i32,
    display_name: i32,
    mime_type: i32,
    relative_path: i32,
    data: i32,
}

impl ColumnIndexes {
    fn of(env: &mut JNIEnv, cursor: &JObject) -> jni::errors::Result<Self> {
        Ok(Self {
            id: column_index(env, cursor, columns::ID)?,
            display_name: column_index(env, cursor, columns::DISPLAY_NAME)?,
            mime_type: column_index(env, cursor, columns::MIME_TYPE)?,
            relative_path: column_index(env, cursor, columns::RELATIVE_PATH)?,
            data: column_index(env, cursor, columns::DATA)?,
        })
    }

    fn read(&self, env: &mut JNIEnv, cursor: &JObject) -> jni::errors::Result<Row> {
        let id = if self.id >= 0 {
            env.call_method(cursor, "getLong", "(I)J", &[JValue::Int(self.id)])?
                .j()?
        } else {
            0
        };
        Ok(Row {
            id,
            display_name: string_column(env, cursor, self.display_name)?,
            mime_type: string_column(env, cursor, self.mime_type)?,
            relative_path: string_column(env, cursor, self.relative_path)?,
            data: string_column(env, cursor, self.data)?,
        })
    }
}

/// -1 when the cursor has no such column
fn column_index(env: &mut JNIEnv, cursor: &JObject, name: &str) -> jni::errors::Result<i32> {
    let name = env.new_string(name)?;
    env.call_method(
        cursor,
        "getColumnIndex",
        "(Ljava/lang/String;)I",
        &[JValue::Object(&name)],
    )?
    .i()
}

fn string_column(
    env: &mut JNIEnv,
    cursor: &JObject,
    index: i32,
) -> jni::errors::Result<Option<String>> {
    if index < 0 {
        return Ok(None);
    }
    let value = env
        .call_method(cursor, "getString", "(I)Ljava/lang/String;", &[JValue::Int(index)])?
        .l()?;
    optional_string(env, value)
}

fn read_rows(env: &mut JNIEnv, cursor: &JObject) -> jni::errors::Result<Vec<Row>> {
    let columns = ColumnIndexes::of(env, cursor)?;
    let mut rows = Vec::new();
    while env.call_method(cursor, "moveToNext", "()Z", &[])?.z()? {
        rows.push(columns.read(env, cursor)?);
    }
    Ok(rows)
}

fn read_first_row(env: &mut JNIEnv, cursor: &JObject) -> jni::errors::Result<Option<Row>> {
    let columns = ColumnIndexes::of(env, cursor)?;
    if env.call_method(cursor, "moveToFirst", "()Z", &[])?.z()? {
        Ok(Some(columns.read(env, cursor)?))
    } else {
        Ok(None)
    }
}
