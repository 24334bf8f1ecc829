//! `java.io` streams seen as `std::io` readers and writers. Each stream
//! is closed when dropped.

use crate::context::AndroidContext;
use jni::objects::{GlobalRef, JValue};
use shared_storage_engine::StorageError;
use std::io::{self, Read, Write};

const TRANSFER_SIZE: usize = 8192;

fn io_error(e: StorageError) -> io::Error {
    match e {
        StorageError::Interrupted(inner) => inner,
        other => io::Error::other(other),
    }
}

fn close(context: &AndroidContext, stream: &GlobalRef) {
    if let Err(e) = context.with_env(|env, _| {
        env.call_method(stream, "close", "()V", &[])?;
        Ok(())
    }) {
        log::warn!("Failed to close stream: {e}");
    }
}

pub struct JavaInputStream<'a> {
    context: &'a AndroidContext,
    stream: GlobalRef,
}

impl<'a> JavaInputStream<'a> {
    pub fn new(context: &'a AndroidContext, stream: GlobalRef) -> Self {
        Self { context, stream }
    }
}

impl Read for JavaInputStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let wanted = buf.len().min(TRANSFER_SIZE) as i32;
        let stream = &self.stream;
        let chunk = self
            .context
            .with_env(|env, _| {
                let array = env.new_byte_array(wanted)?;
                let read = env
                    .call_method(
                        stream,
                        "read",
                        "([BII)I",
                        &[JValue::Object(&array), JValue::Int(0), JValue::Int(wanted)],
                    )?
                    .i()?;
                // -1 at end of stream
                if read <= 0 {
                    return Ok(Vec::new());
                }
                let mut bytes = env.convert_byte_array(&array)?;
                bytes.truncate(read as usize);
                Ok(bytes)
            })
            .map_err(io_error)?;
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }
}

impl Drop for JavaInputStream<'_> {
    fn drop(&mut self) {
        close(self.context, &self.stream);
    }
}

pub struct JavaOutputStream<'a> {
    context: &'a AndroidContext,
    stream: GlobalRef,
}

impl<'a> JavaOutputStream<'a> {
    pub fn new(context: &'a AndroidContext, stream: GlobalRef) -> Self {
        Self { context, stream }
    }
}

impl Write for JavaOutputStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let len = buf.len().min(TRANSFER_SIZE);
        let stream = &self.stream;
        self.context
            .with_env(|env, _| {
                let array = env.byte_array_from_slice(&buf[..len])?;
                env.call_method(
                    stream,
                    "write",
                    "([BII)V",
                    &[JValue::Object(&array), JValue::Int(0), JValue::Int(len as i32)],
                )?;
                Ok(len)
            })
            .map_err(io_error)
    }

    fn flush(&mut self) -> io::Result<()> {
        let stream = &self.stream;
        self.context
            .with_env(|env, _| {
                env.call_method(stream, "flush", "()V", &[])?;
                Ok(())
            })
            .map_err(io_error)
    }
}

impl Drop for JavaOutputStream<'_> {
    fn drop(&mut self) {
        close(self.context, &self.stream);
    }
}
