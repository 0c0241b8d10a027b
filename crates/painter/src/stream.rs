//! Seekable byte sources for image and font containers.

/// Origin for [`Stream::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSeek {
    Start(u32),
    Current(i32),
    End(i32),
}

/// Random-access byte source.
///
/// Seeking never fails; positions outside the stream are clamped to
/// `[0, len]`, after which reads report end of stream.
pub trait Stream {
    /// Next byte, or `None` at end of stream.
    fn get(&mut self) -> Option<u8>;
    fn seek(&mut self, pos: StreamSeek);
    fn tell(&self) -> u32;
    fn is_eof(&self) -> bool;

    /// Read up to `buf.len()` bytes, returning how many were read.
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut count = 0;
        for slot in buf.iter_mut() {
            match self.get() {
                Some(b) => *slot = b,
                None => break,
            }
            count += 1;
        }
        count
    }

    fn set_pos(&mut self, pos: u32) {
        self.seek(StreamSeek::Start(pos));
    }

    /// Skip `count` bytes forward.
    fn skip(&mut self, count: u32) {
        self.seek(StreamSeek::Current(count.min(i32::MAX as u32) as i32));
    }
}

impl<S: Stream + ?Sized> Stream for &mut S {
    fn get(&mut self) -> Option<u8> {
        (**self).get()
    }

    fn seek(&mut self, pos: StreamSeek) {
        (**self).seek(pos);
    }

    fn tell(&self) -> u32 {
        (**self).tell()
    }

    fn is_eof(&self) -> bool {
        (**self).is_eof()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        (**self).read(buf)
    }
}

/// Stream over a borrowed byte slice (flash or RAM).
#[derive(Debug, Clone)]
pub struct MemoryStream<'a> {
    data: &'a [u8],
    position: u32,
}

impl<'a> MemoryStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn len(&self) -> u32 {
        self.data.len().min(u32::MAX as usize) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Stream for MemoryStream<'_> {
    fn get(&mut self) -> Option<u8> {
        let b = *self.data.get(self.position as usize)?;
        self.position += 1;
        Some(b)
    }

    fn seek(&mut self, pos: StreamSeek) {
        let len = i64::from(self.len());
        let target = match pos {
            StreamSeek::Start(off) => i64::from(off),
            StreamSeek::Current(off) => i64::from(self.position) + i64::from(off),
            StreamSeek::End(off) => len + i64::from(off),
        };
        self.position = target.clamp(0, len) as u32;
    }

    fn tell(&self) -> u32 {
        self.position
    }

    fn is_eof(&self) -> bool {
        self.position >= self.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let start = self.position as usize;
        let count = buf.len().min(self.data.len().saturating_sub(start));
        buf[..count].copy_from_slice(&self.data[start..start + count]);
        self.position += count as u32;
        count
    }
}

/// Window `[start, start + len)` of another stream.
///
/// Positions stay absolute. Reads stop at the window end even when the
/// inner stream has more bytes, so a decoder cannot run into the next block.
#[derive(Debug)]
pub struct BoundedStream<S> {
    inner: S,
    start: u32,
    end: u32,
}

impl<S: Stream> BoundedStream<S> {
    /// Wrap `inner`, positioned at `start`.
    pub fn new(mut inner: S, start: u32, len: u32) -> Self {
        inner.set_pos(start);
        Self {
            inner,
            start,
            end: start.saturating_add(len),
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Stream> Stream for BoundedStream<S> {
    fn get(&mut self) -> Option<u8> {
        if self.inner.tell() >= self.end {
            return None;
        }
        self.inner.get()
    }

    fn seek(&mut self, pos: StreamSeek) {
        let target = match pos {
            StreamSeek::Start(off) => i64::from(off),
            StreamSeek::Current(off) => i64::from(self.inner.tell()) + i64::from(off),
            StreamSeek::End(off) => i64::from(self.end) + i64::from(off),
        };
        let target = target.clamp(i64::from(self.start), i64::from(self.end));
        self.inner.set_pos(target as u32);
    }

    fn tell(&self) -> u32 {
        self.inner.tell()
    }

    fn is_eof(&self) -> bool {
        self.inner.tell() >= self.end || self.inner.is_eof()
    }
}

#[cfg(feature = "std")]
mod file {
    use super::{Stream, StreamSeek};
    use std::fs::File;
    use std::io::{BufReader, Read, Seek, SeekFrom};

    /// Stream over a host file, for tooling and tests.
    ///
    /// I/O errors are treated as end of stream.
    #[derive(Debug)]
    pub struct FileStream {
        reader: BufReader<File>,
        len: u32,
        position: u32,
    }

    impl FileStream {
        pub fn open(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
            let file = File::open(path)?;
            let len = u32::try_from(file.metadata()?.len()).unwrap_or(u32::MAX);
            Ok(Self {
                reader: BufReader::new(file),
                len,
                position: 0,
            })
        }

        pub fn len(&self) -> u32 {
            self.len
        }

        pub fn is_empty(&self) -> bool {
            self.len == 0
        }
    }

    impl Stream for FileStream {
        fn get(&mut self) -> Option<u8> {
            if self.position >= self.len {
                return None;
            }
            let mut b = [0u8; 1];
            self.reader.read_exact(&mut b).ok()?;
            self.position += 1;
            Some(b[0])
        }

        fn seek(&mut self, pos: StreamSeek) {
            let len = i64::from(self.len);
            let target = match pos {
                StreamSeek::Start(off) => i64::from(off),
                StreamSeek::Current(off) => i64::from(self.position) + i64::from(off),
                StreamSeek::End(off) => len + i64::from(off),
            };
            let target = target.clamp(0, len) as u32;
            if self.reader.seek(SeekFrom::Start(u64::from(target))).is_ok() {
                self.position = target;
            }
        }

        fn tell(&self) -> u32 {
            self.position
        }

        fn is_eof(&self) -> bool {
            self.position >= self.len
        }
    }
}

#[cfg(feature = "std")]
pub use file::FileStream;
