//! Lockstep consumption of parallel archive streams.

use ctcsmooth_ark::{ArkResult, Matrix};
use tracing::debug;

use crate::average::average_frames;
use crate::config::MAX_STREAMS;
use crate::error::SmoothResult;

/// Pulls exactly one record from every stream per step and averages them.
///
/// Streams are pulled in order; iteration stops at the first exhausted
/// stream, and records already pulled in that step are dropped. The
/// output key is the first stream's key. Keys are not compared; a
/// disagreement is only logged.
///
/// With zero or more than [`MAX_STREAMS`] streams nothing is yielded.
/// After an error the iterator is fused.
pub struct Lockstep<I> {
    streams: Vec<I>,
    done: bool,
}

impl<I> Lockstep<I>
where
    I: Iterator<Item = ArkResult<(String, Matrix)>>,
{
    pub fn new(streams: Vec<I>) -> Self {
        let done = !(1..=MAX_STREAMS).contains(&streams.len());
        if done {
            debug!(streams = streams.len(), "unsupported stream count, no output");
        }
        Self { streams, done }
    }

    /// Number of streams being merged.
    pub fn width(&self) -> usize {
        self.streams.len()
    }

    fn step(&mut self) -> Option<SmoothResult<(String, Matrix)>> {
        let mut key = None;
        let mut mats = Vec::with_capacity(self.streams.len());

        for (i, stream) in self.streams.iter_mut().enumerate() {
            let (k, m) = match stream.next()? {
                Ok(rec) => rec,
                Err(e) => return Some(Err(e.into())),
            };
            match &key {
                None => key = Some(k),
                Some(first) if *first != k => {
                    debug!(stream = i, first = %first, got = %k, "key differs from first stream");
                }
                Some(_) => {}
            }
            mats.push(m);
        }

        let key = key?;
        Some(average_frames(&key, mats).map(|m| (key, m)))
    }
}

impl<I> Iterator for Lockstep<I>
where
    I: Iterator<Item = ArkResult<(String, Matrix)>>,
{
    type Item = SmoothResult<(String, Matrix)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.step();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}
