//! Block segmentation of raw race dumps.
//!
//! A dump is a sequence of blocks delimited by `NNKBGN`/`NNKEND` (results) or
//! `NNBBGN`/`NNBEND` (parameters), where `NN` is the two-digit stadium code.
//! The close tag must carry the same code as the open tag, so several meets
//! concatenated into one file are still cut correctly.

use crate::error::{ProcessorError, Result};
use crate::models::{RawBlock, SectionKind};
use regex::Regex;
use tracing::debug;

/// Lazy iterator over the blocks of one decoded file.
///
/// Yields `Err(UnterminatedBlock)` once and then stops when an opening tag
/// has no matching close before end of input.
#[derive(Debug)]
pub struct BlockSegmenter<'a> {
    text: &'a str,
    section_kind: SectionKind,
    open_pattern: Regex,
    cursor: usize,
    finished: bool,
}

impl<'a> BlockSegmenter<'a> {
    pub fn new(text: &'a str, section_kind: SectionKind) -> Result<Self> {
        let open_pattern = Regex::new(&format!("([0-9]{{2}}){}", section_kind.open_tag()))?;
        Ok(Self {
            text,
            section_kind,
            open_pattern,
            cursor: 0,
            finished: false,
        })
    }
}

impl<'a> Iterator for BlockSegmenter<'a> {
    type Item = Result<RawBlock<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let remaining = &self.text[self.cursor..];
        let Some(captures) = self.open_pattern.captures(remaining) else {
            self.finished = true;
            return None;
        };

        let (Some(open), Some(code)) = (captures.get(0), captures.get(1)) else {
            self.finished = true;
            return None;
        };
        let stadium_code = parse_code(code.as_str());
        let open_offset = self.cursor + open.start();
        let body_start = self.cursor + open.end();

        let close_tag = format!("{}{}", code.as_str(), self.section_kind.close_tag());
        match self.text[body_start..].find(&close_tag) {
            Some(relative_end) => {
                let body_end = body_start + relative_end;
                self.cursor = body_end + close_tag.len();
                debug!(
                    "Segmented {}{} block at byte {} ({} bytes)",
                    code.as_str(),
                    self.section_kind.open_tag(),
                    open_offset,
                    relative_end
                );
                Some(Ok(RawBlock {
                    stadium_code,
                    section_kind: self.section_kind,
                    text: &self.text[body_start..body_end],
                    offset: open_offset,
                }))
            }
            None => {
                self.finished = true;
                Some(Err(ProcessorError::UnterminatedBlock {
                    stadium_code,
                    tag: self.section_kind.open_tag(),
                    offset: open_offset,
                }))
            }
        }
    }
}

/// Cut a whole file into blocks, rejecting it if any block is unterminated.
pub fn segment_all(text: &str, section_kind: SectionKind) -> Result<Vec<RawBlock<'_>>> {
    BlockSegmenter::new(text, section_kind)?.collect()
}

fn parse_code(digits: &str) -> u8 {
    digits
        .bytes()
        .fold(0u8, |code, digit| code * 10 + (digit - b'0'))
}
