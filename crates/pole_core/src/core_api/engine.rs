use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, info, warn};

use crate::archive::{ArchiveWriter, EntryReader, read_header};
use crate::codec::LegacyCodec;
use crate::document::{DocumentWriter, Line};
use crate::reader::SlotReader;

use super::error::{CoreError, CoreErrorCode};
use super::types::{EngineOptions, MIN_PACK_ENTRIES, PackSummary, UnpackSummary};

/// Runs the unpack and pack pipelines. Holds no state between runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Engine {
    options: EngineOptions,
    codec: LegacyCodec,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            options,
            codec: LegacyCodec::new(),
        }
    }

    pub fn unpack_file(&self, in_path: &Path, out_path: &Path) -> Result<UnpackSummary, CoreError> {
        let input = File::open(in_path).map_err(|e| open_error(in_path, e))?;
        let output = File::create(out_path).map_err(|e| open_error(out_path, e))?;
        self.unpack(BufReader::new(input), BufWriter::new(output))
    }

    /// Decode an archive into a text document.
    ///
    /// Header failures abort the run. Entry-level decode failures and
    /// truncated trailing records end the entry loop; everything written up
    /// to that point is kept.
    pub fn unpack<R: Read, W: Write>(
        &self,
        input: R,
        output: W,
    ) -> Result<UnpackSummary, CoreError> {
        let mut reader = SlotReader::new(input);
        let header = read_header(&mut reader, &self.codec)?;

        let mut writer = DocumentWriter::new(output);
        let mut actual_count = 0usize;
        for item in EntryReader::new(&mut reader, self.codec, self.options.length_policy) {
            match item {
                Ok(entry) => {
                    writer.write_entry(&entry.word, &entry.key)?;
                    actual_count += 1;
                }
                Err(e) if e.code == CoreErrorCode::Encoding => {
                    warn!("{e}; stopping after {actual_count} entries");
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        writer.flush()?;

        let summary = UnpackSummary {
            expected_count: header.expected_count,
            actual_count,
            sections: writer.sections(),
        };
        if !summary.count_matches() {
            info!(
                "header declares {:?} entries, archive holds {}",
                header.count_text, actual_count
            );
        }
        Ok(summary)
    }

    /// Pack a text document file. The destination is only created once the
    /// document has passed validation.
    pub fn pack_file(&self, in_path: &Path, out_path: &Path) -> Result<PackSummary, CoreError> {
        let input = File::open(in_path).map_err(|e| open_error(in_path, e))?;
        let mut input = BufReader::new(input);
        let count = self.checked_count(&mut input)?;
        input.seek(SeekFrom::Start(0))?;

        let output = File::create(out_path).map_err(|e| open_error(out_path, e))?;
        self.write_archive(input, BufWriter::new(output), count)
    }

    /// Encode a text document into an archive. Nothing is written to
    /// `output` unless the document holds at least three word lines.
    pub fn pack<R: BufRead + Seek, W: Write>(
        &self,
        mut input: R,
        output: W,
    ) -> Result<PackSummary, CoreError> {
        let count = self.checked_count(&mut input)?;
        input.seek(SeekFrom::Start(0))?;
        self.write_archive(input, output, count)
    }

    /// First pack pass: count word lines and make sure every word and key
    /// can be encoded.
    pub fn count_entries<R: BufRead>(&self, input: R) -> Result<usize, CoreError> {
        let mut count = 0usize;
        let mut current_key = String::new();
        let mut key_checked = true;

        for (index, line) in input.lines().enumerate() {
            let line_no = index + 1;
            let line = line.map_err(|e| CoreError::from(e).context(format!("line {line_no}")))?;
            match Line::classify(&line) {
                Line::Header(key) => {
                    current_key = key.to_string();
                    key_checked = false;
                }
                Line::Word(word) => {
                    self.codec
                        .encode(word)
                        .map_err(|e| e.context(format!("line {line_no}")))?;
                    if !key_checked {
                        self.codec
                            .encode(&current_key)
                            .map_err(|e| e.context(format!("key for line {line_no}")))?;
                        key_checked = true;
                    }
                    count += 1;
                }
                Line::Malformed(text) => {
                    warn!("line {line_no}: {text:?} is not a [key] header, skipping");
                }
                Line::Blank => {}
            }
        }

        debug!("document holds {count} entries");
        Ok(count)
    }

    fn checked_count<R: BufRead>(&self, input: R) -> Result<usize, CoreError> {
        let count = self.count_entries(input)?;
        if count < MIN_PACK_ENTRIES {
            return Err(CoreError::new(
                CoreErrorCode::InsufficientEntries,
                format!("need at least {MIN_PACK_ENTRIES} key-value pairs, found {count}"),
            ));
        }
        Ok(count)
    }

    /// Second pack pass: header first, then a word slot and key slot per
    /// word line.
    fn write_archive<R: BufRead, W: Write>(
        &self,
        input: R,
        output: W,
        count: usize,
    ) -> Result<PackSummary, CoreError> {
        let mut writer = ArchiveWriter::new(output, self.codec);
        writer.write_header(count)?;

        let mut keys = 0usize;
        let mut entries = 0usize;
        let mut current_key = String::new();
        for (index, line) in input.lines().enumerate() {
            let line_no = index + 1;
            let line = line.map_err(|e| CoreError::from(e).context(format!("line {line_no}")))?;
            match Line::classify(&line) {
                Line::Header(key) => {
                    current_key = key.to_string();
                    keys += 1;
                }
                Line::Word(word) => {
                    writer
                        .write_entry(word, &current_key)
                        .map_err(|e| e.context(format!("line {line_no}")))?;
                    entries += 1;
                }
                Line::Malformed(_) | Line::Blank => {}
            }
        }

        if entries != count {
            warn!("header says {count} entries but {entries} were written");
        }
        let truncated = writer.truncated();
        writer.finish()?;

        Ok(PackSummary {
            keys,
            entries,
            truncated,
        })
    }
}

fn open_error(path: &Path, e: std::io::Error) -> CoreError {
    CoreError::from(e).context(path.display())
}
