use std::io::{Read, Write};

use log::{debug, warn};

use crate::codec::LegacyCodec;
use crate::core_api::{CoreError, CoreErrorCode};
use crate::reader::SlotReader;
use crate::slot::{LengthPolicy, SLOT_LEN, SLOT_PAYLOAD_LEN, Slot, pack_slot};

/// Offset of the first entry: the header occupies exactly one slot.
pub const FIRST_ENTRY_OFFSET: usize = SLOT_LEN;
/// Bytes per entry on disk: word slot then key slot.
pub const ENTRY_LEN: usize = SLOT_LEN * 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub word: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub count_text: String,
    /// Leading digits of `count_text`; 0 when there are none.
    pub expected_count: u64,
}

/// Read the header slot. Any failure here means the archive is unusable.
pub fn read_header<R: Read>(
    reader: &mut SlotReader<R>,
    codec: &LegacyCodec,
) -> Result<ArchiveHeader, CoreError> {
    let slot = reader
        .read_slot()
        .map_err(|e| e.context("archive header"))?
        .ok_or_else(|| CoreError::truncated("archive header: input is empty"))?;

    // The marker is not trusted; the count runs up to the first NUL.
    let text = codec
        .decode(&slot.payload)
        .map_err(|e| e.context("archive header"))?;
    let count_text = text.split('\0').next().unwrap_or_default().trim().to_string();
    let digits = count_text
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    let expected_count = count_text[..digits].parse::<u64>().unwrap_or(0);
    if digits == 0 || digits < count_text.len() {
        warn!("header count {count_text:?} is not a plain number, reading it as {expected_count}");
    }
    debug!(
        "header marker {:#04x}, declared count {expected_count}",
        slot.declared_len
    );

    Ok(ArchiveHeader {
        count_text,
        expected_count,
    })
}

/// Streams entries after the header. Ends at end of input, at a zero length
/// byte, or at a short payload. Yields at most one error, then stops.
pub struct EntryReader<'a, R> {
    reader: &'a mut SlotReader<R>,
    codec: LegacyCodec,
    policy: LengthPolicy,
    done: bool,
}

impl<'a, R: Read> EntryReader<'a, R> {
    pub fn new(reader: &'a mut SlotReader<R>, codec: LegacyCodec, policy: LengthPolicy) -> Self {
        Self {
            reader,
            codec,
            policy,
            done: false,
        }
    }

    fn next_field(&mut self, field: &str) -> Result<Option<String>, CoreError> {
        let start = self.reader.position();
        let declared_len = match self.reader.read_u8()? {
            None => return Ok(None),
            Some(0) => {
                debug!("zero {field} length at offset {start}, end of archive");
                return Ok(None);
            }
            Some(len) => len,
        };

        let payload = match self.reader.read_payload(start) {
            Ok(payload) => payload,
            Err(e) if e.code == CoreErrorCode::TruncatedRecord => {
                warn!("{}; treating as end of archive", e.message);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let slot = Slot {
            declared_len,
            payload,
        };
        let mut bytes = slot
            .significant(self.policy)
            .map_err(|e| e.context(format!("{field} at offset {start}")))?;
        if usize::from(declared_len) > SLOT_PAYLOAD_LEN {
            // Clamped: the text runs up to the first NUL, as in the header.
            bytes = bytes.split(|&b| b == 0).next().unwrap_or_default();
        }
        self.codec
            .decode(bytes)
            .map(Some)
            .map_err(|e| e.context(format!("{field} at offset {start}")))
    }

    fn read_entry(&mut self) -> Result<Option<Entry>, CoreError> {
        let Some(word) = self.next_field("word")? else {
            return Ok(None);
        };
        let Some(key) = self.next_field("key")? else {
            warn!("word {word:?} has no key, dropping it");
            return Ok(None);
        };
        Ok(Some(Entry { word, key }))
    }
}

impl<R: Read> Iterator for EntryReader<'_, R> {
    type Item = Result<Entry, CoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Writes the header and entries of an archive.
pub struct ArchiveWriter<W> {
    inner: W,
    codec: LegacyCodec,
    truncated: usize,
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(inner: W, codec: LegacyCodec) -> Self {
        Self {
            inner,
            codec,
            truncated: 0,
        }
    }

    /// Number of fields cut down to the payload size so far.
    pub fn truncated(&self) -> usize {
        self.truncated
    }

    pub fn write_header(&mut self, count: usize) -> Result<(), CoreError> {
        let count_text = count.to_string();
        let encoded = self.codec.encode(&count_text)?;
        let mut slot = Slot::new(&encoded);
        slot.declared_len = count_text.len() as u8;
        self.inner.write_all(&slot.to_bytes())?;
        Ok(())
    }

    pub fn write_entry(&mut self, word: &str, key: &str) -> Result<(), CoreError> {
        self.write_field(word)?;
        self.write_field(key)
    }

    fn write_field(&mut self, text: &str) -> Result<(), CoreError> {
        let encoded = self.codec.encode(text)?;
        if encoded.len() > SLOT_PAYLOAD_LEN {
            warn!(
                "{text:?} encodes to {} bytes, keeping the first {SLOT_PAYLOAD_LEN}",
                encoded.len()
            );
            self.truncated += 1;
        }
        self.inner.write_all(&pack_slot(&encoded))?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W, CoreError> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{ArchiveWriter, ENTRY_LEN, EntryReader, FIRST_ENTRY_OFFSET, read_header};
    use crate::codec::LegacyCodec;
    use crate::core_api::CoreErrorCode;
    use crate::reader::SlotReader;
    use crate::slot::{LengthPolicy, pack_slot};

    fn archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut w = ArchiveWriter::new(Vec::new(), LegacyCodec::new());
        w.write_header(entries.len()).expect("header");
        for (word, key) in entries {
            w.write_entry(word, key).expect("entry");
        }
        w.finish().expect("finish")
    }

    #[test]
    fn header_is_one_slot_with_decimal_count() {
        let bytes = archive(&[("A", "K"), ("B", "K"), ("C", "K"), ("D", "K")]);
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[1], b'4');
        assert_eq!(bytes.len(), FIRST_ENTRY_OFFSET + 4 * ENTRY_LEN);

        let mut r = SlotReader::new(Cursor::new(bytes));
        let header = read_header(&mut r, &LegacyCodec::new()).expect("header");
        assert_eq!(header.expected_count, 4);
        assert_eq!(r.position(), FIRST_ENTRY_OFFSET as u64);
    }

    fn header_and_entries(header: &[u8], entries: usize) -> (u64, usize) {
        let mut bytes = pack_slot(header).to_vec();
        for _ in 0..entries {
            bytes.extend_from_slice(&pack_slot(b"W"));
            bytes.extend_from_slice(&pack_slot(b"K"));
        }
        let mut r = SlotReader::new(Cursor::new(bytes));
        let header = read_header(&mut r, &LegacyCodec::new()).expect("header");
        let actual = EntryReader::new(&mut r, LegacyCodec::new(), LengthPolicy::Clamp).count();
        (header.expected_count, actual)
    }

    #[test]
    fn unparsable_header_count_reads_as_zero() {
        let mut bytes = pack_slot(b"abc").to_vec();
        bytes.extend_from_slice(&pack_slot(b"W"));
        let mut r = SlotReader::new(Cursor::new(bytes));
        let header = read_header(&mut r, &LegacyCodec::new()).expect("header");
        assert_eq!(header.expected_count, 0);
        assert_eq!(header.count_text, "abc");
    }

    #[test]
    fn header_count_uses_leading_digits() {
        assert_eq!(header_and_entries(b"3x", 3), (3, 3));
        assert_eq!(header_and_entries(b" 12 ", 0).0, 12);
        assert_eq!(header_and_entries(b"-4", 0).0, 0);
    }

    #[test]
    fn unparsable_header_over_empty_archive_counts_zero() {
        assert_eq!(header_and_entries(b"none", 0), (0, 0));
    }

    #[test]
    fn short_header_is_fatal() {
        let mut r = SlotReader::new(Cursor::new(vec![2u8, b'1', b'0']));
        let err = read_header(&mut r, &LegacyCodec::new()).expect_err("should fail");
        assert_eq!(err.code, CoreErrorCode::TruncatedRecord);
    }

    #[test]
    fn dangling_word_is_dropped() {
        let mut bytes = archive(&[("WORD", "KEY")]);
        bytes.extend_from_slice(&pack_slot(b"LONELY"));
        let mut r = SlotReader::new(Cursor::new(bytes));
        read_header(&mut r, &LegacyCodec::new()).expect("header");
        let entries: Vec<_> = EntryReader::new(&mut r, LegacyCodec::new(), LengthPolicy::Clamp)
            .collect::<Result<_, _>>()
            .expect("entries");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].word, "WORD");
        assert_eq!(entries[0].key, "KEY");
    }

    #[test]
    fn strict_policy_reports_oversized_length() {
        let mut bytes = archive(&[]);
        let mut word = pack_slot(b"WORD");
        word[0] = 33;
        bytes.extend_from_slice(&word);
        bytes.extend_from_slice(&pack_slot(b"KEY"));

        let mut r = SlotReader::new(Cursor::new(bytes.clone()));
        read_header(&mut r, &LegacyCodec::new()).expect("header");
        let mut strict = EntryReader::new(&mut r, LegacyCodec::new(), LengthPolicy::Reject);
        let err = strict.next().expect("item").expect_err("should reject");
        assert_eq!(err.code, CoreErrorCode::InvalidLength);
        assert!(strict.next().is_none());

        let mut r = SlotReader::new(Cursor::new(bytes));
        read_header(&mut r, &LegacyCodec::new()).expect("header");
        let entry = EntryReader::new(&mut r, LegacyCodec::new(), LengthPolicy::Clamp)
            .next()
            .expect("item")
            .expect("clamped");
        assert_eq!(entry.word, "WORD");
        assert_eq!(entry.key, "KEY");
    }
}
