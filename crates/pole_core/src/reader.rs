use std::io::{self, Read};

use crate::core_api::CoreError;
use crate::slot::{SLOT_PAYLOAD_LEN, Slot};

/// Sequential reader over length-prefixed slots. Tracks the byte offset so
/// truncation can be reported with a position.
pub struct SlotReader<R> {
    inner: R,
    position: u64,
}

impl<R: Read> SlotReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read one byte, or `None` at end of input.
    pub fn read_u8(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.fill(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }

    /// Read a length byte and its payload. `Ok(None)` means the input ended
    /// cleanly before the length byte; a short payload is `TruncatedRecord`.
    pub fn read_slot(&mut self) -> Result<Option<Slot>, CoreError> {
        let start = self.position;
        let Some(declared_len) = self.read_u8()? else {
            return Ok(None);
        };
        let payload = self.read_payload(start)?;
        Ok(Some(Slot {
            declared_len,
            payload,
        }))
    }

    /// Read the fixed payload that follows a length byte read at `start`.
    pub fn read_payload(&mut self, start: u64) -> Result<[u8; SLOT_PAYLOAD_LEN], CoreError> {
        let mut payload = [0u8; SLOT_PAYLOAD_LEN];
        let got = self.fill(&mut payload)?;
        if got < SLOT_PAYLOAD_LEN {
            return Err(CoreError::truncated(format!(
                "slot at offset {start} has {got} of {SLOT_PAYLOAD_LEN} payload bytes"
            )));
        }
        Ok(payload)
    }

    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        self.position += filled as u64;
        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::SlotReader;
    use crate::core_api::CoreErrorCode;
    use crate::slot::pack_slot;

    #[test]
    fn reads_consecutive_slots_then_ends() {
        let mut bytes = pack_slot(b"ONE").to_vec();
        bytes.extend_from_slice(&pack_slot(b"TWO"));
        let mut r = SlotReader::new(Cursor::new(bytes));

        let first = r.read_slot().expect("first").expect("some");
        assert_eq!(&first.payload[..3], b"ONE");
        let second = r.read_slot().expect("second").expect("some");
        assert_eq!(second.declared_len, 3);
        assert_eq!(r.position(), 42);
        assert!(r.read_slot().expect("end").is_none());
    }

    #[test]
    fn short_payload_is_truncated_record() {
        let mut bytes = pack_slot(b"ONE").to_vec();
        bytes.truncate(12);
        let mut r = SlotReader::new(Cursor::new(bytes));
        let err = r.read_slot().expect_err("should be truncated");
        assert_eq!(err.code, CoreErrorCode::TruncatedRecord);
    }
}
