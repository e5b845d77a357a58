use std::io::{self, Write};

/// How a single text line is treated when packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    Header(&'a str),
    Word(&'a str),
    Blank,
    /// Starts with `[` but is not a complete `[key]` header.
    Malformed(&'a str),
}

impl<'a> Line<'a> {
    /// Classify one line. A trailing `\r` is ignored so CRLF input works.
    pub fn classify(raw: &'a str) -> Self {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.is_empty() {
            return Self::Blank;
        }
        if let Some(rest) = line.strip_prefix('[') {
            return match rest.strip_suffix(']') {
                Some(key) => Self::Header(key),
                None => Self::Malformed(line),
            };
        }
        Self::Word(line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub key: String,
    pub words: Vec<String>,
}

/// A dictionary as text: sections of words sharing a key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub sections: Vec<Section>,
}

impl Document {
    /// Build sections from text. Words before any header belong to the empty
    /// key; repeated consecutive headers with the same key are merged.
    pub fn parse(text: &str) -> Self {
        let mut doc = Self::default();
        let mut current_key = String::new();
        for raw in text.lines() {
            match Line::classify(raw) {
                Line::Header(key) => {
                    current_key = key.to_string();
                    doc.open_section(&current_key);
                }
                Line::Word(word) => {
                    doc.open_section(&current_key);
                    if let Some(section) = doc.sections.last_mut() {
                        section.words.push(word.to_string());
                    }
                }
                Line::Blank | Line::Malformed(_) => {}
            }
        }
        doc
    }

    pub fn entry_count(&self) -> usize {
        self.sections.iter().map(|s| s.words.len()).sum()
    }

    /// Render the way unpack writes it: one `[key]` line per key change.
    pub fn render(&self) -> io::Result<String> {
        let mut writer = DocumentWriter::new(Vec::new());
        for section in &self.sections {
            for word in &section.words {
                writer.write_entry(word, &section.key)?;
            }
        }
        String::from_utf8(writer.into_inner())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn open_section(&mut self, key: &str) {
        if self.sections.last().is_some_and(|s| s.key == key) {
            return;
        }
        self.sections.push(Section {
            key: key.to_string(),
            words: Vec::new(),
        });
    }
}

/// Streaming text emitter. Writes a `[key]` line only when the key differs
/// from the previous entry's key; the previous key starts out empty.
pub struct DocumentWriter<W> {
    inner: W,
    last_key: String,
    sections: usize,
}

impl<W: Write> DocumentWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            last_key: String::new(),
            sections: 0,
        }
    }

    /// Number of `[key]` lines written so far.
    pub fn sections(&self) -> usize {
        self.sections
    }

    pub fn write_entry(&mut self, word: &str, key: &str) -> io::Result<()> {
        if key != self.last_key {
            writeln!(self.inner, "[{key}]")?;
            self.last_key.clear();
            self.last_key.push_str(key);
            self.sections += 1;
        }
        writeln!(self.inner, "{word}")
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
