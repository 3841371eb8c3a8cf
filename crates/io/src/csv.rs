// Feed bytes <-> row-sets

use std::fmt;

use crate::rowset::RowSet;

/// Text encoding a feed was decoded with.
///
/// UTF-8 is tried first. ISO-8859-1 is the single fallback; it is decoded
/// through the WHATWG windows-1252 table, which is what `iso-8859-1` means
/// to every browser and to most CSV exporters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utf8 => write!(f, "utf-8"),
            Self::Latin1 => write!(f, "iso-8859-1"),
        }
    }
}

#[derive(Debug)]
pub enum DecodeError {
    /// Input had no header row.
    Empty,
    /// Delimited-text parse failure (ragged row, bad quoting).
    Parse { line: Option<u64>, message: String },
    /// A value cannot be represented in the requested output encoding.
    Unencodable { encoding: TextEncoding, value: String },
    /// Writer failure while encoding.
    Write(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "feed is empty (no header row)"),
            Self::Parse { line: Some(line), message } => {
                write!(f, "malformed row at line {line}: {message}")
            }
            Self::Parse { line: None, message } => write!(f, "malformed feed: {message}"),
            Self::Unencodable { encoding, value } => {
                write!(f, "value '{value}' cannot be encoded as {encoding}")
            }
            Self::Write(msg) => write!(f, "write error: {msg}"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<::csv::Error> for DecodeError {
    fn from(e: ::csv::Error) -> Self {
        let line = e.position().map(|p| p.line());
        let message = match e.kind() {
            ::csv::ErrorKind::UnequalLengths { expected_len, len, .. } => {
                format!("expected {expected_len} fields, found {len}")
            }
            _ => e.to_string(),
        };
        Self::Parse { line, message }
    }
}

/// Decode raw bytes into text: UTF-8 first, ISO-8859-1 on failure.
pub fn decode_text(bytes: Vec<u8>) -> (String, TextEncoding) {
    match String::from_utf8(bytes) {
        Ok(s) => {
            let s = match s.strip_prefix('\u{feff}') {
                Some(rest) => rest.to_string(),
                None => s,
            };
            (s, TextEncoding::Utf8)
        }
        Err(e) => {
            let bytes = e.into_bytes();
            log::warn!("feed is not valid UTF-8, falling back to {}", TextEncoding::Latin1);
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            (decoded.into_owned(), TextEncoding::Latin1)
        }
    }
}

/// Decode feed bytes into a row-set.
///
/// `delimiter = None` sniffs the delimiter from the first lines.
pub fn decode(bytes: Vec<u8>, delimiter: Option<u8>) -> Result<RowSet, DecodeError> {
    let (text, encoding) = decode_text(bytes);
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&text));

    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(DecodeError::Empty);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }

    log::debug!(
        "decoded {} rows x {} columns ({encoding}, delimiter {:?})",
        rows.len(),
        headers.len(),
        delimiter as char,
    );

    Ok(RowSet { headers, rows, encoding })
}

/// Write a row-set back out as delimited text in the given encoding.
pub fn encode(rowset: &RowSet, delimiter: u8, encoding: TextEncoding) -> Result<Vec<u8>, DecodeError> {
    let mut writer = ::csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer
        .write_record(&rowset.headers)
        .map_err(|e| DecodeError::Write(e.to_string()))?;
    for row in &rowset.rows {
        writer
            .write_record(row)
            .map_err(|e| DecodeError::Write(e.to_string()))?;
    }

    let utf8 = writer
        .into_inner()
        .map_err(|e| DecodeError::Write(e.to_string()))?;

    match encoding {
        TextEncoding::Utf8 => Ok(utf8),
        TextEncoding::Latin1 => {
            let text = String::from_utf8(utf8).map_err(|e| DecodeError::Write(e.to_string()))?;
            let (bytes, _, had_errors) = encoding_rs::WINDOWS_1252.encode(&text);
            if had_errors {
                let value = text
                    .chars()
                    .find(|c| {
                        let mut buf = [0u8; 4];
                        encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut buf)).2
                    })
                    .map(|c| c.to_string())
                    .unwrap_or_default();
                return Err(DecodeError::Unencodable { encoding, value });
            }
            Ok(bytes.into_owned())
        }
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins. Comma on a tie.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b',', b'\t', b';', b'|'];
    let sample: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();
    if sample.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0usize;

    for &delim in candidates {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| count_fields(line, delim))
            .collect();
        let first = counts[0];
        if first < 2 {
            continue;
        }
        let consistent = counts.iter().filter(|&&c| c == first).count();
        // Consistency first, then field count.
        let score = consistent * 1000 + first;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Count fields on one line, ignoring delimiters inside double quotes.
fn count_fields(line: &str, delim: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 1;
    for b in line.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delim && !in_quotes {
            count += 1;
        }
    }
    count
}
