//! Result formatting for matched catalogue records
//!
//! Every match renders as a fixed six-line block; the front-end displays the
//! concatenated blocks verbatim, so labels and spacing are part of the wire
//! format.

use crate::record::{FieldExtractor, columns, decode_artist};
use crate::server::protocol::Response;
use crate::utils::parse_leading_i64;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Placeholder for a column the record does not have
pub const NOT_AVAILABLE: &str = "N/A";

/// Line closing every block
pub const BLOCK_SEPARATOR: &str = "--------------------------------------------------";

pub const LABEL_ALBUM: &str = "Álbum";
pub const LABEL_ARTIST: &str = "Artista";
pub const LABEL_SONG: &str = "Canción";
pub const LABEL_DURATION: &str = "Duración";
pub const LABEL_POPULARITY: &str = "Popularidad";

const LABELS: [&str; 5] = [
    LABEL_ALBUM,
    LABEL_ARTIST,
    LABEL_SONG,
    LABEL_DURATION,
    LABEL_POPULARITY,
];

/// Render a millisecond count as `M min S seg`
pub fn format_duration(ms: i64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    format!("{} min {} seg", minutes, seconds)
}

/// Renders raw records into display blocks
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFormatter {
    extractor: FieldExtractor,
}

impl RecordFormatter {
    pub fn new(extractor: FieldExtractor) -> Self {
        Self { extractor }
    }

    /// Format one record. Missing columns render as `N/A`.
    pub fn format(&self, record: &str) -> String {
        let field = |column| self.extractor.field(record, column);

        let album = field(columns::ALBUM);
        let artist = field(columns::ARTIST).map(|raw| decode_artist(&raw));
        let song = field(columns::SONG);
        let duration = field(columns::DURATION_MS).map(|ms| format_duration(parse_leading_i64(&ms)));
        let popularity = field(columns::POPULARITY);

        let or_na = |value: &Option<String>| value.as_deref().unwrap_or(NOT_AVAILABLE).to_string();

        format!(
            "{LABEL_ALBUM}: {}\n{LABEL_ARTIST}: {}\n{LABEL_SONG}: {}\n{LABEL_DURATION}: {}\n{LABEL_POPULARITY}: {}\n{BLOCK_SEPARATOR}\n",
            or_na(&album),
            or_na(&artist),
            or_na(&song),
            or_na(&duration),
            or_na(&popularity),
        )
    }
}

/// Format a record with the default field cap
pub fn format_record(record: &str) -> String {
    RecordFormatter::default().format(record)
}

/// Fixed-capacity accumulator for the response payload.
///
/// Blocks are appended whole while they fit. The first block that does not
/// fit is cut at the capacity (on a character boundary) and every later block
/// is dropped; both events are recorded so the caller can report them.
#[derive(Debug, Clone)]
pub struct ResultBuffer {
    text: String,
    capacity: usize,
    blocks: usize,
    truncated: bool,
    dropped_blocks: usize,
}

impl ResultBuffer {
    /// `capacity` is the payload size in bytes, not counting the terminator
    pub fn new(capacity: usize) -> Self {
        Self {
            text: String::new(),
            capacity,
            blocks: 0,
            truncated: false,
            dropped_blocks: 0,
        }
    }

    /// Append a block; returns `false` if any of it was cut or dropped.
    pub fn push_block(&mut self, block: &str) -> bool {
        if self.truncated {
            self.dropped_blocks += 1;
            return false;
        }

        let remaining = self.capacity - self.text.len();
        if block.len() <= remaining {
            self.text.push_str(block);
            self.blocks += 1;
            return true;
        }

        let mut cut = remaining;
        while !block.is_char_boundary(cut) {
            cut -= 1;
        }
        self.text.push_str(&block[..cut]);
        self.truncated = true;
        false
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Blocks stored in full
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Blocks discarded after the buffer filled up
    pub fn dropped_blocks(&self) -> usize {
        self.dropped_blocks
    }
}

/// Print a response to stdout, highlighting the field labels
pub fn print_response(response: &Response, color: bool) -> io::Result<()> {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(choice);

    let text = match response {
        Response::NotFound => {
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
            writeln!(stdout, "No matches found")?;
            stdout.reset()?;
            return Ok(());
        }
        Response::Matches(text) => text,
    };

    for line in text.lines() {
        if line == BLOCK_SEPARATOR {
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            writeln!(stdout, "{}", line)?;
            stdout.reset()?;
            continue;
        }

        match line.split_once(": ") {
            Some((label, value)) if LABELS.contains(&label) => {
                stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
                write!(stdout, "{}:", label)?;
                stdout.reset()?;
                writeln!(stdout, " {}", value)?;
            }
            _ => writeln!(stdout, "{}", line)?,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = "Abbey Road,x,y,\"[{'artist_name': 'The Beatles'}]\",z,185000,w,Something,v,77\n";

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(185_000), "3 min 5 seg");
        assert_eq!(format_duration(0), "0 min 0 seg");
        assert_eq!(format_duration(59_999), "0 min 59 seg");
        assert_eq!(format_duration(3_600_000), "60 min 0 seg");
    }

    #[test]
    fn test_format_record_block() {
        assert_eq!(
            format_record(RECORD),
            "Álbum: Abbey Road\n\
             Artista: The Beatles\n\
             Canción: Something\n\
             Duración: 3 min 5 seg\n\
             Popularidad: 77\n\
             --------------------------------------------------\n"
        );
    }

    #[test]
    fn test_missing_columns_render_na() {
        let block = format_record("Only Album,x,y,Plain Artist\n");
        assert!(block.contains("Álbum: Only Album\n"));
        assert!(block.contains("Artista: Plain Artist\n"));
        assert!(block.contains("Canción: N/A\n"));
        assert!(block.contains("Duración: N/A\n"));
        assert!(block.contains("Popularidad: N/A\n"));
    }

    #[test]
    fn test_non_numeric_duration_reads_as_zero() {
        let block = format_record("a,b,c,d,e,unknown,g,h,i,j");
        assert!(block.contains("Duración: 0 min 0 seg\n"));
    }

    #[test]
    fn test_result_buffer_whole_blocks() {
        let mut buf = ResultBuffer::new(10);
        assert!(buf.push_block("abcd"));
        assert!(buf.push_block("efgh"));
        assert_eq!(buf.blocks(), 2);
        assert!(!buf.truncated());
        assert_eq!(buf.as_str(), "abcdefgh");
    }

    #[test]
    fn test_result_buffer_truncates_and_drops() {
        let mut buf = ResultBuffer::new(10);
        assert!(buf.push_block("abcdef"));
        assert!(!buf.push_block("ghijkl"));
        assert!(!buf.push_block("mnop"));
        assert_eq!(buf.as_str(), "abcdefghij");
        assert_eq!(buf.blocks(), 1);
        assert!(buf.truncated());
        assert_eq!(buf.dropped_blocks(), 1);
    }

    #[test]
    fn test_result_buffer_cut_on_char_boundary() {
        let mut buf = ResultBuffer::new(2);
        assert!(!buf.push_block("Á!"));
        // "Á" is two bytes and fits; "!" does not
        assert_eq!(buf.as_str(), "Á");

        let mut buf = ResultBuffer::new(1);
        buf.push_block("Á");
        assert_eq!(buf.as_str(), "");
        assert!(buf.truncated());
    }
}
