use rustc_hash::FxHashMap;

/// Column the instruction text starts in.
pub const SOURCE_COLUMN: usize = 32;
/// Column trailing comments start in.
pub const COMMENT_COLUMN: usize = 52;

const LEFT_MARGIN: usize = 2 + 1 + 4 + 1;

/// Listing text collected during code generation.
///
/// Each segment keeps a list of blocks keyed by the address they start at; `.ORG`
/// and segment switches open a new block. Blocks are emitted sorted by address so
/// the listing follows memory order rather than source order.
#[derive(Debug, Default)]
pub struct Listing {
    header: String,
    segments: FxHashMap<String, SegmentListing>,
}

#[derive(Debug, Default)]
struct SegmentListing {
    open: Option<(i64, String)>,
    closed: Vec<(i64, String)>,
}

impl SegmentListing {
    fn close(&mut self) {
        if let Some(block) = self.open.take() {
            self.closed.push(block);
        }
    }
}

impl Listing {
    /// Text placed before every segment block, such as segment declarations.
    pub fn write_header(&mut self, text: &str) {
        self.header.push_str(text);
    }

    pub fn start_block(&mut self, segment: &str, address: i64) {
        let listing = self.segments.entry(segment.to_string()).or_default();
        listing.close();
        listing.open = Some((address, String::new()));
    }

    fn block(&mut self, segment: &str, address: i64) -> &mut String {
        let listing = self.segments.entry(segment.to_string()).or_default();
        &mut listing.open.get_or_insert_with(|| (address, String::new())).1
    }

    pub fn write(&mut self, segment: &str, address: i64, text: &str) {
        self.block(segment, address).push_str(text);
    }

    pub fn row(&mut self, segment: &str, address: i64, bytes: &[u8], inst: &str, comment: Option<&str>) {
        let row = format_row(address, bytes, inst, comment);
        self.write(segment, address, &row);
    }

    pub fn right_comment(&mut self, segment: &str, address: i64, comment: &str) {
        let line = format!("{}{}\n", " ".repeat(COMMENT_COLUMN), comment);
        self.write(segment, address, &line);
    }

    pub fn left_line(&mut self, segment: &str, address: i64, text: &str) {
        let line = format!("{}{}\n", " ".repeat(LEFT_MARGIN), text);
        self.write(segment, address, &line);
    }

    /// Joins the header and every segment's blocks, segments in the given order.
    pub fn finish<'a>(mut self, segment_order: impl IntoIterator<Item = &'a str>) -> String {
        let mut out = std::mem::take(&mut self.header);
        for segment in segment_order {
            let Some(mut listing) = self.segments.remove(segment) else {
                continue;
            };
            listing.close();
            listing.closed.sort_by_key(|(address, _)| *address);
            for (_, text) in listing.closed {
                out.push_str(&text);
            }
        }
        out
    }
}

/// `BB:AAAA bytes    inst    comment`, with the instruction at [`SOURCE_COLUMN`] and
/// the comment at [`COMMENT_COLUMN`] unless the row is already wider.
pub fn format_row(address: i64, bytes: &[u8], inst: &str, comment: Option<&str>) -> String {
    let byte_string = bytes
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" ");
    let spacing = (SOURCE_COLUMN - 1 - 1 - 4 - 1 - 2).saturating_sub(byte_string.len());
    let mut row = format!(
        "{:02X}:{:04X} {}{}{}",
        (address >> 16) & 0xFF,
        address & 0xFFFF,
        byte_string,
        " ".repeat(spacing),
        inst
    );
    if let Some(comment) = comment {
        let padding = COMMENT_COLUMN.saturating_sub(row.len());
        row.push_str(&" ".repeat(padding));
        row.push_str(comment);
    }
    row.push('\n');
    row
}

/// Rows of at most four bytes; only the first carries `inst`.
pub fn format_rows(address: i64, bytes: &[u8], inst: &str) -> String {
    let mut out = String::new();
    let mut at = address;
    for (index, row) in bytes.chunks(4).enumerate() {
        let text = if index == 0 { inst } else { "" };
        out.push_str(&format_row(at, row, text, None));
        at += row.len() as i64;
    }
    out
}
