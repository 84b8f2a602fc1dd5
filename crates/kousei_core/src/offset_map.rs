//! Translation between filtered-text and original-text offsets.
//!
//! Filtering rewrites markup into prose, so a byte offset reported against
//! the filtered text has to be carried back into the document the user is
//! editing. An [`OffsetMap`] is the correspondence table produced by one
//! filtering call.
//!
//! Positions that fall where original text was dropped (a comment, a
//! command with no output) cannot be placed exactly. They snap to the
//! original boundary immediately preceding the gap and are reported as
//! approximate. Keep this tie-break stable: diagnostic anchors depend on it.

use serde::{Deserialize, Serialize};

use crate::error::MapError;
use crate::span::Span;

/// One filtered range and the original range it was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correspondence {
    /// Range in the filtered text.
    pub filtered: Span,
    /// Range in the original text.
    pub original: Span,
}

impl Correspondence {
    /// Creates a new correspondence record.
    pub const fn new(filtered: Span, original: Span) -> Self {
        Self { filtered, original }
    }
}

/// An offset translated into original-text coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapped {
    pub offset: u32,
    /// Set when the offset was snapped across dropped or inserted text.
    pub approximate: bool,
}

impl Mapped {
    const fn exact(offset: u32) -> Self {
        Self {
            offset,
            approximate: false,
        }
    }

    const fn approximate(offset: u32) -> Self {
        Self {
            offset,
            approximate: true,
        }
    }
}

/// A span translated into original-text coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedSpan {
    pub span: Span,
    pub approximate: bool,
}

/// Correspondence table between filtered and original text.
///
/// Records are sorted by filtered start and never overlap in the filtered
/// text. Their original ranges may come in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetMap {
    records: Vec<Correspondence>,
    filtered_len: u32,
    original_len: u32,
}

impl OffsetMap {
    /// Builds a map, validating the record invariants.
    ///
    /// Records with an empty filtered range carry no position of their own
    /// and are discarded; the drop they describe is still visible as a jump
    /// between the surrounding records' original ranges.
    pub fn new(
        records: Vec<Correspondence>,
        filtered_len: u32,
        original_len: u32,
    ) -> Result<Self, MapError> {
        let mut kept = Vec::with_capacity(records.len());
        let mut previous_end = 0;

        for record in records {
            if record.filtered.start > record.filtered.end
                || record.original.start > record.original.end
            {
                return Err(MapError::inconsistent(format!(
                    "reversed range in {record:?}"
                )));
            }
            if record.filtered.end > filtered_len || record.original.end > original_len {
                return Err(MapError::inconsistent(format!(
                    "{record:?} exceeds text lengths ({filtered_len}, {original_len})"
                )));
            }
            if record.filtered.is_empty() {
                continue;
            }
            if record.filtered.start < previous_end {
                return Err(MapError::inconsistent(format!(
                    "{record:?} overlaps or precedes offset {previous_end}"
                )));
            }
            previous_end = record.filtered.end;
            kept.push(record);
        }

        Ok(Self {
            records: kept,
            filtered_len,
            original_len,
        })
    }

    /// The map for text that filtering left untouched.
    pub fn identity(len: u32) -> Self {
        let records = if len == 0 {
            Vec::new()
        } else {
            vec![Correspondence::new(Span::new(0, len), Span::new(0, len))]
        };
        Self {
            records,
            filtered_len: len,
            original_len: len,
        }
    }

    /// Builds a map from a per-character table.
    ///
    /// `charmap[i]` is the index of the original character that filtered
    /// character `i` came from. Runs of successive original indices become
    /// one record each; original characters skipped between runs are drops.
    /// A character whose UTF-8 width differs on the two sides gets a record
    /// of its own, so interpolation always lands on a character boundary.
    pub fn from_charmap(filtered: &str, original: &str, charmap: &[u32]) -> Result<Self, MapError> {
        let original_offsets: Vec<u32> = original
            .char_indices()
            .map(|(offset, _)| offset as u32)
            .chain(std::iter::once(original.len() as u32))
            .collect();
        let original_chars = original_offsets.len() - 1;

        let mut filtered_chars = filtered.char_indices();
        let mut records = Vec::new();
        // (filtered start byte, first original char, last original char, widths agree)
        let mut run: Option<(u32, usize, usize, bool)> = None;

        for &index in charmap {
            let Some((offset, ch)) = filtered_chars.next() else {
                return Err(MapError::inconsistent(
                    "charmap is longer than the filtered text",
                ));
            };
            let offset = offset as u32;
            let index = index as usize;
            if index >= original_chars {
                return Err(MapError::inconsistent(format!(
                    "charmap points at character {index} of {original_chars}"
                )));
            }

            let original_width = original_offsets[index + 1] - original_offsets[index];
            let same_width = ch.len_utf8() as u32 == original_width;

            match run {
                Some((start, first, last, true)) if same_width && index == last + 1 => {
                    run = Some((start, first, index, true));
                }
                Some((start, first, last, _)) => {
                    records.push(Correspondence::new(
                        Span::new(start, offset),
                        Span::new(original_offsets[first], original_offsets[last + 1]),
                    ));
                    run = Some((offset, index, index, same_width));
                }
                None => run = Some((offset, index, index, same_width)),
            }
        }

        if filtered_chars.next().is_some() {
            return Err(MapError::inconsistent(
                "charmap is shorter than the filtered text",
            ));
        }
        if let Some((start, first, last, _)) = run {
            records.push(Correspondence::new(
                Span::new(start, filtered.len() as u32),
                Span::new(original_offsets[first], original_offsets[last + 1]),
            ));
        }

        Self::new(records, filtered.len() as u32, original.len() as u32)
    }

    /// Length of the filtered text in bytes.
    pub fn filtered_len(&self) -> u32 {
        self.filtered_len
    }

    /// Length of the original text in bytes.
    pub fn original_len(&self) -> u32 {
        self.original_len
    }

    /// The validated correspondence records.
    pub fn records(&self) -> &[Correspondence] {
        &self.records
    }

    /// Translates a filtered offset into an original offset.
    pub fn translate(&self, offset: u32) -> Result<Mapped, MapError> {
        if offset > self.filtered_len {
            return Err(MapError::OutOfBounds {
                offset,
                len: self.filtered_len,
            });
        }

        let index = self
            .records
            .partition_point(|record| record.filtered.start <= offset);
        let Some(index) = index.checked_sub(1) else {
            return Ok(self.snap(0, offset));
        };

        let record = &self.records[index];
        if record.filtered.contains(offset) {
            let boundary = self.boundary_before(index);
            if offset == record.filtered.start && record.original.start > boundary {
                return Ok(Mapped::approximate(boundary));
            }
            return Ok(Mapped::exact(interpolate(record, offset)));
        }

        Ok(self.snap(record.original.end, offset))
    }

    /// Translates a filtered span into an original span.
    ///
    /// The end is mapped with end bias: an end that closes a record maps to
    /// the end of that record's original range rather than snapping across
    /// whatever follows it.
    pub fn translate_span(&self, span: Span) -> Result<MappedSpan, MapError> {
        if span.start > span.end {
            return Err(MapError::inconsistent(format!("reversed span {span:?}")));
        }

        let start = self.translate(span.start)?;
        let end = if span.is_empty() {
            start
        } else {
            self.translate_end(span.end)?
        };

        Ok(MappedSpan {
            span: Span::new(start.offset, end.offset.max(start.offset)),
            approximate: start.approximate || end.approximate,
        })
    }

    /// Translates an original offset into a filtered offset.
    ///
    /// Offsets inside dropped text map to the filtered position where the
    /// drop happened and are reported as approximate.
    pub fn to_filtered(&self, offset: u32) -> Result<Mapped, MapError> {
        if offset > self.original_len {
            return Err(MapError::OutOfBounds {
                offset,
                len: self.original_len,
            });
        }

        if let Some(record) = self
            .records
            .iter()
            .find(|record| record.original.contains(offset))
        {
            let distance = scale(
                offset - record.original.start,
                record.filtered.len(),
                record.original.len(),
            );
            return Ok(Mapped::exact(record.filtered.start + distance));
        }

        // Original ranges are not necessarily sorted, so pick the record
        // ending closest before the offset.
        let filtered = self
            .records
            .iter()
            .filter(|record| record.original.end <= offset)
            .max_by_key(|record| record.original.end)
            .map_or(0, |record| record.filtered.end);

        if offset == self.original_len && filtered == self.filtered_len {
            Ok(Mapped::exact(filtered))
        } else {
            Ok(Mapped::approximate(filtered))
        }
    }

    fn translate_end(&self, offset: u32) -> Result<Mapped, MapError> {
        if offset > 0 && offset <= self.filtered_len {
            let index = self
                .records
                .partition_point(|record| record.filtered.start < offset);
            if let Some(record) = index.checked_sub(1).map(|i| &self.records[i])
                && record.filtered.end == offset
            {
                return Ok(Mapped::exact(record.original.end));
            }
        }
        self.translate(offset)
    }

    fn boundary_before(&self, index: usize) -> u32 {
        index
            .checked_sub(1)
            .map_or(0, |previous| self.records[previous].original.end)
    }

    fn snap(&self, boundary: u32, offset: u32) -> Mapped {
        if offset == self.filtered_len && boundary == self.original_len {
            Mapped::exact(boundary)
        } else {
            Mapped::approximate(boundary)
        }
    }
}

fn interpolate(record: &Correspondence, offset: u32) -> u32 {
    record.original.start
        + scale(
            offset - record.filtered.start,
            record.original.len(),
            record.filtered.len(),
        )
}

/// `value * numerator / denominator` without intermediate overflow.
fn scale(value: u32, numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return 0;
    }
    (u64::from(value) * u64::from(numerator) / u64::from(denominator)) as u32
}
