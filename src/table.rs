//! Table assembly for CSV output
//!
//! All record sets are laid out side by side in one wide table. Each record
//! set owns a contiguous range of columns (its block): the start-time column
//! first, then its remaining fields in log order. Rows only ever populate the
//! slots of the record set(s) they come from; every other cell stays empty.
//!
//! Two row layouts are supported:
//! - [`RowLayout::Blocks`] (default): every record set's samples are emitted
//!   as one contiguous run of rows, record set after record set.
//! - [`RowLayout::Merged`]: rows are merged on timestamp; each row carries
//!   one sample from every record set whose next sample has the smallest
//!   pending timestamp.

use crate::conversion::format_value;
use crate::error::{Result, ULogError};
use crate::filters::NameFilter;
use crate::types::RecordSet;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Name of the per-message timestamp field
pub const TIMESTAMP_FIELD: &str = "timestamp";
/// Header name replacing `timestamp` at the start of every block
pub const START_TIME_COLUMN: &str = "TIME_StartTime";

/// How data rows are arranged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowLayout {
    #[default]
    Blocks,
    Merged,
}

/// Column names plus the slot range owned by each block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderLayout {
    columns: Vec<String>,
    counts: Vec<usize>,
    offsets: Vec<usize>,
}

impl HeaderLayout {
    fn push_block(&mut self, names: Vec<String>) {
        self.offsets.push(self.columns.len());
        self.counts.push(names.len());
        self.columns.extend(names);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Total number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Start offset of every block (prefix sums of the column counts)
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }
}

/// Fixed-width row of text cells, one slot per header column
#[derive(Debug)]
pub struct RowBuffer {
    cells: Vec<String>,
}

impl RowBuffer {
    pub fn new(width: usize) -> Self {
        Self {
            cells: vec![String::new(); width],
        }
    }

    /// Write consecutive cells starting at `offset`
    pub fn fill(&mut self, offset: usize, values: impl IntoIterator<Item = String>) {
        for (slot, value) in self.cells[offset..].iter_mut().zip(values) {
            *slot = value;
        }
    }

    /// Hand out the current row and reset the buffer to empty cells
    pub fn take(&mut self) -> Vec<String> {
        let width = self.cells.len();
        std::mem::replace(&mut self.cells, vec![String::new(); width])
    }
}

/// One record set placed in the table
#[derive(Debug)]
struct TableBlock<'a> {
    record_set: &'a RecordSet,
    /// Field indices in output order, timestamp first
    field_order: Vec<usize>,
}

impl TableBlock<'_> {
    fn cells(&self, sample: usize) -> impl Iterator<Item = String> + '_ {
        self.field_order
            .iter()
            .map(move |&field| format_value(&self.record_set.columns[field][sample]))
    }

    fn timestamp(&self, sample: usize) -> u64 {
        self.record_set.columns[self.field_order[0]][sample]
            .as_u64()
            .unwrap_or(0)
    }

    fn sample_count(&self) -> usize {
        self.record_set.sample_count()
    }
}

/// Wide table over all record sets
#[derive(Debug)]
pub struct Table<'a> {
    blocks: Vec<TableBlock<'a>>,
    layout: HeaderLayout,
}

impl<'a> Table<'a> {
    /// Lay out the record sets, optionally keeping only the columns in `column_filter`.
    ///
    /// Fails if a record set has no timestamp field. With a column filter,
    /// record sets without any selected field are left out.
    pub fn assemble(record_sets: &'a [RecordSet], column_filter: Option<&NameFilter>) -> Result<Self> {
        let mut blocks = Vec::new();
        let mut layout = HeaderLayout::default();

        for record_set in record_sets {
            let timestamp_index = record_set
                .field_index(TIMESTAMP_FIELD)
                .ok_or_else(|| ULogError::MissingTimestamp(record_set.name.clone()))?;

            let selected: Vec<usize> = match column_filter {
                Some(filter) => filter
                    .select_fields(record_set)
                    .into_iter()
                    .filter(|&i| i != timestamp_index)
                    .collect(),
                None => (0..record_set.fields.len())
                    .filter(|&i| i != timestamp_index)
                    .collect(),
            };

            if column_filter.is_some() && selected.is_empty() {
                continue;
            }

            let mut field_order = Vec::with_capacity(selected.len() + 1);
            field_order.push(timestamp_index);
            field_order.extend(selected);

            let names = std::iter::once(START_TIME_COLUMN.to_string())
                .chain(
                    field_order[1..]
                        .iter()
                        .map(|&i| record_set.fields[i].name.clone()),
                )
                .collect();
            layout.push_block(names);
            blocks.push(TableBlock {
                record_set,
                field_order,
            });
        }

        Ok(Self { blocks, layout })
    }

    pub fn header(&self) -> &[String] {
        self.layout.columns()
    }

    pub fn layout(&self) -> &HeaderLayout {
        &self.layout
    }

    /// Names of the record sets present in the table, in block order
    pub fn block_names(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .map(|block| block.record_set.name.as_str())
            .collect()
    }

    /// Block-structured rows
    pub fn rows(&self) -> BlockRows<'_, 'a> {
        BlockRows {
            table: self,
            block: 0,
            sample: 0,
            buffer: RowBuffer::new(self.layout.width()),
        }
    }

    /// Rows merged on timestamp
    pub fn merged_rows(&self) -> MergedRows<'_, 'a> {
        MergedRows {
            table: self,
            merge: MergeCursor::new(&self.blocks),
            buffer: RowBuffer::new(self.layout.width()),
        }
    }

    pub fn rows_with_layout(&self, layout: RowLayout) -> TableRows<'_, 'a> {
        match layout {
            RowLayout::Blocks => TableRows::Blocks(self.rows()),
            RowLayout::Merged => TableRows::Merged(self.merged_rows()),
        }
    }

    /// Number of data rows emitted by `layout`
    pub fn row_count(&self, layout: RowLayout) -> usize {
        match layout {
            RowLayout::Blocks => self.blocks.iter().map(TableBlock::sample_count).sum(),
            RowLayout::Merged => MergeCursor::new(&self.blocks).count(),
        }
    }
}

/// Iterator over block-structured rows
pub struct BlockRows<'t, 'a> {
    table: &'t Table<'a>,
    block: usize,
    sample: usize,
    buffer: RowBuffer,
}

impl Iterator for BlockRows<'_, '_> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let block = self.table.blocks.get(self.block)?;
            if self.sample < block.sample_count() {
                let offset = self.table.layout.offsets[self.block];
                self.buffer.fill(offset, block.cells(self.sample));
                self.sample += 1;
                return Some(self.buffer.take());
            }
            self.block += 1;
            self.sample = 0;
        }
    }
}

/// Yields groups of `(block, sample)` sharing the smallest pending timestamp
struct MergeCursor<'t, 'a> {
    blocks: &'t [TableBlock<'a>],
    cursors: Vec<usize>,
    heap: BinaryHeap<Reverse<(u64, usize)>>,
}

impl<'t, 'a> MergeCursor<'t, 'a> {
    fn new(blocks: &'t [TableBlock<'a>]) -> Self {
        let heap = blocks
            .iter()
            .enumerate()
            .filter(|(_, block)| block.sample_count() > 0)
            .map(|(i, block)| Reverse((block.timestamp(0), i)))
            .collect();
        Self {
            blocks,
            cursors: vec![0; blocks.len()],
            heap,
        }
    }
}

impl Iterator for MergeCursor<'_, '_> {
    type Item = Vec<(usize, usize)>;

    fn next(&mut self) -> Option<Self::Item> {
        let Reverse((timestamp, first)) = self.heap.pop()?;
        let mut ready = vec![first];
        while let Some(&Reverse((next, block))) = self.heap.peek() {
            if next != timestamp {
                break;
            }
            self.heap.pop();
            ready.push(block);
        }
        ready.sort_unstable();

        let mut group = Vec::with_capacity(ready.len());
        for block in ready {
            let sample = self.cursors[block];
            group.push((block, sample));
            self.cursors[block] += 1;
            let next_sample = self.cursors[block];
            if next_sample < self.blocks[block].sample_count() {
                self.heap
                    .push(Reverse((self.blocks[block].timestamp(next_sample), block)));
            }
        }
        Some(group)
    }
}

/// Iterator over timestamp-merged rows
pub struct MergedRows<'t, 'a> {
    table: &'t Table<'a>,
    merge: MergeCursor<'t, 'a>,
    buffer: RowBuffer,
}

impl Iterator for MergedRows<'_, '_> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let group = self.merge.next()?;
        for (block, sample) in group {
            let offset = self.table.layout.offsets[block];
            self.buffer
                .fill(offset, self.table.blocks[block].cells(sample));
        }
        Some(self.buffer.take())
    }
}

/// Rows of either layout
pub enum TableRows<'t, 'a> {
    Blocks(BlockRows<'t, 'a>),
    Merged(MergedRows<'t, 'a>),
}

impl Iterator for TableRows<'_, '_> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            TableRows::Blocks(rows) => rows.next(),
            TableRows::Merged(rows) => rows.next(),
        }
    }
}
