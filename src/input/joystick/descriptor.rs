//! HID report descriptor parsing
//!
//! Turns the raw report descriptor a device publishes into the input layout
//! the decoder works from: button ranges and value ranges, each with the bit
//! position of its fields inside the report payload.
//!
//! Only input main items contribute to the layout. Output and feature items
//! live in separate reports and are skipped.

use std::collections::HashMap;
use tracing::trace;

use super::axis::AXIS_COUNT;
use super::error::DescriptorError;
use super::state::{AxisSet, Capabilities};

/// Usage page carrying buttons
pub const BUTTON_PAGE: u16 = 0x09;

/// Upper bound on value fields taken from a single input item
const MAX_VALUE_FIELDS: u32 = 256;

/// Item prefix announcing a long item
const LONG_ITEM_PREFIX: u8 = 0xFE;

/// Main item flag bits
mod main_flags {
    pub const CONSTANT: u32 = 0x01;
    pub const VARIABLE: u32 = 0x02;
}

/// A contiguous block of button usages inside one input item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonRange {
    /// Report ID the fields live in (0 when the device uses none)
    pub report_id: u8,
    pub usage_page: u16,
    pub usage_min: u16,
    pub usage_max: u16,
    /// First bit of the first field, relative to the payload after the report ID
    pub bit_offset: usize,
    pub field_bits: u32,
    pub field_count: u32,
    /// Fields hold usage indices (array) rather than one bit per usage
    pub array: bool,
    pub logical_min: i32,
}

impl ButtonRange {
    /// Number of usages the range declares
    pub fn span(&self) -> usize {
        usize::from(self.usage_max.saturating_sub(self.usage_min)) + 1
    }
}

/// One scalar input field (axis, slider, hat, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueRange {
    pub report_id: u8,
    pub usage_page: u16,
    pub usage: u16,
    pub bit_offset: usize,
    pub bit_size: u32,
    pub logical_min: i32,
    pub logical_max: i32,
}

/// Input layout of a report-backed device, in descriptor order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportLayout {
    pub buttons: Vec<ButtonRange>,
    pub values: Vec<ValueRange>,
    /// Reports are prefixed with a one-byte report ID
    pub uses_report_ids: bool,
}

impl ReportLayout {
    /// Parse a raw HID report descriptor
    pub fn parse(descriptor: &[u8]) -> Result<Self, DescriptorError> {
        let mut layout = Self::default();
        let mut global = GlobalState::default();
        let mut stack: Vec<GlobalState> = Vec::new();
        let mut local = LocalState::default();
        let mut offsets: HashMap<u8, usize> = HashMap::new();
        let mut depth = 0usize;

        for item in ItemReader::new(descriptor) {
            let item = item?;
            match (item.kind, item.tag) {
                (ItemKind::Main, main_tags::INPUT) => {
                    let cursor = offsets.entry(global.report_id).or_insert(0);
                    let start = *cursor;
                    *cursor = (global.report_size as usize)
                        .checked_mul(global.report_count as usize)
                        .and_then(|bits| start.checked_add(bits))
                        .ok_or(DescriptorError::LayoutOverflow { offset: item.offset })?;
                    layout.add_input(item.data, start, &global, &local, item.offset)?;
                    local = LocalState::default();
                }
                (ItemKind::Main, main_tags::COLLECTION) => {
                    depth += 1;
                    local = LocalState::default();
                }
                (ItemKind::Main, main_tags::END_COLLECTION) => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or(DescriptorError::UnbalancedCollection { offset: item.offset })?;
                    local = LocalState::default();
                }
                (ItemKind::Main, _) => {
                    // Output and feature items
                    local = LocalState::default();
                }

                (ItemKind::Global, global_tags::USAGE_PAGE) => global.usage_page = item.data as u16,
                (ItemKind::Global, global_tags::LOGICAL_MINIMUM) => {
                    global.logical_min = item.signed()
                }
                (ItemKind::Global, global_tags::LOGICAL_MAXIMUM) => {
                    global.logical_max = item.signed()
                }
                (ItemKind::Global, global_tags::REPORT_SIZE) => global.report_size = item.data,
                (ItemKind::Global, global_tags::REPORT_ID) => {
                    global.report_id = item.data as u8;
                    layout.uses_report_ids = true;
                }
                (ItemKind::Global, global_tags::REPORT_COUNT) => global.report_count = item.data,
                (ItemKind::Global, global_tags::PUSH) => stack.push(global),
                (ItemKind::Global, global_tags::POP) => {
                    global = stack
                        .pop()
                        .ok_or(DescriptorError::UnbalancedPop { offset: item.offset })?;
                }

                (ItemKind::Local, local_tags::USAGE) => local.usages.push(item.usage()),
                (ItemKind::Local, local_tags::USAGE_MINIMUM) => local.usage_min = Some(item.usage()),
                (ItemKind::Local, local_tags::USAGE_MAXIMUM) => local.usage_max = Some(item.usage()),

                (kind, tag) => {
                    trace!("Ignoring {:?} item tag {:#x} at byte {}", kind, tag, item.offset);
                }
            }
        }

        Ok(layout)
    }

    fn add_input(
        &mut self,
        flags: u32,
        bit_offset: usize,
        global: &GlobalState,
        local: &LocalState,
        item_offset: usize,
    ) -> Result<(), DescriptorError> {
        if flags & main_flags::CONSTANT != 0 || global.report_size == 0 || global.report_count == 0
        {
            return Ok(());
        }
        if global.report_size > 32 {
            return Err(DescriptorError::FieldTooWide {
                size: global.report_size,
                offset: item_offset,
            });
        }

        let variable = flags & main_flags::VARIABLE != 0;
        let Some((first, last)) = local.bounds() else {
            trace!("Input item at byte {} declares no usages", item_offset);
            return Ok(());
        };
        let usage_page = first.page.unwrap_or(global.usage_page);

        if usage_page == BUTTON_PAGE {
            self.buttons.push(ButtonRange {
                report_id: global.report_id,
                usage_page,
                usage_min: first.id,
                usage_max: last.id.max(first.id),
                bit_offset,
                field_bits: global.report_size,
                field_count: global.report_count,
                array: !variable,
                logical_min: global.logical_min,
            });
        } else if variable {
            for field in 0..global.report_count.min(MAX_VALUE_FIELDS) {
                let usage = local.usage_at(field as usize).unwrap_or(first);
                self.values.push(ValueRange {
                    report_id: global.report_id,
                    usage_page: usage.page.unwrap_or(global.usage_page),
                    usage: usage.id,
                    bit_offset: bit_offset + field as usize * global.report_size as usize,
                    bit_size: global.report_size,
                    logical_min: global.logical_min,
                    logical_max: global.logical_max,
                });
            }
        } else {
            trace!(
                "Skipping array input on usage page {:#x} at byte {}",
                usage_page,
                item_offset
            );
        }

        Ok(())
    }

    /// Total number of declared button usages
    pub fn button_count(&self) -> usize {
        self.buttons.iter().map(ButtonRange::span).sum()
    }

    /// Capabilities implied by the layout
    ///
    /// The first eight value ranges map to axes by ordinal.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            button_count: u32::try_from(self.button_count()).unwrap_or(u32::MAX),
            axes: AxisSet::first(self.values.len().min(AXIS_COUNT)),
        }
    }
}

mod main_tags {
    pub const INPUT: u8 = 0x8;
    pub const COLLECTION: u8 = 0xA;
    pub const END_COLLECTION: u8 = 0xC;
}

mod global_tags {
    pub const USAGE_PAGE: u8 = 0x0;
    pub const LOGICAL_MINIMUM: u8 = 0x1;
    pub const LOGICAL_MAXIMUM: u8 = 0x2;
    pub const REPORT_SIZE: u8 = 0x7;
    pub const REPORT_ID: u8 = 0x8;
    pub const REPORT_COUNT: u8 = 0x9;
    pub const PUSH: u8 = 0xA;
    pub const POP: u8 = 0xB;
}

mod local_tags {
    pub const USAGE: u8 = 0x0;
    pub const USAGE_MINIMUM: u8 = 0x1;
    pub const USAGE_MAXIMUM: u8 = 0x2;
}

#[derive(Debug, Clone, Copy, Default)]
struct GlobalState {
    usage_page: u16,
    logical_min: i32,
    logical_max: i32,
    report_size: u32,
    report_count: u32,
    report_id: u8,
}

/// Usage as written in a local item; 4-byte usages carry their own page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Usage {
    page: Option<u16>,
    id: u16,
}

#[derive(Debug, Default)]
struct LocalState {
    usages: Vec<Usage>,
    usage_min: Option<Usage>,
    usage_max: Option<Usage>,
}

impl LocalState {
    /// First and last usage the next main item covers
    fn bounds(&self) -> Option<(Usage, Usage)> {
        if let Some(min) = self.usage_min {
            return Some((min, self.usage_max.unwrap_or(min)));
        }
        let first = *self.usages.first()?;
        let last = self
            .usages
            .iter()
            .copied()
            .filter(|usage| usage.page == first.page)
            .max_by_key(|usage| usage.id)
            .unwrap_or(first);
        Some((first, last))
    }

    /// Usage for the `field`-th field of a variable item
    ///
    /// Explicit usages are consumed in order with the last one repeating;
    /// a usage range is walked from its minimum.
    fn usage_at(&self, field: usize) -> Option<Usage> {
        if let Some(last) = self.usages.last() {
            return Some(self.usages.get(field).copied().unwrap_or(*last));
        }
        let min = self.usage_min?;
        let max = self.usage_max.unwrap_or(min);
        let id = (usize::from(min.id) + field).min(usize::from(max.id.max(min.id)));
        Some(Usage {
            page: min.page,
            id: id as u16,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemKind {
    Main,
    Global,
    Local,
    Reserved,
}

#[derive(Debug, Clone, Copy)]
struct Item {
    offset: usize,
    kind: ItemKind,
    tag: u8,
    size: usize,
    data: u32,
}

impl Item {
    /// Data sign-extended from its encoded width
    fn signed(&self) -> i32 {
        match self.size {
            1 => self.data as u8 as i8 as i32,
            2 => self.data as u16 as i16 as i32,
            4 => self.data as i32,
            _ => 0,
        }
    }

    fn usage(&self) -> Usage {
        if self.size == 4 {
            Usage {
                page: Some((self.data >> 16) as u16),
                id: self.data as u16,
            }
        } else {
            Usage {
                page: None,
                id: self.data as u16,
            }
        }
    }
}

/// Iterator over the short items of a descriptor, skipping long items
struct ItemReader<'a> {
    bytes: &'a [u8],
    position: usize,
    failed: bool,
}

impl<'a> ItemReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            position: 0,
            failed: false,
        }
    }

    fn fail(&mut self, offset: usize) -> Option<Result<Item, DescriptorError>> {
        self.failed = true;
        Some(Err(DescriptorError::Truncated { offset }))
    }
}

impl Iterator for ItemReader<'_> {
    type Item = Result<Item, DescriptorError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.failed {
                return None;
            }
            let offset = self.position;
            let prefix = *self.bytes.get(offset)?;

            if prefix == LONG_ITEM_PREFIX {
                let Some(&len) = self.bytes.get(offset + 1) else {
                    return self.fail(offset);
                };
                let end = offset + 3 + usize::from(len);
                if end > self.bytes.len() {
                    return self.fail(offset);
                }
                trace!("Skipping long item at byte {}", offset);
                self.position = end;
                continue;
            }

            let size = match prefix & 0x03 {
                3 => 4,
                n => usize::from(n),
            };
            let Some(raw) = self.bytes.get(offset + 1..offset + 1 + size) else {
                return self.fail(offset);
            };
            let data = raw
                .iter()
                .rev()
                .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte));

            let kind = match (prefix >> 2) & 0x03 {
                0 => ItemKind::Main,
                1 => ItemKind::Global,
                2 => ItemKind::Local,
                _ => ItemKind::Reserved,
            };

            self.position = offset + 1 + size;
            return Some(Ok(Item {
                offset,
                kind,
                tag: prefix >> 4,
                size,
                data,
            }));
        }
    }
}
