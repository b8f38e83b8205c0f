//! Raw input report decoding for report-backed devices
//!
//! Buttons are collected as a sparse, ascending list of active usages per
//! range and then merged into the dense button array. Values are rescaled from
//! their logical bounds to `[-100, 100]`.

use super::axis::{AXIS_COUNT, BUTTON_COUNT};
use super::descriptor::{ButtonRange, ReportLayout};
use super::error::ReportError;
use super::state::JoystickState;

/// Read `bit_count` (0..=32) bits starting at `bit_offset`, little-endian
pub fn read_bits(payload: &[u8], bit_offset: usize, bit_count: u32) -> Result<u32, ReportError> {
    let available = payload.len().saturating_mul(8);
    let needed = bit_offset.checked_add(bit_count as usize).unwrap_or(usize::MAX);
    if bit_count > 32 || needed > available {
        return Err(ReportError::TooShort { needed, available });
    }
    if bit_count == 0 {
        return Ok(0);
    }

    let first = bit_offset / 8;
    let last = (needed + 7) / 8;
    let word = payload[first..last]
        .iter()
        .rev()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));

    let mask = (1u64 << bit_count) - 1;
    Ok(((word >> (bit_offset % 8)) & mask) as u32)
}

/// Active usages of `range` in `payload`, ascending and without duplicates
///
/// Variable fields contribute their usage when non-zero. Array fields hold a
/// usage index offset by the logical minimum; out-of-range indices are the
/// "no button" value and are ignored.
pub fn active_usages(range: &ButtonRange, payload: &[u8]) -> Result<Vec<u16>, ReportError> {
    let span = range.span();
    let mut active = Vec::new();

    for field in 0..range.field_count as usize {
        let offset = (range.field_bits as usize)
            .checked_mul(field)
            .and_then(|bits| range.bit_offset.checked_add(bits))
            .unwrap_or(usize::MAX);
        let raw = read_bits(payload, offset, range.field_bits)?;

        let index = if range.array {
            i64::from(raw) - i64::from(range.logical_min)
        } else if raw != 0 {
            field as i64
        } else {
            continue;
        };

        if (0..span as i64).contains(&index) {
            active.push(range.usage_min + index as u16);
        }
    }

    active.sort_unstable();
    active.dedup();
    Ok(active)
}

/// Resolve a sorted sparse index list into `dense`
///
/// Every position not listed becomes `false`. Runs in one pass over both.
pub fn merge_sparse(active: &[usize], dense: &mut [bool]) {
    let mut cursor = 0;
    for (index, pressed) in dense.iter_mut().enumerate() {
        while cursor < active.len() && active[cursor] < index {
            cursor += 1;
        }
        *pressed = cursor < active.len() && active[cursor] == index;
    }
}

/// Map a raw field value onto `[-100, 100]`
///
/// Both logical bounds are masked to the field width first, so a bound the
/// device declared sign-extended or wider than the field still lines up with
/// the raw value. Equal bounds yield 0.
pub fn rescale_value(raw: u32, bit_size: u32, logical_min: i32, logical_max: i32) -> f32 {
    let expected_max = if bit_size >= 32 {
        u32::MAX
    } else {
        (1u32 << bit_size) - 1
    };
    let min = (logical_min as u32) & expected_max;
    let max = (logical_max as u32) & expected_max;

    if min == max {
        return 0.0;
    }

    let scaled = -100.0 + (f64::from(raw) - f64::from(min)) * 200.0 / (f64::from(max) - f64::from(min));
    scaled.clamp(-100.0, 100.0) as f32
}

/// Decode one raw report on top of the previous state
///
/// Ranges that belong to a different report ID keep their previous values.
/// On error nothing is applied and the caller keeps `previous`.
pub fn decode_report(
    layout: &ReportLayout,
    report: &[u8],
    previous: &JoystickState,
) -> Result<JoystickState, ReportError> {
    let (&first, rest) = report.split_first().ok_or(ReportError::Empty)?;
    let (report_id, payload) = if layout.uses_report_ids {
        (first, rest)
    } else {
        (0, report)
    };

    let mut state = *previous;

    let mut base = 0usize;
    for range in &layout.buttons {
        let span = range.span();
        if range.report_id == report_id {
            let active: Vec<usize> = active_usages(range, payload)?
                .into_iter()
                .map(|usage| usize::from(usage - range.usage_min))
                .collect();
            let start = base.min(BUTTON_COUNT);
            let end = (base + span).min(BUTTON_COUNT);
            merge_sparse(&active, &mut state.buttons[start..end]);
        }
        base += span;
    }
    for pressed in state.buttons.iter_mut().skip(base) {
        *pressed = false;
    }

    for (ordinal, value) in layout.values.iter().take(AXIS_COUNT).enumerate() {
        if value.report_id != report_id {
            continue;
        }
        let raw = read_bits(payload, value.bit_offset, value.bit_size)?;
        state.axes[ordinal] = rescale_value(raw, value.bit_size, value.logical_min, value.logical_max);
    }

    Ok(state)
}
