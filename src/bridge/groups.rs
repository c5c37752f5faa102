use crate::error::{Error, Result};
use crate::register::table;

pub const MAX_BATCHED_REGISTERS_COUNT: i32 = 64;
pub const MAX_BATCHED_REGISTERS_GAP: i32 = 16;

struct Span<'a> {
    name: &'a str,
    start: i32,
    // last address, inclusive
    end: i32,
}

/// Sorts `names` by address and splits them into groups that can each be
/// read with one request: a group spans at most 64 words and consecutive
/// registers are less than 16 words apart.
pub fn group_registers<'a>(names: &[&'a str]) -> Result<Vec<Vec<&'a str>>> {
    let mut spans = names
        .iter()
        .map(|&name| {
            let register = table::get(name).ok_or_else(|| Error::UnknownRegister(name.to_string()))?;
            Ok(Span {
                name,
                start: i32::from(register.address),
                end: i32::from(register.address) + i32::from(register.length) - 1,
            })
        })
        .collect::<Result<Vec<Span>>>()?;
    spans.sort_by_key(|span| span.start);

    let mut groups: Vec<Vec<&'a str>> = Vec::new();
    let mut current: Vec<&Span> = Vec::new();

    for span in &spans {
        if let (Some(first), Some(last)) = (current.first(), current.last()) {
            if span.end - first.start > MAX_BATCHED_REGISTERS_COUNT
                || span.start - last.end >= MAX_BATCHED_REGISTERS_GAP
            {
                groups.push(current.drain(..).map(|span| span.name).collect());
            }
        }
        current.push(span);
    }
    if !current.is_empty() {
        groups.push(current.into_iter().map(|span| span.name).collect());
    }

    Ok(groups)
}
