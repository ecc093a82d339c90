//! Bone animation effects (`.bae`).

use crate::config::DecoderConfig;
use crate::error::{DecodeResult, ResultExt};
use crate::stream::{counted, expect_magic, read_ctstring, ByteCursor, CTSTRING_MIN};
use crate::value::Record;

const EFFECT_MIN: usize = 4 + 1 + CTSTRING_MIN + 4;
const GROUP_MIN: usize = CTSTRING_MIN + 8;

pub(super) fn decode(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let mut header = Record::new();
    header.insert("magic", expect_magic(cur, "AEFF").at("magic").at("header")?);
    let count = cur.read_u32().at("count").at("header")?;
    header.insert("count", count);

    let effects = counted(cur, config, count, EFFECT_MIN, |cur| effect(cur, config)).at("effects")?;
    Ok(Record::new().with("header", header).with("effects", effects))
}

fn effect(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let mut effect = Record::new();
    effect.insert("magic", expect_magic(cur, "ANEF").at("magic")?);
    effect.insert("version", cur.read_u8().at("version")?);
    effect.insert("animName", read_ctstring(cur).at("animName")?);

    let group_count = cur.read_u32().at("groupCount")?;
    effect.insert("groupCount", group_count);
    let groups = counted(cur, config, group_count, GROUP_MIN, |cur| {
        Ok(Record::new()
            .with("name", read_ctstring(cur).at("name")?)
            .with("startTime", cur.read_f32().at("startTime")?)
            .with("flags", cur.read_u32().at("flags")?))
    })
    .at("groups")?;
    effect.insert("groups", groups);
    Ok(effect)
}
