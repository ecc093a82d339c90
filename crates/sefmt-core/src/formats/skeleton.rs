//! Bone skeleton (`.bs`).

use crate::config::DecoderConfig;
use crate::error::{DecodeResult, ResultExt};
use crate::stream::{
    counted, expect_magic, read_ctstring, read_matrix12, read_qvect, ByteCursor, CTSTRING_MIN,
    MATRIX12_SIZE, QVECT_SIZE,
};
use crate::value::Record;

const LOD_MIN: usize = CTSTRING_MIN + 8;
const BONE_MIN: usize = 2 * CTSTRING_MIN + MATRIX12_SIZE + QVECT_SIZE + 8;

pub(super) fn decode(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let mut header = Record::new();
    header.insert("magic", expect_magic(cur, "SKEL").at("magic").at("header")?);
    header.insert("version", cur.read_u32().at("version").at("header")?);
    let lod_count = cur.read_u32().at("lodCount").at("header")?;
    header.insert("lodCount", lod_count);

    let lods = counted(cur, config, lod_count, LOD_MIN, |cur| lod(cur, config)).at("lods")?;
    Ok(Record::new().with("header", header).with("lods", lods))
}

fn lod(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let mut lod = Record::new();
    lod.insert("sourceFile", read_ctstring(cur).at("sourceFile")?);
    lod.insert("maxDistance", cur.read_f32().at("maxDistance")?);
    let bone_count = cur.read_u32().at("boneCount")?;
    lod.insert("boneCount", bone_count);
    let bones = counted(cur, config, bone_count, BONE_MIN, bone).at("bones")?;
    lod.insert("bones", bones);
    Ok(lod)
}

fn bone(cur: &mut ByteCursor) -> DecodeResult<Record> {
    Ok(Record::new()
        .with("id", read_ctstring(cur).at("id")?)
        .with("parentId", read_ctstring(cur).at("parentId")?)
        .with(
            "absolutePlacementMatrix",
            read_matrix12(cur).at("absolutePlacementMatrix")?,
        )
        .with(
            "absolutePlacementQVect",
            read_qvect(cur).at("absolutePlacementQVect")?,
        )
        .with("offsetLength", cur.read_f32().at("offsetLength")?)
        .with("boneLength", cur.read_f32().at("boneLength")?))
}
